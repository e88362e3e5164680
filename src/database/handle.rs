//! Database handle
//!
//! `SqlDatabase` wraps one live connection pool to either the bundled SQLite
//! file or a remote MySQL server. It exposes only what the query agent needs:
//! schema introspection and running a statement with the result rendered as
//! text.

use crate::database::models::{Dialect, RemoteCredentials};
use crate::error::AppError;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, ValueRef};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Longest rendered value before truncation
pub const MAX_VALUE_LENGTH: usize = 300;

/// Sample rows included with each table description
pub const SAMPLE_ROWS_IN_TABLE_INFO: usize = 3;

const MYSQL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

enum Pool {
    Sqlite(SqlitePool),
    Mysql(MySqlPool),
}

/// A single decoded cell
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Signed integer
    Int(i64),
    /// Unsigned integer (MySQL)
    UInt(u64),
    /// Floating point
    Float(f64),
    /// Text, also used for decimals and temporal values
    Text(String),
    /// Binary data; only its length is kept
    Bytes(usize),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("None"),
            SqlValue::Int(v) => write!(f, "{}", v),
            SqlValue::UInt(v) => write!(f, "{}", v),
            SqlValue::Float(v) => write!(f, "{}", v),
            SqlValue::Text(v) => write!(f, "'{}'", truncate(v, MAX_VALUE_LENGTH)),
            SqlValue::Bytes(len) => write!(f, "<{} bytes>", len),
        }
    }
}

/// Rows returned by a statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    /// Column names in select order
    pub columns: Vec<String>,
    /// Row values, one vector per row
    pub rows: Vec<Vec<SqlValue>>,
}

impl QueryOutput {
    /// Render as a list of tuples, e.g. `[(1, 'Alice'), (2, 'Bob')]`.
    /// A statement that produced no rows renders as an empty string.
    pub fn render(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                let cells: Vec<String> = row.iter().map(ToString::to_string).collect();
                if cells.len() == 1 {
                    format!("({},)", cells[0])
                } else {
                    format!("({})", cells.join(", "))
                }
            })
            .collect();
        format!("[{}]", rows.join(", "))
    }

    /// Render as a tab separated table with a header line
    pub fn render_table(&self) -> String {
        let mut out = self.columns.join("\t");
        for row in &self.rows {
            out.push('\n');
            let cells: Vec<String> = row
                .iter()
                .map(|v| match v {
                    SqlValue::Text(s) => truncate(s, 100),
                    other => other.to_string(),
                })
                .collect();
            out.push_str(&cells.join("\t"));
        }
        out
    }
}

/// Opaque handle over one database connection pool
pub struct SqlDatabase {
    pool: Pool,
    description: String,
}

impl fmt::Debug for SqlDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlDatabase")
            .field("dialect", &self.dialect())
            .field("description", &self.description)
            .finish()
    }
}

impl SqlDatabase {
    /// Open the local SQLite file in read-only mode
    ///
    /// # Errors
    /// * `AppError::Configuration` if the file is absent, not a file, or unreadable
    pub async fn open_local(path: &Path) -> Result<Self, AppError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            AppError::Configuration(format!(
                "Local database not found at {}: {}",
                path.display(),
                e
            ))
        })?;
        if !metadata.is_file() {
            return Err(AppError::Configuration(format!(
                "Local database path is not a file: {}",
                path.display()
            )));
        }
        std::fs::File::open(path).map_err(|e| {
            AppError::Configuration(format!(
                "Local database is not readable at {}: {}",
                path.display(),
                e
            ))
        })?;

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::Configuration(format!(
                    "Failed to open local database {}: {}",
                    path.display(),
                    e
                ))
            })?;

        info!(path = %path.display(), "Opened local database (read-only)");

        Ok(Self {
            pool: Pool::Sqlite(pool),
            description: format!("sqlite:{}", path.display()),
        })
    }

    /// Connect to a remote MySQL server
    ///
    /// # Errors
    /// * `AppError::Configuration` if any credential field is blank (checked
    ///   before any network activity)
    /// * `AppError::Connection` if the server is unreachable or rejects the login
    pub async fn connect_mysql(credentials: &RemoteCredentials) -> Result<Self, AppError> {
        credentials.validate()?;
        let (host, port) = credentials.host_and_port()?;

        let mut options = MySqlConnectOptions::new()
            .host(&host)
            .username(credentials.user.trim())
            .password(&credentials.password)
            .database(credentials.database.trim());
        if let Some(port) = port {
            options = options.port(port);
        }

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(MYSQL_ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::Connection(format!(
                    "Failed to connect to MySQL at {} as {}: {}",
                    credentials.host, credentials.user, e
                ))
            })?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| AppError::Connection(format!("MySQL connectivity check failed: {}", e)))?;

        info!(
            host = %credentials.host,
            database = %credentials.database,
            "Connected to MySQL database"
        );

        Ok(Self {
            pool: Pool::Mysql(pool),
            description: format!(
                "mysql://{}@{}/{}",
                credentials.user, credentials.host, credentials.database
            ),
        })
    }

    /// SQL dialect of the underlying engine
    pub fn dialect(&self) -> Dialect {
        match self.pool {
            Pool::Sqlite(_) => Dialect::Sqlite,
            Pool::Mysql(_) => Dialect::Mysql,
        }
    }

    /// Human readable location, never includes secrets
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Names of the user tables and views, sorted
    pub async fn table_names(&self) -> Result<Vec<String>, AppError> {
        let names = match &self.pool {
            Pool::Sqlite(pool) => sqlx::query_scalar::<_, String>(
                "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') \
                 AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )
            .fetch_all(pool)
            .await,
            Pool::Mysql(pool) => sqlx::query_scalar::<_, String>(
                "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
                 WHERE table_schema = DATABASE() ORDER BY table_name",
            )
            .fetch_all(pool)
            .await,
        }
        .map_err(|e| AppError::Agent(format!("Failed to list tables: {}", e)))?;

        Ok(names)
    }

    /// Describe tables: their `CREATE` statement followed by a few sample rows
    ///
    /// # Errors
    /// * `AppError::Agent` naming the tables that do not exist
    pub async fn table_info(&self, tables: &[String]) -> Result<String, AppError> {
        let known = self.table_names().await?;
        let unknown: Vec<&str> = tables
            .iter()
            .filter(|t| !known.iter().any(|k| k.eq_ignore_ascii_case(t)))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::Agent(format!(
                "table_names {{{}}} not found in database",
                unknown.join(", ")
            )));
        }

        let mut sections = Vec::with_capacity(tables.len());
        for table in tables {
            // Use the stored spelling so identifier quoting matches
            let name = known
                .iter()
                .find(|k| k.eq_ignore_ascii_case(table))
                .unwrap_or(table);
            let ddl = self.create_statement(name).await?;
            let sample = self
                .fetch(&format!(
                    "SELECT * FROM {} LIMIT {}",
                    self.quote_identifier(name),
                    SAMPLE_ROWS_IN_TABLE_INFO
                ))
                .await?;
            sections.push(format!(
                "{}\n\n/*\n{} rows from {} table:\n{}\n*/",
                ddl.trim(),
                SAMPLE_ROWS_IN_TABLE_INFO,
                name,
                sample.render_table()
            ));
        }

        Ok(sections.join("\n\n"))
    }

    /// Execute a statement and render its rows
    pub async fn run(&self, sql: &str) -> Result<String, AppError> {
        Ok(self.fetch(sql).await?.render())
    }

    /// Execute a statement and decode its rows
    ///
    /// # Errors
    /// * `AppError::Agent` if the engine rejects the statement
    pub async fn fetch(&self, sql: &str) -> Result<QueryOutput, AppError> {
        debug!(dialect = %self.dialect(), sql = %sql, "Executing SQL");

        let output = match &self.pool {
            Pool::Sqlite(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await;
                rows.map(|rows| QueryOutput {
                    columns: rows.first().map(column_names).unwrap_or_default(),
                    rows: rows.iter().map(decode_sqlite_row).collect(),
                })
            }
            Pool::Mysql(pool) => {
                let rows = sqlx::query(sql).fetch_all(pool).await;
                rows.map(|rows| QueryOutput {
                    columns: rows.first().map(column_names).unwrap_or_default(),
                    rows: rows.iter().map(decode_mysql_row).collect(),
                })
            }
        }
        .map_err(|e| AppError::Agent(format!("SQL error: {}", e)))?;

        debug!(rows = output.rows.len(), "SQL executed");
        Ok(output)
    }

    async fn create_statement(&self, table: &str) -> Result<String, AppError> {
        match &self.pool {
            Pool::Sqlite(pool) => {
                sqlx::query_scalar::<_, String>("SELECT sql FROM sqlite_master WHERE name = ?")
                    .bind(table)
                    .fetch_one(pool)
                    .await
                    .map_err(|e| {
                        AppError::Agent(format!("Failed to describe table {}: {}", table, e))
                    })
            }
            Pool::Mysql(pool) => {
                let row = sqlx::query(&format!(
                    "SHOW CREATE TABLE {}",
                    self.quote_identifier(table)
                ))
                .fetch_one(pool)
                .await
                .map_err(|e| {
                    AppError::Agent(format!("Failed to describe table {}: {}", table, e))
                })?;
                Ok(row.try_get_unchecked::<String, _>(1).unwrap_or_default())
            }
        }
    }

    fn quote_identifier(&self, name: &str) -> String {
        match self.dialect() {
            Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
            Dialect::Mysql => format!("`{}`", name.replace('`', "``")),
        }
    }
}

fn column_names<R: Row>(row: &R) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn decode_sqlite_row(row: &SqliteRow) -> Vec<SqlValue> {
    (0..row.len())
        .map(|i| {
            if row.try_get_raw(i).map(|v| v.is_null()).unwrap_or(true) {
                SqlValue::Null
            } else if let Ok(v) = row.try_get::<i64, _>(i) {
                SqlValue::Int(v)
            } else if let Ok(v) = row.try_get::<f64, _>(i) {
                SqlValue::Float(v)
            } else if let Ok(v) = row.try_get::<String, _>(i) {
                SqlValue::Text(v)
            } else if let Ok(v) = row.try_get::<Vec<u8>, _>(i) {
                SqlValue::Bytes(v.len())
            } else {
                SqlValue::Text(row.try_get_unchecked::<String, _>(i).unwrap_or_default())
            }
        })
        .collect()
}

fn decode_mysql_row(row: &MySqlRow) -> Vec<SqlValue> {
    (0..row.len())
        .map(|i| {
            if row.try_get_raw(i).map(|v| v.is_null()).unwrap_or(true) {
                SqlValue::Null
            } else if let Ok(v) = row.try_get::<i64, _>(i) {
                SqlValue::Int(v)
            } else if let Ok(v) = row.try_get::<u64, _>(i) {
                SqlValue::UInt(v)
            } else if let Ok(v) = row.try_get::<f64, _>(i) {
                SqlValue::Float(v)
            } else if let Ok(v) = row.try_get::<String, _>(i) {
                SqlValue::Text(v)
            } else if let Ok(v) = row.try_get::<chrono::NaiveDateTime, _>(i) {
                SqlValue::Text(v.to_string())
            } else if let Ok(v) = row.try_get::<chrono::NaiveDate, _>(i) {
                SqlValue::Text(v.to_string())
            } else if let Ok(v) = row.try_get::<Vec<u8>, _>(i) {
                SqlValue::Bytes(v.len())
            } else {
                // DECIMAL and friends arrive as text on the wire
                SqlValue::Text(row.try_get_unchecked::<String, _>(i).unwrap_or_default())
            }
        })
        .collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use tempfile::TempDir;

    /// Create a small students database on disk and return its directory
    async fn seed_students_db() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("student.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE students (name TEXT, class TEXT, section TEXT, marks INTEGER)",
        )
        .execute(&pool)
        .await
        .unwrap();
        for (name, class, section, marks) in [
            ("Krish", "Data Science", "A", 90),
            ("John", "Data Science", "B", 100),
            ("Mukesh", "Data Science", "A", 86),
            ("Jacob", "DEVOPS", "A", 50),
        ] {
            sqlx::query("INSERT INTO students VALUES (?, ?, ?, ?)")
                .bind(name)
                .bind(class)
                .bind(section)
                .bind(marks)
                .execute(&pool)
                .await
                .unwrap();
        }
        pool.close().await;
        (dir, path)
    }

    #[tokio::test]
    async fn test_open_local_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = SqlDatabase::open_local(&dir.path().join("nope.db")).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_open_local_directory_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = SqlDatabase::open_local(dir.path()).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_count_query() {
        let (_dir, path) = seed_students_db().await;
        let db = SqlDatabase::open_local(&path).await.unwrap();
        assert_eq!(db.dialect(), Dialect::Sqlite);
        let out = db.run("SELECT COUNT(*) FROM students").await.unwrap();
        assert_eq!(out, "[(4,)]");
    }

    #[tokio::test]
    async fn test_rendering_mixed_values() {
        let (_dir, path) = seed_students_db().await;
        let db = SqlDatabase::open_local(&path).await.unwrap();
        let out = db
            .run("SELECT name, marks, NULL FROM students WHERE marks = 100")
            .await
            .unwrap();
        assert_eq!(out, "[('John', 100, None)]");
    }

    #[tokio::test]
    async fn test_empty_result_renders_empty() {
        let (_dir, path) = seed_students_db().await;
        let db = SqlDatabase::open_local(&path).await.unwrap();
        let out = db
            .run("SELECT name FROM students WHERE marks > 1000")
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_local_handle_is_read_only() {
        let (_dir, path) = seed_students_db().await;
        let db = SqlDatabase::open_local(&path).await.unwrap();
        let result = db.run("DELETE FROM students").await;
        assert!(matches!(result, Err(AppError::Agent(_))));
        let out = db.run("SELECT COUNT(*) FROM students").await.unwrap();
        assert_eq!(out, "[(4,)]");
    }

    #[tokio::test]
    async fn test_bad_sql_is_agent_error() {
        let (_dir, path) = seed_students_db().await;
        let db = SqlDatabase::open_local(&path).await.unwrap();
        let err = db.run("SELEC nonsense").await.unwrap_err();
        assert!(err.to_string().contains("SQL error"));
    }

    #[tokio::test]
    async fn test_table_names_and_info() {
        let (_dir, path) = seed_students_db().await;
        let db = SqlDatabase::open_local(&path).await.unwrap();
        assert_eq!(db.table_names().await.unwrap(), vec!["students".to_string()]);

        let info = db.table_info(&["students".to_string()]).await.unwrap();
        assert!(info.contains("CREATE TABLE students"));
        assert!(info.contains("3 rows from students table:"));
        assert!(info.contains("name\tclass\tsection\tmarks"));
        assert!(info.contains("Krish"));
    }

    #[tokio::test]
    async fn test_table_info_unknown_table() {
        let (_dir, path) = seed_students_db().await;
        let db = SqlDatabase::open_local(&path).await.unwrap();
        let err = db
            .table_info(&["courses".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("courses"));
    }

    #[tokio::test]
    async fn test_connect_mysql_rejects_blank_fields_before_network() {
        // An unroutable host would hang if a connection were attempted
        let creds = RemoteCredentials::new("10.255.255.1", "", "secret", "sales");
        let result = SqlDatabase::connect_mysql(&creds).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_mysql_closed_port_is_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let host = listener.local_addr().unwrap().to_string();
        drop(listener);

        let creds = RemoteCredentials::new(host, "root", "secret", "sales");
        let result = tokio::time::timeout(
            MYSQL_ACQUIRE_TIMEOUT * 3,
            SqlDatabase::connect_mysql(&creds),
        )
        .await
        .unwrap();
        match result {
            Err(AppError::Connection(msg)) => assert!(!msg.contains("secret")),
            Err(other) => panic!("Expected Connection error, got {:?}", other),
            Ok(_) => panic!("Expected Connection error, got a handle"),
        }
    }

    #[tokio::test]
    async fn test_connect_mysql_silent_server_times_out() {
        // Completes the TCP handshake but never sends the server greeting
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = listener.local_addr().unwrap().to_string();

        let creds = RemoteCredentials::new(host, "root", "secret", "sales");
        let result = tokio::time::timeout(
            MYSQL_ACQUIRE_TIMEOUT * 3,
            SqlDatabase::connect_mysql(&creds),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(AppError::Connection(_))));
        drop(listener);
    }

    #[test]
    fn test_truncate_long_text() {
        let long = "x".repeat(MAX_VALUE_LENGTH + 10);
        let rendered = SqlValue::Text(long).to_string();
        assert!(rendered.ends_with("...'"));
        assert_eq!(rendered.len(), MAX_VALUE_LENGTH + 5);
    }
}
