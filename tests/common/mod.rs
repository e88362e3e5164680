//! Shared helpers for integration tests

#![allow(dead_code)]

use sql_analytics_assistant::config::Config;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Write the five-row STUDENT table into `dir/student.db`
pub async fn seed_student_db(dir: &Path) -> PathBuf {
    let path = dir.join("student.db");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .expect("Failed to create test database");

    sqlx::query("CREATE TABLE STUDENT (NAME VARCHAR(25), CLASS VARCHAR(25), SECTION VARCHAR(25), MARKS INT)")
        .execute(&pool)
        .await
        .expect("Failed to create table");
    sqlx::query(
        "INSERT INTO STUDENT VALUES \
         ('Krish', 'Data Science', 'A', 90), \
         ('John', 'Data Science', 'B', 100), \
         ('Mukesh', 'Data Science', 'A', 86), \
         ('Jacob', 'DEVOPS', 'A', 50), \
         ('Dipesh', 'DEVOPS', 'A', 35)",
    )
    .execute(&pool)
    .await
    .expect("Failed to insert rows");
    pool.close().await;

    path
}

/// Configuration pointing at a test database and a mock model server
pub fn test_config(db_path: PathBuf, model_base_url: &str) -> Config {
    let mut config = Config::default();
    config.database.local_db_path = db_path;
    config.model.api_base_url = model_base_url.to_string();
    config.model.timeout = Duration::from_secs(5);
    config.agent.max_iterations = 5;
    config
}

/// Streamed chat completion body emitting `text` in two deltas
pub fn completion_stream(text: &str) -> String {
    let mid = text
        .char_indices()
        .nth(text.chars().count() / 2)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let (head, tail) = text.split_at(mid);
    let mut body = String::new();
    for part in [head, tail] {
        let chunk = serde_json::json!({"choices": [{"delta": {"content": part}}]});
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
