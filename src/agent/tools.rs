//! SQL toolkit
//!
//! The tools the agent may call against a database handle. Tool failures are
//! returned as observation text so the model can correct itself.

use crate::agent::observer::StepObserver;
use crate::database::DatabaseHandle;
use crate::llm::{ModelHandle, PromptMessage};
use tracing::debug;

/// A tool the agent can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlTool {
    /// Run a query and return its rows
    Query,
    /// Describe tables
    Schema,
    /// List tables
    ListTables,
    /// Ask the model to double check a query before it runs
    QueryChecker,
}

impl SqlTool {
    /// Every tool, in the order presented to the model
    pub const ALL: [SqlTool; 4] = [
        SqlTool::Query,
        SqlTool::Schema,
        SqlTool::ListTables,
        SqlTool::QueryChecker,
    ];

    /// Name the model uses to call the tool
    pub fn name(&self) -> &'static str {
        match self {
            SqlTool::Query => "sql_db_query",
            SqlTool::Schema => "sql_db_schema",
            SqlTool::ListTables => "sql_db_list_tables",
            SqlTool::QueryChecker => "sql_db_query_checker",
        }
    }

    /// Description shown to the model
    pub fn description(&self) -> &'static str {
        match self {
            SqlTool::Query => {
                "Input is a detailed and correct SQL query, output is the result from the \
                 database. If the query is not correct, an error message is returned; rewrite \
                 the query, check it, and try again. If you get an unknown column error, use \
                 sql_db_schema to look up the correct table fields."
            }
            SqlTool::Schema => {
                "Input is a comma-separated list of tables, output is the schema and sample \
                 rows for those tables. Call sql_db_list_tables first to be sure the tables \
                 exist. Example Input: table1, table2, table3"
            }
            SqlTool::ListTables => {
                "Input is an empty string, output is a comma-separated list of tables in the \
                 database."
            }
            SqlTool::QueryChecker => {
                "Use this tool to double check if your query is correct before executing it. \
                 Always use this tool before executing a query with sql_db_query!"
            }
        }
    }

    /// Look a tool up by the name the model wrote
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

/// Tools bound to one database handle and model
pub struct SqlToolkit {
    db: DatabaseHandle,
    model: ModelHandle,
}

impl SqlToolkit {
    /// Bind the toolkit
    pub fn new(db: DatabaseHandle, model: ModelHandle) -> Self {
        Self { db, model }
    }

    /// The database the tools act on
    pub fn database(&self) -> &DatabaseHandle {
        &self.db
    }

    /// Invoke a tool by name and return the observation
    pub async fn invoke(&self, tool_name: &str, input: &str, observer: &dyn StepObserver) -> String {
        let Some(tool) = SqlTool::from_name(tool_name) else {
            let names: Vec<&str> = SqlTool::ALL.iter().map(|t| t.name()).collect();
            return format!(
                "{} is not a valid tool, try one of [{}].",
                tool_name.trim(),
                names.join(", ")
            );
        };

        debug!(tool = tool.name(), input_len = input.len(), "Invoking SQL tool");

        let result = match tool {
            SqlTool::Query => self.db.run(input).await,
            SqlTool::Schema => {
                let tables: Vec<String> = input
                    .split(',')
                    .map(|t| t.trim().trim_matches('`').trim_matches('"').to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                self.db.table_info(&tables).await
            }
            SqlTool::ListTables => self.db.table_names().await.map(|names| names.join(", ")),
            SqlTool::QueryChecker => self.check_query(input, observer).await,
        };

        result.unwrap_or_else(|e| format!("Error: {}", e))
    }

    async fn check_query(
        &self,
        query: &str,
        observer: &dyn StepObserver,
    ) -> Result<String, crate::error::AppError> {
        let prompt = format!(
            "{query}\n\
             Double check the {dialect} query above for common mistakes, including:\n\
             - Using NOT IN with NULL values\n\
             - Using UNION when UNION ALL should have been used\n\
             - Using BETWEEN for exclusive ranges\n\
             - Data type mismatch in predicates\n\
             - Properly quoting identifiers\n\
             - Using the correct number of arguments for functions\n\
             - Casting to the correct data type\n\
             - Using the proper columns for joins\n\
             \n\
             If there are any of the above mistakes, rewrite the query. If there are no \
             mistakes, just reproduce the original query.\n\
             \n\
             Output the final SQL query only.\n\
             \n\
             SQL Query: ",
            query = query,
            dialect = self.db.dialect(),
        );

        let checked = self
            .model
            .complete(&[PromptMessage::user(prompt)], &[], observer)
            .await?;
        Ok(checked.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::observer::NoopObserver;
    use crate::test_support::{seed_students_db, ScriptedModel};
    use std::sync::Arc;

    #[test]
    fn test_from_name() {
        assert_eq!(SqlTool::from_name("sql_db_query"), Some(SqlTool::Query));
        assert_eq!(SqlTool::from_name(" sql_db_schema "), Some(SqlTool::Schema));
        assert_eq!(SqlTool::from_name("drop_everything"), None);
    }

    #[tokio::test]
    async fn test_invoke_list_tables_and_query() {
        let (_dir, db) = seed_students_db().await;
        let toolkit = SqlToolkit::new(db, Arc::new(ScriptedModel::new(Vec::new())));

        let tables = toolkit.invoke("sql_db_list_tables", "", &NoopObserver).await;
        assert_eq!(tables, "students");

        let rows = toolkit
            .invoke("sql_db_query", "SELECT COUNT(*) FROM students", &NoopObserver)
            .await;
        assert_eq!(rows, "[(5,)]");
    }

    #[tokio::test]
    async fn test_invoke_errors_become_observations() {
        let (_dir, db) = seed_students_db().await;
        let toolkit = SqlToolkit::new(db, Arc::new(ScriptedModel::new(Vec::new())));

        let out = toolkit
            .invoke("sql_db_query", "SELECT nope FROM students", &NoopObserver)
            .await;
        assert!(out.starts_with("Error:"));

        let out = toolkit.invoke("sql_db_schema", "courses", &NoopObserver).await;
        assert!(out.starts_with("Error:"));
        assert!(out.contains("courses"));

        let out = toolkit.invoke("shell", "rm -rf /", &NoopObserver).await;
        assert!(out.contains("is not a valid tool"));
    }

    #[tokio::test]
    async fn test_query_checker_uses_model() {
        let (_dir, db) = seed_students_db().await;
        let model = Arc::new(ScriptedModel::new(vec![Ok(
            "  SELECT COUNT(*) FROM students  ".to_string()
        )]));
        let toolkit = SqlToolkit::new(db, model.clone());

        let out = toolkit
            .invoke(
                "sql_db_query_checker",
                "SELECT COUNT(*) FROM students",
                &NoopObserver,
            )
            .await;
        assert_eq!(out, "SELECT COUNT(*) FROM students");

        let prompts = model.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0][0].content.contains("Double check the sqlite query"));
    }
}
