//! Shared fixtures for unit tests

use crate::agent::observer::{AgentStep, StepObserver};
use crate::database::{DatabaseHandle, SqlDatabase};
use crate::error::AppError;
use crate::llm::{ModelClient, PromptMessage};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Write a five-row students table to a temp file and open it read-only
pub async fn seed_students_db() -> (TempDir, DatabaseHandle) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("student.db");
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(
            SqliteConnectOptions::new()
                .filename(&path)
                .create_if_missing(true),
        )
        .await
        .unwrap();
    sqlx::query("CREATE TABLE students (name TEXT, class TEXT, section TEXT, marks INTEGER)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO students VALUES \
         ('Krish', 'Data Science', 'A', 90), \
         ('John', 'Data Science', 'B', 100), \
         ('Mukesh', 'Data Science', 'A', 86), \
         ('Jacob', 'DEVOPS', 'A', 50), \
         ('Dipesh', 'DEVOPS', 'A', 35)",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    let db = SqlDatabase::open_local(&path).await.unwrap();
    (dir, Arc::new(db))
}

/// Model that replays canned replies and records every prompt it was sent
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, AppError>>>,
    prompts: Mutex<Vec<Vec<PromptMessage>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String, AppError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<Vec<PromptMessage>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    fn model_id(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[PromptMessage],
        _stop: &[String],
        observer: &dyn StepObserver,
    ) -> Result<String, AppError> {
        self.prompts.lock().unwrap().push(messages.to_vec());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Agent("script exhausted".to_string())));
        if let Ok(text) = &reply {
            observer.on_step(AgentStep::Token { text: text.clone() });
        }
        reply
    }
}
