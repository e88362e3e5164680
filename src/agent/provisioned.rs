//! Per-question database binding
//!
//! A session keeps its [`DatabaseTarget`] rather than a handle. Each question
//! resolves the handle through the [`ConnectionProvisioner`], so an expired
//! handle is reopened on the next question and only live questions pin a pool.

use crate::agent::observer::StepObserver;
use crate::agent::sql_agent::{create_agent, QueryAgent};
use crate::config::AgentConfig;
use crate::database::{ConnectionProvisioner, DatabaseTarget};
use crate::error::AppError;
use crate::llm::ModelHandle;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::error;

/// Agent bound to a database target instead of a fixed handle
pub struct ProvisionedAgent {
    target: DatabaseTarget,
    provisioner: Arc<ConnectionProvisioner>,
    model: ModelHandle,
    config: AgentConfig,
}

impl ProvisionedAgent {
    /// Bind a model to a target served by `provisioner`
    pub fn new(
        target: DatabaseTarget,
        provisioner: Arc<ConnectionProvisioner>,
        model: ModelHandle,
        config: &AgentConfig,
    ) -> Self {
        Self {
            target,
            provisioner,
            model,
            config: config.clone(),
        }
    }

    /// Database this agent answers against
    pub fn target(&self) -> &DatabaseTarget {
        &self.target
    }
}

#[async_trait]
impl QueryAgent for ProvisionedAgent {
    async fn run(&self, question: &str, observer: &dyn StepObserver) -> Result<String, AppError> {
        let db = self.provisioner.configure(&self.target).await.map_err(|e| {
            error!(backend = self.target.selection().as_str(), error = %e, "Failed to provision database");
            e
        })?;

        create_agent(db, self.model.clone(), &self.config)
            .run(question, observer)
            .await
    }
}
