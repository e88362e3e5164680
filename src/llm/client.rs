//! Model client abstraction
//!
//! A model handle generates text for a list of prompt messages and, when
//! streaming, pushes each text delta to a step observer as it arrives.

use crate::agent::observer::StepObserver;
use crate::config::ModelConfig;
use crate::error::AppError;
use crate::llm::groq::GroqClient;
use crate::llm::types::PromptMessage;
use async_trait::async_trait;
use std::sync::Arc;

/// Shared model handle
pub type ModelHandle = Arc<dyn ModelClient>;

/// A configured, authenticated text-generation service
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Identifier of the model requests are sent to
    fn model_id(&self) -> &str;

    /// Generate a completion for `messages`, stopping at any of `stop`
    ///
    /// # Errors
    /// * `AppError::Agent` on network failure, quota exhaustion, or a
    ///   malformed response
    async fn complete(
        &self,
        messages: &[PromptMessage],
        stop: &[String],
        observer: &dyn StepObserver,
    ) -> Result<String, AppError>;
}

/// Build a model handle for one session
///
/// # Errors
/// * `AppError::Configuration` if the API key or model id is blank
pub fn create_model_client(
    api_key: &str,
    model_id: &str,
    streaming: bool,
    config: &ModelConfig,
) -> Result<ModelHandle, AppError> {
    if api_key.trim().is_empty() {
        return Err(AppError::Configuration(
            "Please enter your Groq API Key to continue.".to_string(),
        ));
    }
    if model_id.trim().is_empty() {
        return Err(AppError::Configuration("Model id cannot be empty".to_string()));
    }

    let client = GroqClient::new(
        api_key.trim(),
        model_id.trim(),
        &config.api_base_url,
        streaming,
        config.timeout,
    )?;
    Ok(Arc::new(client))
}
