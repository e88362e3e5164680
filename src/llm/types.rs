//! Chat completions API types
//!
//! Structs that mirror the OpenAI-compatible chat completions JSON format
//! served by Groq. Used to serialize requests and deserialize responses.

use serde::{Deserialize, Serialize};

/// Role of a prompt message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// Instructions for the model
    System,
    /// Input from the user (or the agent scratchpad)
    User,
    /// Earlier model output
    Assistant,
}

/// A single message sent to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    /// Who authored the message
    pub role: PromptRole,
    /// Message text
    pub content: String,
}

impl PromptMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::System,
            content: content.into(),
        }
    }

    /// User message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: PromptRole::User,
            content: content.into(),
        }
    }
}

/// Request body for `POST /chat/completions`
#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest<'a> {
    /// Model identifier
    pub model: &'a str,
    /// Conversation so far
    pub messages: &'a [PromptMessage],
    /// Sampling temperature
    pub temperature: f32,
    /// Whether to stream the response as server-sent events
    pub stream: bool,
    /// Sequences at which generation stops
    #[serde(skip_serializing_if = "no_stop_sequences")]
    pub stop: &'a [String],
}

fn no_stop_sequences(stop: &&[String]) -> bool {
    stop.is_empty()
}

/// Non-streaming response
#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    /// Generated alternatives (normally one)
    #[serde(default)]
    pub choices: Vec<Choice>,
}

/// A single non-streaming alternative
#[derive(Deserialize, Debug)]
pub struct Choice {
    /// The generated message
    pub message: ChoiceMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Message inside a non-streaming choice
#[derive(Deserialize, Debug)]
pub struct ChoiceMessage {
    /// Generated text
    #[serde(default)]
    pub content: Option<String>,
}

/// One server-sent event payload of a streaming response
#[derive(Deserialize, Debug)]
pub struct ChatCompletionChunk {
    /// Deltas (normally one)
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Error reported mid-stream
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

/// A single streaming alternative
#[derive(Deserialize, Debug)]
pub struct ChunkChoice {
    /// Incremental content
    #[serde(default)]
    pub delta: Delta,
    /// Set on the final chunk
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Incremental content of a streaming choice
#[derive(Deserialize, Debug, Default)]
pub struct Delta {
    /// Text added by this chunk
    #[serde(default)]
    pub content: Option<String>,
}

/// Error payload returned by the API
#[derive(Deserialize, Debug)]
pub struct ApiErrorBody {
    /// Human readable message
    #[serde(default)]
    pub message: String,
}
