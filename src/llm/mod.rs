//! Language model module
//!
//! Model client abstraction and the Groq chat completions implementation.

pub mod client;
pub mod groq;
pub mod types;

pub use client::{create_model_client, ModelClient, ModelHandle};
pub use groq::GroqClient;
pub use types::{PromptMessage, PromptRole};
