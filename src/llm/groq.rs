//! Groq API client
//!
//! HTTP client for the OpenAI-compatible chat completions endpoint served by
//! Groq. Supports both a single JSON response and server-sent event streaming.

use crate::agent::observer::{AgentStep, StepObserver};
use crate::error::AppError;
use crate::llm::client::ModelClient;
use crate::llm::types::{
    ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, PromptMessage,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use std::fmt;
use std::time::Duration;

/// Chat completions client bound to one API key and model
pub struct GroqClient {
    http: reqwest::Client,
    api_key: String,
    model_id: String,
    base_url: String,
    streaming: bool,
}

impl fmt::Debug for GroqClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroqClient")
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .field("streaming", &self.streaming)
            .finish_non_exhaustive()
    }
}

impl GroqClient {
    /// Create a client
    ///
    /// # Errors
    /// * `AppError::Internal` if the HTTP client cannot be built
    pub fn new(
        api_key: &str,
        model_id: &str,
        base_url: &str,
        streaming: bool,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model_id: model_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            streaming,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send(
        &self,
        messages: &[PromptMessage],
        stop: &[String],
        stream: bool,
    ) -> Result<reqwest::Response, AppError> {
        let body = ChatCompletionRequest {
            model: &self.model_id,
            messages,
            temperature: 0.0,
            stream,
            stop,
        };

        tracing::debug!(
            model = %self.model_id,
            stream = stream,
            messages = messages.len(),
            "Calling chat completions API"
        );

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Agent(format!("Failed to reach model API: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());

        tracing::error!(
            status_code = status_code,
            error_body = %error_body,
            "Model API returned error status"
        );

        Err(match status_code {
            401 | 403 => AppError::Agent(format!(
                "Model API authentication failed (HTTP {}): {}",
                status_code, error_body
            )),
            429 => AppError::Agent(format!(
                "Model API rate limit exceeded (HTTP {}): {}",
                status_code, error_body
            )),
            _ => AppError::Agent(format!(
                "Model API returned error status {}: {}",
                status_code, error_body
            )),
        })
    }

    async fn complete_once(
        &self,
        messages: &[PromptMessage],
        stop: &[String],
    ) -> Result<String, AppError> {
        let response = self.send(messages, stop, false).await?;
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Agent(format!("Failed to read model response: {}", e)))?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::Agent(format!(
                "Failed to parse JSON response from model API: {} - Response body: {}",
                e, body
            ))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::Agent("Model response contains no choices".to_string()))?;

        tracing::debug!(response_len = text.len(), "Received model response");
        Ok(text)
    }

    async fn complete_streaming(
        &self,
        messages: &[PromptMessage],
        stop: &[String],
        observer: &dyn StepObserver,
    ) -> Result<String, AppError> {
        let response = self.send(messages, stop, true).await?;
        let mut bytes = response.bytes_stream();
        let mut parser = SseParser::default();
        let mut text = String::new();

        'stream: while let Some(chunk) = bytes.next().await {
            let chunk =
                chunk.map_err(|e| AppError::Agent(format!("Model stream interrupted: {}", e)))?;

            for event in parser.push(&chunk) {
                match event {
                    SseEvent::Done => break 'stream,
                    SseEvent::Data(data) => {
                        if let Some(delta) = parse_chunk(&data)? {
                            observer.on_step(AgentStep::Token {
                                text: delta.clone(),
                            });
                            text.push_str(&delta);
                        }
                    }
                }
            }
        }

        // A final event without a trailing newline
        if let Some(SseEvent::Data(data)) = parser.finish() {
            if let Some(delta) = parse_chunk(&data)? {
                observer.on_step(AgentStep::Token {
                    text: delta.clone(),
                });
                text.push_str(&delta);
            }
        }

        tracing::debug!(response_len = text.len(), "Model stream finished");
        Ok(text)
    }
}

#[async_trait]
impl ModelClient for GroqClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(
        &self,
        messages: &[PromptMessage],
        stop: &[String],
        observer: &dyn StepObserver,
    ) -> Result<String, AppError> {
        if self.streaming {
            self.complete_streaming(messages, stop, observer).await
        } else {
            self.complete_once(messages, stop).await
        }
    }
}

/// Parse one `data:` payload into its text delta, if any
fn parse_chunk(data: &str) -> Result<Option<String>, AppError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data).map_err(|e| {
        AppError::Agent(format!("Malformed stream chunk from model API: {} - {}", e, data))
    })?;

    if let Some(error) = chunk.error {
        return Err(AppError::Agent(format!(
            "Model API reported an error mid-stream: {}",
            error.message
        )));
    }

    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

#[derive(Debug, PartialEq)]
enum SseEvent {
    Data(String),
    Done,
}

/// Line-buffered server-sent event reader
///
/// Chunks may split lines, and multi-byte characters, anywhere. Bytes are
/// only decoded once a full line is buffered.
#[derive(Default)]
struct SseParser {
    buffer: Vec<u8>,
}

impl SseParser {
    fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(event) = Self::decode_line(&line[..line_end]) {
                events.push(event);
            }
        }

        events
    }

    fn finish(&mut self) -> Option<SseEvent> {
        let line = std::mem::take(&mut self.buffer);
        Self::decode_line(&line)
    }

    fn decode_line(line: &[u8]) -> Option<SseEvent> {
        match std::str::from_utf8(line) {
            Ok(text) => Self::parse_line(text.trim()),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping non UTF-8 line in model stream");
                None
            }
        }
    }

    fn parse_line(line: &str) -> Option<SseEvent> {
        if line.is_empty() || line.starts_with(':') {
            return None;
        }
        let data = line.strip_prefix("data:")?.trim_start();
        if data == "[DONE]" {
            Some(SseEvent::Done)
        } else {
            Some(SseEvent::Data(data.to_string()))
        }
    }
}
