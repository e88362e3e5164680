//! Streaming utilities for Server-Sent Events (SSE)
//!
//! Bridges the agent's step observer and the interaction loop's renderer onto
//! one channel, and turns that channel into an SSE response body.

use crate::agent::{AgentStep, StepObserver};
use crate::error::AppError;
use crate::session::{RenderedView, TranscriptRenderer};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use futures_util::stream::Stream;
use serde::Serialize;
use tokio::sync::mpsc;

/// SSE stream termination signal
pub const SSE_DONE_SIGNAL: &str = "[DONE]";

/// SSE error prefix
pub const SSE_ERROR_PREFIX: &str = "[ERROR]";

/// Event pushed to the browser while a question is answered
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Intermediate agent step for the live trace
    Step(AgentStep),
    /// Transcript after a change
    Transcript(RenderedView),
}

impl StreamEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Step(_) => "step",
            StreamEvent::Transcript(_) => "transcript",
        }
    }

    /// Render as one SSE frame
    pub fn to_sse(&self) -> String {
        let data = match self {
            StreamEvent::Step(step) => to_json(step),
            StreamEvent::Transcript(view) => to_json(view),
        };
        match data {
            Ok(json) => format!("event: {}\ndata: {}\n\n", self.name(), json),
            Err(e) => format!("data: {} {}\n\n", SSE_ERROR_PREFIX, e),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(value)
}

/// Observer and renderer that forward into a channel
///
/// Sends never block; once the client disconnects events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<StreamEvent>,
}

impl ChannelSink {
    /// Create a sink and the receiver feeding the response
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StepObserver for ChannelSink {
    fn on_step(&self, step: AgentStep) {
        let _ = self.tx.send(StreamEvent::Step(step));
    }
}

impl TranscriptRenderer for ChannelSink {
    fn render(&self, view: &RenderedView) {
        let _ = self.tx.send(StreamEvent::Transcript(view.clone()));
    }
}

/// Create an SSE response from a channel of events
///
/// The stream ends with [`SSE_DONE_SIGNAL`] once every sender is dropped.
pub fn create_sse_response(
    rx: mpsc::UnboundedReceiver<StreamEvent>,
) -> Result<Response, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(create_stream(rx)))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build SSE response: {}", e)))
}

fn create_stream(
    mut rx: mpsc::UnboundedReceiver<StreamEvent>,
) -> impl Stream<Item = Result<String, std::io::Error>> {
    use async_stream::stream;

    stream! {
        while let Some(event) = rx.recv().await {
            yield Ok(event.to_sse());
        }
        yield Ok(format!("data: {}\n\n", SSE_DONE_SIGNAL));
    }
}
