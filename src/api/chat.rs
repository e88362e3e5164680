//! Chat API endpoint
//!
//! Submits a question to a session and streams the agent's progress back as
//! Server-Sent Events.

use crate::api::streaming::{create_sse_response, ChannelSink};
use crate::api::utils::{validate_question, RouterState};
use crate::error::AppError;
use crate::session::SubmitOutcome;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use tracing::{debug, info};

/// Request to send a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Message content
    pub content: String,
}

/// POST /api/sessions/:id/messages - Ask a question
///
/// Blank input returns `204 No Content` without touching the transcript.
/// Otherwise the response is an SSE stream of `step` events for the live
/// trace and `transcript` events when entries are appended, ending with
/// `[DONE]`. The agent keeps running if the client disconnects, so the
/// answer still lands in the transcript.
pub async fn send_message(
    State(state): State<RouterState>,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Response, AppError> {
    let Some(question) =
        validate_question(&request.content, state.config.server.max_question_length)?
    else {
        debug!(session_id = %id, "Blank message ignored");
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let session = state.sessions.get(&id).await?;
    let mut interaction = session.try_begin()?;
    let agent = session.agent();
    let question = question.to_string();
    let (sink, rx) = ChannelSink::channel();

    info!(session_id = %id, question_len = question.len(), "Question received");

    tokio::spawn(async move {
        let outcome = interaction
            .submit(&question, agent.as_ref(), &sink, &sink)
            .await;
        match outcome {
            SubmitOutcome::Answered(_) => info!(session_id = %id, "Question answered"),
            SubmitOutcome::Degraded(_) => info!(session_id = %id, "Question answered with error"),
            SubmitOutcome::Ignored => {}
        }
    });

    create_sse_response(rx)
}
