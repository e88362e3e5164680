//! Session API endpoints
//!
//! Sidebar actions: connect with settings, view and clear the transcript, end
//! the session.

use crate::api::utils::RouterState;
use crate::error::AppError;
use crate::session::{LoopState, RenderedView, SessionInfo, SessionSettings, TranscriptEntry};
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;

/// Response after a session is created
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    /// Session description, including its id
    #[serde(flatten)]
    pub session: SessionInfo,
    /// Initial transcript (the greeting)
    pub transcript: Vec<TranscriptEntry>,
}

/// Transcript of one session
#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    /// Session id
    pub session_id: String,
    /// Interaction loop state
    pub state: LoopState,
    /// Entries in conversation order
    pub transcript: Vec<TranscriptEntry>,
}

impl TranscriptResponse {
    fn from_view(session_id: &str, view: RenderedView) -> Self {
        Self {
            session_id: session_id.to_string(),
            state: view.state,
            transcript: view.entries,
        }
    }
}

/// POST /api/sessions - Validate settings, connect, and start a session
pub async fn create_session(
    State(state): State<RouterState>,
    Json(settings): Json<SessionSettings>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    let session = state.sessions.create_session(settings).await?;
    let view = session.view().await;

    Ok(Json(CreateSessionResponse {
        session: session.info().clone(),
        transcript: view.entries,
    }))
}

/// GET /api/sessions/:id - Session description
pub async fn get_session(
    State(state): State<RouterState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, AppError> {
    let session = state.sessions.get(&id).await?;
    Ok(Json(session.info().clone()))
}

/// GET /api/sessions/:id/transcript - Replay the transcript
pub async fn get_transcript(
    State(state): State<RouterState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let session = state.sessions.get(&id).await?;
    let view = session.view().await;
    Ok(Json(TranscriptResponse::from_view(&id, view)))
}

/// POST /api/sessions/:id/clear - Reset the transcript to the greeting
pub async fn clear_session(
    State(state): State<RouterState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let session = state.sessions.get(&id).await?;
    let view = session.clear().await;
    Ok(Json(TranscriptResponse::from_view(&id, view)))
}

/// DELETE /api/sessions/:id - End a session
pub async fn delete_session(
    State(state): State<RouterState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.sessions.remove(&id).await?;

    Ok(Json(serde_json::json!({
        "message": "Session ended",
        "id": id
    })))
}
