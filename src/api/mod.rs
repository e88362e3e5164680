//! API module
//!
//! HTTP handlers for the chat page, sessions, and question streaming.

pub mod chat;
pub mod sessions;
pub mod streaming;
pub mod utils;

use axum::{
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use utils::RouterState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    message: String,
}

/// Build the application routes
pub fn router(state: RouterState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health_check))
        .route("/api/sessions", post(sessions::create_session))
        .route(
            "/api/sessions/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/api/sessions/:id/transcript", get(sessions::get_transcript))
        .route("/api/sessions/:id/clear", post(sessions::clear_session))
        .route("/api/sessions/:id/messages", post(chat::send_message))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        message: "Assistant is healthy".to_string(),
    })
}
