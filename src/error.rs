//! Error types and error handling for the application
//!
//! This module defines custom error types that can be converted to HTTP responses.
//! All errors implement `IntoResponse` to provide consistent error formatting.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error types
///
/// Configuration and connection errors halt setup before an agent exists.
/// Agent errors are scoped to a single question and normally end up in the
/// transcript rather than in an HTTP error body.
#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid setup input (API key, credentials, local file path)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Remote database unreachable or authentication rejected
    #[error("Connection error: {0}")]
    Connection(String),

    /// Model call failure or unrecoverable SQL failure while answering a question
    #[error("Agent error: {0}")]
    Agent(String),

    /// Session with the given ID was not found
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A question is already being answered for this session
    #[error("Session busy: {0}")]
    SessionBusy(String),

    /// Request payload is invalid (e.g. question too long)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal server error (catch-all for unexpected errors)
    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status code this error maps to
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Configuration(_) => StatusCode::BAD_REQUEST,
            AppError::Connection(_) => StatusCode::BAD_GATEWAY,
            AppError::Agent(_) => StatusCode::BAD_GATEWAY,
            AppError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SessionBusy(_) => StatusCode::CONFLICT,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
