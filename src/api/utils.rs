//! API utility functions
//!
//! Shared router state type and request validation helpers.

use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;

/// State extracted by every handler
pub type RouterState = Arc<AppState>;

/// Validate a submitted question
///
/// # Arguments
/// * `content` - Raw input from the chat box
/// * `max_length` - Maximum accepted length in characters
///
/// # Returns
/// * `Ok(None)` - Input is blank and should be ignored
/// * `Ok(Some(question))` - Trimmed question
/// * `Err(AppError)` - Input is too long
pub fn validate_question(content: &str, max_length: usize) -> Result<Option<&str>, AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_length {
        return Err(AppError::InvalidInput(format!(
            "Question exceeds maximum length of {} characters",
            max_length
        )));
    }
    Ok(Some(trimmed))
}
