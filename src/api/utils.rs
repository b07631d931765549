//! API utility functions
//!
//! Contains helper functions used by API handlers for request validation.

use crate::error::AppError;

/// Maximum message length in characters
pub const MAX_MESSAGE_LENGTH: usize = 10_000; // 10KB max message length

/// Validate a chat message
///
/// # Arguments
/// * `message` - Message text to validate
///
/// # Returns
/// * `Ok(())` - Message is valid
/// * `Err(AppError)` - Message is invalid (empty or too long)
pub fn validate_message(message: &str) -> Result<(), AppError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(
            "Message cannot be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(AppError::InvalidRequest(format!(
            "Message exceeds maximum length of {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}
