//! Bridge data models
//!
//! Defines the chat request relayed to the upstream agent.

use crate::bridge::error::BridgeError;
use serde::Serialize;

/// A single logical chat request
///
/// Immutable once constructed. Serializes to the upstream wire format
/// `{"message": .., "thread_id": .., "user_id": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    message: String,
    thread_id: String,
    user_id: i64,
}

impl ChatRequest {
    /// Create a new chat request
    ///
    /// # Returns
    /// * `Err(String)` - The message is empty or whitespace only
    pub fn new(
        message: impl Into<String>,
        thread_id: impl Into<String>,
        user_id: i64,
    ) -> Result<Self, String> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err("Message cannot be empty".to_string());
        }
        Ok(Self {
            message,
            thread_id: thread_id.into(),
            user_id,
        })
    }

    /// Message text
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Conversation thread identifier
    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Requesting user
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    /// Encode the request as the single outbound JSON frame
    pub fn to_payload(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }
}
