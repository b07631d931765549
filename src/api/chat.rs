//! Chat API
//!
//! Streams an agent reply to the caller.
//! Flow: user message -> backend -> upstream agent WebSocket -> SSE response

use crate::api::streaming::create_sse_response;
use crate::api::utils::validate_message;
use crate::bridge::{ChatRequest, StreamBridge};
use crate::error::AppError;
use axum::{extract::State, response::Response, Json};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// User id sent upstream until real authentication exists
pub const PLACEHOLDER_USER_ID: i64 = 1;

#[allow(missing_docs)]
#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    /// Optional thread ID for maintaining context
    /// A fresh one is generated when absent
    #[serde(default)]
    pub thread_id: Option<String>,
}

/// Build the bridge request from an inbound payload
///
/// Validates the message, fills in a fresh thread id when none (or a blank
/// one) was supplied and attaches the placeholder user id.
pub fn build_chat_request(payload: ChatPayload) -> Result<ChatRequest, AppError> {
    validate_message(&payload.message)?;

    let thread_id = payload
        .thread_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    ChatRequest::new(payload.message, thread_id, PLACEHOLDER_USER_ID)
        .map_err(AppError::InvalidRequest)
}

/// POST /api/ai/chat - Stream an agent reply as Server-Sent Events
pub async fn chat(
    State(bridge): State<StreamBridge>,
    Json(payload): Json<ChatPayload>,
) -> Result<Response, AppError> {
    let request = build_chat_request(payload)?;

    info!(
        thread_id = %request.thread_id(),
        message_len = request.message().len(),
        "Chat request received"
    );

    let stream = bridge.open(request);
    create_sse_response(stream).await
}
