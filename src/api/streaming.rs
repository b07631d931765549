//! Streaming utilities for Server-Sent Events (SSE)
//!
//! Turns a bridge [`ChunkStream`] into an SSE HTTP response.

use crate::bridge::ChunkStream;
use crate::error::AppError;
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::Response,
};
use futures_util::{stream::Stream, StreamExt};
use std::io;
use tracing::warn;

/// Format one chunk as an SSE event
///
/// Every line of the chunk becomes a `data:` field; the event ends with a
/// blank line.
pub fn format_sse_event(chunk: &str) -> String {
    let mut event = String::with_capacity(chunk.len() + 8);
    for line in chunk.split('\n') {
        event.push_str("data: ");
        event.push_str(line.strip_suffix('\r').unwrap_or(line));
        event.push('\n');
    }
    event.push('\n');
    event
}

/// Create an SSE response from a bridge session
///
/// Waits for the first item so that a session failing before any output
/// is reported with an error status. Once the first chunk has been sent,
/// a later failure aborts the response body.
///
/// # Arguments
/// * `stream` - Consumer half of a bridge session
///
/// # Returns
/// * `Result<Response, AppError>` - SSE HTTP response or error
pub async fn create_sse_response(mut stream: ChunkStream) -> Result<Response, AppError> {
    let first = match stream.next().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(e)) => return Err(e.into()),
        None => None,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(relay_stream(first, stream)))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build SSE response: {}", e)))
}

fn relay_stream(
    first: Option<String>,
    mut rest: ChunkStream,
) -> impl Stream<Item = Result<String, io::Error>> {
    use async_stream::stream;

    stream! {
        if let Some(chunk) = first {
            yield Ok(format_sse_event(&chunk));
        }

        while let Some(item) = rest.next().await {
            match item {
                Ok(chunk) => yield Ok(format_sse_event(&chunk)),
                Err(e) => {
                    warn!(
                        session_id = %rest.session_id(),
                        error = %e,
                        "Bridge failed mid-stream, aborting response"
                    );
                    yield Err(io::Error::other(e));
                    break;
                }
            }
        }
    }
}
