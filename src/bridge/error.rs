//! Bridge-specific error types
//!
//! Errors that terminate a bridge session (connection setup, payload encoding,
//! upstream transport failures). They reach the consumer as the single
//! terminal item of a [`ChunkStream`](super::ChunkStream).

use thiserror::Error;

/// Errors that can terminate a bridge session
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The WebSocket connection to the upstream agent could not be established
    #[error("Failed to connect to upstream {url}: {reason}")]
    ConnectionFailed {
        /// Upstream URL that was dialed
        url: String,
        /// Underlying cause (transport error or timeout)
        reason: String,
    },

    /// The outbound request payload could not be encoded
    #[error("Failed to serialize upstream payload: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Transport error, abnormal close or timeout after the connection was up
    #[error("Upstream error: {0}")]
    UpstreamError(String),
}

impl BridgeError {
    /// Shorthand for an [`BridgeError::UpstreamError`]
    pub fn upstream(reason: impl Into<String>) -> Self {
        Self::UpstreamError(reason.into())
    }
}

/// The consumer dropped its end of the session
///
/// Not a failure: it is the normal early-termination path when the HTTP
/// client goes away.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Consumer cancelled the stream")]
pub struct ConsumerCancelled;
