//! Upstream agent bridge
//!
//! This module relays a chat request to the upstream agent service over a
//! per-request WebSocket connection and exposes the replies as a stream of
//! text chunks.

pub mod client;
pub mod error;
pub mod models;
pub mod session;

pub use client::StreamBridge;
pub use error::{BridgeError, ConsumerCancelled};
pub use models::ChatRequest;
pub use session::{session_channel, ChunkStream, SessionOutcome, SessionState, StreamSession};
