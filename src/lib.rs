//! AI Stream Bridge Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
/// Upstream agent WebSocket bridge
///
/// Per-request connection lifecycle and the push-to-pull chunk channel.
pub mod bridge;
pub mod config;
pub mod error;
