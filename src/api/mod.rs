//! API module
//!
//! Contains HTTP request handlers and the application router

pub mod chat;
pub mod health;
pub mod streaming;
pub mod utils;

use crate::bridge::StreamBridge;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the application router
///
/// Request-id middleware is layered on by the binary.
pub fn router(bridge: StreamBridge) -> Router {
    Router::new()
        // Health check and hello world
        .route("/", get(health::hello_world))
        .route("/api/health", get(health::health_check))
        // Agent chat relay
        .route("/api/ai/chat", post(chat::chat))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive()) // Frontend runs on another origin
        .with_state(bridge)
}
