//! Stream Bridge
//!
//! Relays one chat request through a short-lived WebSocket connection to the
//! upstream agent service. Each call to [`StreamBridge::open`] spawns a task
//! that owns the connection for its whole life: connect, send the request
//! frame, then forward every inbound frame into the session until a terminal
//! transition.

use crate::bridge::error::BridgeError;
use crate::bridge::models::ChatRequest;
use crate::bridge::session::{session_channel, ChunkStream, SessionOutcome, StreamSession};
use crate::config::UpstreamConfig;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens bridge sessions against the configured upstream agent
///
/// Cheap to clone; holds only the read-only upstream configuration.
#[derive(Debug, Clone)]
pub struct StreamBridge {
    config: Arc<UpstreamConfig>,
}

impl StreamBridge {
    /// Create a bridge for the given upstream
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Upstream configuration in use
    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Open a new session for `request`
    ///
    /// Returns immediately; connecting and relaying happen on a spawned task.
    /// Dropping the returned stream closes the upstream connection.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self, request: ChatRequest) -> ChunkStream {
        let session_id = Uuid::new_v4().to_string();
        let (session, stream) = session_channel(session_id.clone());

        let span = info_span!(
            "bridge_session",
            session_id = %session_id,
            thread_id = %request.thread_id(),
        );
        tokio::spawn(run_session(Arc::clone(&self.config), request, session).instrument(span));

        stream
    }
}

async fn run_session(
    config: Arc<UpstreamConfig>,
    request: ChatRequest,
    session: StreamSession,
) -> SessionOutcome {
    let start = Instant::now();
    let outcome = relay(&config, &request, session).await;
    let duration_ms = start.elapsed().as_millis();

    match outcome {
        SessionOutcome::Completed { chunks } => {
            info!(chunks, duration_ms, "Bridge session completed")
        }
        SessionOutcome::Failed { chunks } => {
            warn!(chunks, duration_ms, "Bridge session failed")
        }
        SessionOutcome::Cancelled { chunks } => {
            info!(chunks, duration_ms, "Bridge session cancelled by consumer")
        }
    }
    outcome
}

async fn relay(
    config: &UpstreamConfig,
    request: &ChatRequest,
    mut session: StreamSession,
) -> SessionOutcome {
    let mut ws = tokio::select! {
        biased;
        _ = session.cancelled() => return session.cancel(),
        result = connect(config) => match result {
            Ok(ws) => ws,
            Err(e) => return fail(session, e),
        },
    };

    let payload = match request.to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            close(&mut ws, None, config.close_timeout()).await;
            return fail(session, e);
        }
    };

    debug!(payload_len = payload.len(), "Sending request to upstream");
    if let Err(e) = ws.send(Message::Text(payload)).await {
        return fail(
            session,
            BridgeError::upstream(format!("Failed to send request: {}", e)),
        );
    }

    loop {
        let frame = tokio::select! {
            biased;
            _ = session.cancelled() => {
                close(&mut ws, None, config.close_timeout()).await;
                return session.cancel();
            }
            frame = next_frame(&mut ws, config.idle_timeout()) => frame,
        };

        let message = match frame {
            Frame::Message(message) => message,
            Frame::End => return session.complete(),
            Frame::Error(e) => {
                return fail(session, BridgeError::upstream(e.to_string()));
            }
            Frame::IdleTimeout(idle) => {
                close(&mut ws, None, config.close_timeout()).await;
                return fail(
                    session,
                    BridgeError::upstream(format!(
                        "No frame received within {} seconds",
                        idle.as_secs()
                    )),
                );
            }
        };

        let text = match message {
            Message::Text(text) => text,
            Message::Binary(bytes) => match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(_) => {
                    close(&mut ws, Some(CloseCode::Invalid), config.close_timeout()).await;
                    return fail(
                        session,
                        BridgeError::upstream("Binary frame is not valid UTF-8"),
                    );
                }
            },
            Message::Close(frame) => {
                close(&mut ws, None, config.close_timeout()).await;
                return if is_normal_close(frame.as_ref()) {
                    session.complete()
                } else {
                    fail(
                        session,
                        BridgeError::upstream(describe_close(frame.as_ref())),
                    )
                };
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
        };

        let terminal = config.close_on_complete_frame && is_complete_frame(&text);
        if session.push(text).is_err() {
            close(&mut ws, None, config.close_timeout()).await;
            return session.cancel();
        }
        if terminal {
            debug!("Upstream signalled completion, closing connection");
            close(&mut ws, None, config.close_timeout()).await;
            return session.complete();
        }
    }
}

async fn connect(config: &UpstreamConfig) -> Result<WsStream, BridgeError> {
    let connect_timeout = config.connect_timeout();
    debug!(url = %config.url, "Connecting to upstream");

    match timeout(connect_timeout, connect_async(config.url.as_str())).await {
        Ok(Ok((ws, response))) => {
            debug!(status = %response.status(), "Connected to upstream");
            Ok(ws)
        }
        Ok(Err(e)) => Err(BridgeError::ConnectionFailed {
            url: config.url.clone(),
            reason: e.to_string(),
        }),
        Err(_) => Err(BridgeError::ConnectionFailed {
            url: config.url.clone(),
            reason: format!("timed out after {} seconds", connect_timeout.as_secs()),
        }),
    }
}

fn fail(session: StreamSession, error: BridgeError) -> SessionOutcome {
    warn!(
        chunks = session.chunks_sent(),
        error = %error,
        "Bridge session error"
    );
    session.fail(error)
}

enum Frame {
    Message(Message),
    End,
    Error(WsError),
    IdleTimeout(Duration),
}

async fn next_frame(ws: &mut WsStream, idle_timeout: Option<Duration>) -> Frame {
    let next = match idle_timeout {
        Some(idle) => match timeout(idle, ws.next()).await {
            Ok(next) => next,
            Err(_) => return Frame::IdleTimeout(idle),
        },
        None => ws.next().await,
    };

    match next {
        Some(Ok(message)) => Frame::Message(message),
        Some(Err(WsError::ConnectionClosed)) | None => Frame::End,
        Some(Err(e)) => Frame::Error(e),
    }
}

// Best effort; the socket is dropped right after either way
async fn close(ws: &mut WsStream, code: Option<CloseCode>, close_timeout: Duration) {
    let frame = code.map(|code| CloseFrame {
        code,
        reason: "".into(),
    });
    match timeout(close_timeout, ws.close(frame)).await {
        Ok(Ok(())) | Ok(Err(WsError::ConnectionClosed)) => {}
        Ok(Err(e)) => debug!(error = %e, "Error while closing upstream connection"),
        Err(_) => debug!("Timed out closing upstream connection"),
    }
}

fn is_normal_close(frame: Option<&CloseFrame<'_>>) -> bool {
    match frame {
        None => true,
        Some(frame) => matches!(frame.code, CloseCode::Normal | CloseCode::Away),
    }
}

fn describe_close(frame: Option<&CloseFrame<'_>>) -> String {
    match frame {
        Some(frame) if !frame.reason.is_empty() => format!(
            "Upstream closed with code {}: {}",
            u16::from(frame.code),
            frame.reason
        ),
        Some(frame) => format!("Upstream closed with code {}", u16::from(frame.code)),
        None => "Upstream closed".to_string(),
    }
}

/// Whether `text` is the agent's end-of-reply frame (`{"type": "complete", ...}`)
pub fn is_complete_frame(text: &str) -> bool {
    if !text.trim_start().starts_with('{') {
        return false;
    }
    serde_json::from_str::<serde_json::Value>(text)
        .ok()
        .and_then(|value| {
            value
                .get("type")
                .and_then(|t| t.as_str())
                .map(|t| t == "complete")
        })
        .unwrap_or(false)
}
