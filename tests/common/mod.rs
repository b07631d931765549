//! Shared test helpers: a scripted upstream agent and stream collectors

#![allow(dead_code)]

use ai_stream_bridge::bridge::{BridgeError, ChunkStream};
use ai_stream_bridge::config::UpstreamConfig;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

/// What the mock upstream does after sending its scripted frames
#[derive(Debug, Clone, Copy)]
pub enum Ending {
    /// Close handshake with no close code
    Close,
    /// Close handshake with the given code and reason
    CloseWithCode(u16, &'static str),
    /// Drop the TCP connection without a close handshake
    Reset,
    /// Keep the connection open until the client closes it
    Hold,
}

/// A scripted upstream agent listening on an ephemeral port
///
/// Every accepted connection reads the request frame, sends `frames` and then
/// follows `ending`.
pub struct MockUpstream {
    pub url: String,
    requests: mpsc::UnboundedReceiver<String>,
    closed: mpsc::UnboundedReceiver<()>,
}

impl MockUpstream {
    pub async fn spawn(frames: &[&str], ending: Ending) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/ws/ai-stream", listener.local_addr().unwrap());
        let frames: Vec<String> = frames.iter().map(|f| f.to_string()).collect();
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let (closed_tx, closed) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(
                    stream,
                    frames.clone(),
                    ending,
                    requests_tx.clone(),
                    closed_tx.clone(),
                ));
            }
        });

        Self {
            url,
            requests,
            closed,
        }
    }

    /// Next request frame received, parsed as JSON
    pub async fn next_request(&mut self) -> serde_json::Value {
        let raw = tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("no request frame received")
            .expect("mock upstream stopped");
        serde_json::from_str(&raw).expect("request frame is not JSON")
    }

    /// Whether a connection was closed by the client within `within`
    pub async fn closed_within(&mut self, within: Duration) -> bool {
        matches!(
            tokio::time::timeout(within, self.closed.recv()).await,
            Ok(Some(()))
        )
    }
}

async fn serve_connection(
    stream: TcpStream,
    frames: Vec<String>,
    ending: Ending,
    requests: mpsc::UnboundedSender<String>,
    closed: mpsc::UnboundedSender<()>,
) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(_) => return,
    };

    match ws.next().await {
        Some(Ok(Message::Text(text))) => {
            let _ = requests.send(text);
        }
        _ => return,
    }

    for frame in frames {
        if ws.send(Message::Text(frame)).await.is_err() {
            return;
        }
    }

    match ending {
        Ending::Close => {
            let _ = ws.close(None).await;
        }
        Ending::CloseWithCode(code, reason) => {
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::from(code),
                    reason: reason.into(),
                }))
                .await;
        }
        Ending::Reset => {
            drop(ws);
            return;
        }
        Ending::Hold => {}
    }

    while let Some(message) = ws.next().await {
        if matches!(message, Ok(Message::Close(_)) | Err(_)) {
            break;
        }
    }
    let _ = closed.send(());
}

/// Upstream settings with short timeouts for tests
pub fn upstream_config(url: &str) -> UpstreamConfig {
    UpstreamConfig {
        url: url.to_string(),
        connect_timeout_secs: 2,
        idle_timeout_secs: 5,
        close_timeout_secs: 1,
        close_on_complete_frame: true,
    }
}

/// A ws:// URL nothing is listening on
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/ws/ai-stream", addr)
}

/// Drain a stream into its chunks and terminal error, if any
pub async fn collect_stream(stream: ChunkStream) -> (Vec<String>, Option<BridgeError>) {
    tokio::time::timeout(Duration::from_secs(10), async move {
        let mut stream = stream;
        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => chunks.push(chunk),
                Err(e) => {
                    assert!(stream.next().await.is_none(), "item after terminal error");
                    return (chunks, Some(e));
                }
            }
        }
        (chunks, None)
    })
    .await
    .expect("stream did not terminate")
}
