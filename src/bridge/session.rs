//! Stream Session
//!
//! The push-to-pull channel between the task that owns the upstream
//! WebSocket and the consumer draining chunks. The producer half
//! ([`StreamSession`]) makes exactly one terminal transition; the consumer
//! half ([`ChunkStream`]) is a lazy, cancelable `Stream` of chunks.

use crate::bridge::error::{BridgeError, ConsumerCancelled};
use futures_util::Stream;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

const MISSING_TERMINAL: &str = "session ended without a terminal signal";

/// Events carried from the producer to the consumer
#[derive(Debug)]
enum SessionEvent {
    Chunk(String),
    Completed,
    Failed(BridgeError),
}

/// Lifecycle state of a session as observed by the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Chunks may still arrive
    Open,
    /// Upstream finished normally
    Completed,
    /// Upstream failed; the error was the last item yielded
    Failed,
}

/// How the producer side of a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Remote side finished normally
    Completed {
        /// Number of chunks relayed
        chunks: usize,
    },
    /// Session terminated with an error
    Failed {
        /// Number of chunks relayed before the failure
        chunks: usize,
    },
    /// The consumer went away first
    Cancelled {
        /// Number of chunks relayed before cancellation
        chunks: usize,
    },
}

/// Create the two halves of a new session
pub fn session_channel(session_id: impl Into<String>) -> (StreamSession, ChunkStream) {
    let session_id = session_id.into();
    let (tx, rx) = mpsc::unbounded_channel();
    let session = StreamSession {
        id: session_id.clone(),
        tx,
        chunks: 0,
        finished: false,
    };
    let stream = ChunkStream {
        inner: UnboundedReceiverStream::new(rx),
        state: SessionState::Open,
        session_id,
    };
    (session, stream)
}

/// Producer half of a session
///
/// Terminal transitions (`complete`, `fail`, `cancel`) consume the session,
/// so nothing can be pushed after them. Dropping a session that never made a
/// terminal transition fails it.
#[derive(Debug)]
pub struct StreamSession {
    id: String,
    tx: mpsc::UnboundedSender<SessionEvent>,
    chunks: usize,
    finished: bool,
}

impl StreamSession {
    /// Session identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of chunks pushed so far
    pub fn chunks_sent(&self) -> usize {
        self.chunks
    }

    /// Whether the consumer has dropped its half
    pub fn is_cancelled(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has dropped its half
    pub async fn cancelled(&self) {
        self.tx.closed().await
    }

    /// Buffer one chunk for the consumer
    ///
    /// Never blocks; chunks accumulate until the consumer pulls them.
    pub fn push(&mut self, chunk: String) -> Result<(), ConsumerCancelled> {
        self.tx
            .send(SessionEvent::Chunk(chunk))
            .map_err(|_| ConsumerCancelled)?;
        self.chunks += 1;
        Ok(())
    }

    /// Mark the session completed
    pub fn complete(mut self) -> SessionOutcome {
        self.finished = true;
        let _ = self.tx.send(SessionEvent::Completed);
        SessionOutcome::Completed {
            chunks: self.chunks,
        }
    }

    /// Mark the session failed with `error` as cause
    pub fn fail(mut self, error: BridgeError) -> SessionOutcome {
        self.finished = true;
        let _ = self.tx.send(SessionEvent::Failed(error));
        SessionOutcome::Failed {
            chunks: self.chunks,
        }
    }

    /// Record that the consumer went away
    pub fn cancel(mut self) -> SessionOutcome {
        self.finished = true;
        SessionOutcome::Cancelled {
            chunks: self.chunks,
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self
                .tx
                .send(SessionEvent::Failed(BridgeError::upstream(MISSING_TERMINAL)));
        }
    }
}

/// Consumer half of a session
///
/// Yields chunks in arrival order. A completed session ends the stream; a
/// failed one yields a single `Err` and then ends. Dropping the stream
/// cancels the session.
#[derive(Debug)]
pub struct ChunkStream {
    inner: UnboundedReceiverStream<SessionEvent>,
    state: SessionState,
    session_id: String,
}

impl ChunkStream {
    /// Current state as seen by the consumer
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Identifier of the session feeding this stream
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Stream for ChunkStream {
    type Item = Result<String, BridgeError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.state != SessionState::Open {
            return Poll::Ready(None);
        }

        let item = match ready!(Pin::new(&mut self.inner).poll_next(cx)) {
            Some(SessionEvent::Chunk(chunk)) => Some(Ok(chunk)),
            Some(SessionEvent::Completed) => {
                self.state = SessionState::Completed;
                None
            }
            Some(SessionEvent::Failed(error)) => {
                self.state = SessionState::Failed;
                Some(Err(error))
            }
            None => {
                self.state = SessionState::Failed;
                Some(Err(BridgeError::upstream(MISSING_TERMINAL)))
            }
        };
        Poll::Ready(item)
    }
}
