//! The connection capability handle.
//!
//! A [`Handle`] is what the opener hands back once a connection is open: a
//! thin object over the socket whose three operations each run one pending
//! wait against the connection's events.
//!
//! The operations are independent - `send` while a `receive` step is
//! suspended is fine, because each operation only attaches and detaches its
//! own listeners.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::task::{Context, Poll};

use async_stream::stream;
use futures_util::Stream;
use tracing::debug;

use crate::error::{Error, Result};
use crate::event::{CloseEvent, EventKind, MessageEvent, Payload};
use crate::socket::{ReadyState, Socket};

use super::race::EventRace;

// ============================================================================
// Handle
// ============================================================================

/// Capability handle to an open WebSocket connection.
///
/// Created once per successful open; owns nothing beyond a socket handle.
/// After the connection closes, operations surface errors from the state
/// preconditions or from the driver's rejection of further commands.
pub struct Handle {
    socket: Socket,
}

impl Handle {
    /// Wraps an opened socket.
    pub(crate) fn new(socket: Socket) -> Self {
        Self { socket }
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.socket.ready_state()
    }
}

// ============================================================================
// Handle - close
// ============================================================================

impl Handle {
    /// Closes the connection and waits for teardown to complete.
    ///
    /// Resolves with the close event once the closing handshake finishes.
    /// Closing an already-closing connection defers to the underlying
    /// socket; this layer adds no idempotence.
    ///
    /// # Errors
    ///
    /// - [`Error::Event`] if the connection fails while closing
    /// - [`Error::ConnectionClosed`] if the driver is already gone
    pub async fn close(&self) -> Result<CloseEvent> {
        self.close_inner(None).await
    }

    /// Closes the connection with a status code and reason.
    ///
    /// # Errors
    ///
    /// Same as [`close`](Self::close).
    pub async fn close_with(&self, code: u16, reason: &str) -> Result<CloseEvent> {
        self.close_inner(Some((code, reason))).await
    }

    async fn close_inner(&self, frame: Option<(u16, &str)>) -> Result<CloseEvent> {
        // listen before acting: the driver runs concurrently and the close
        // event must not fire into an empty table
        let race = EventRace::new(&self.socket, EventKind::Close);

        match frame {
            Some((code, reason)) => self.socket.close_with(code, reason)?,
            None => self.socket.close()?,
        }

        debug!("waiting for close");
        let event = race.resolve().await?;
        // only the registered close listener can win this race
        event.into_close().ok_or(Error::ConnectionClosed)
    }
}

// ============================================================================
// Handle - send
// ============================================================================

impl Handle {
    /// Sends a payload over the connection.
    ///
    /// Synchronous and non-suspending: the payload is handed to the driver
    /// unchanged, or one of the two precondition errors is raised. A
    /// connection still in the connecting state delegates to the underlying
    /// socket, which holds the payload until the handshake completes.
    ///
    /// # Errors
    ///
    /// - [`Error::Closing`] if the connection state is closing
    /// - [`Error::AlreadyClosed`] if the connection state is closed
    /// - [`Error::ConnectionClosed`] if the driver task is gone
    pub fn send(&self, payload: impl Into<Payload>) -> Result<()> {
        match self.socket.ready_state() {
            ReadyState::Closing => Err(Error::Closing),
            ReadyState::Closed => Err(Error::AlreadyClosed),
            ReadyState::Connecting | ReadyState::Open => self.socket.send(payload.into()),
        }
    }
}

// ============================================================================
// Handle - receive
// ============================================================================

impl Handle {
    /// Returns the stream of inbound messages.
    ///
    /// The stream is lazy and unbounded: each value is waited for only when
    /// polled, with a single listener pair in flight per stream, and the
    /// stream never ends on its own. An error event while waiting yields
    /// `Err` once and ends the stream; dropping the stream cancels the
    /// in-flight wait.
    ///
    /// Messages are yielded in the order the connection delivers them.
    #[must_use]
    pub fn receive(&self) -> MessageStream {
        let socket = self.socket.clone();

        MessageStream {
            inner: Box::pin(stream! {
                loop {
                    let race = EventRace::new(&socket, EventKind::Message);
                    match race.resolve().await {
                        Ok(event) => {
                            // only the registered message listener can win
                            if let Some(event) = event.into_message() {
                                yield Ok(event);
                            }
                        }
                        Err(err) => {
                            yield Err(err);
                            break;
                        }
                    }
                }
            }),
        }
    }
}

// ============================================================================
// MessageStream
// ============================================================================

/// Lazy, unbounded stream of inbound messages.
///
/// Produced by [`Handle::receive`]. Terminates only by yielding an error;
/// a consumer that stops polling simply leaves the next wait unregistered.
pub struct MessageStream {
    inner: Pin<Box<dyn Stream<Item = Result<MessageEvent>> + Send>>,
}

impl Stream for MessageStream {
    type Item = Result<MessageEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for MessageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageStream").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
