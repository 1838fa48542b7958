//! WebSocket socket handle and driver event loop.
//!
//! [`Socket`] is the event-driven face of one WebSocket connection: a
//! current [`ReadyState`], four named events, and primitive send/close
//! operations. The driver is a tokio task that owns the tungstenite stream,
//! performs the client handshake, executes primitives received over a
//! command channel, and emits events as frames arrive.
//!
//! # Connection Lifecycle
//!
//! 1. [`PendingSocket::new`] - validate the URL, build the handshake
//!    request, allocate the shared state (state = connecting)
//! 2. Register listeners on [`PendingSocket::socket`] - nothing can fire yet
//! 3. [`PendingSocket::launch`] - spawn the driver task
//! 4. Driver handshake - state moves to open and the open event fires, or
//!    the error event fires and the task ends
//! 5. Frames and commands interleave - message events, send/close commands
//! 6. Close frame (either direction) or transport failure - state moves to
//!    closed, the close or error event fires, the task ends

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::event::{
    CLOSE_CODE_ABNORMAL, CLOSE_CODE_NO_STATUS, CloseEvent, ErrorEvent, EventKind, MessageEvent,
    OpenEvent, Payload, SocketEvent,
};

use super::emitter::{EventEmitter, Subscription};
use super::state::ReadyState;

// ============================================================================
// Command
// ============================================================================

/// Primitive operations executed by the driver task.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Command {
    /// Write a message frame.
    Send(Payload),
    /// Start the closing handshake, optionally with a code and reason.
    Close(Option<(u16, String)>),
}

impl From<Payload> for Message {
    fn from(payload: Payload) -> Self {
        match payload {
            Payload::Text(text) => Message::Text(text.into()),
            Payload::Binary(bytes) => Message::Binary(bytes.into()),
        }
    }
}

// ============================================================================
// Socket
// ============================================================================

/// Handle to one event-driven WebSocket connection.
///
/// Cheaply cloneable; clones share the connection state, the listener
/// table, and the command channel. The handle owns no I/O itself - the
/// driver task does - so every operation here is non-suspending.
#[derive(Clone)]
pub struct Socket {
    /// Connection state, shared with the driver task.
    state: Arc<AtomicU8>,
    /// One-shot event listeners.
    emitter: EventEmitter,
    /// Commands to the driver task.
    command_tx: mpsc::UnboundedSender<Command>,
}

impl Socket {
    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        // only canonical codes are ever stored
        ReadyState::from_u8(self.state.load(Ordering::SeqCst)).unwrap_or(ReadyState::Closed)
    }

    /// Registers a one-shot listener for the next occurrence of `kind`.
    #[must_use = "dropping the subscription cancels the registration"]
    pub fn once(
        &self,
        kind: EventKind,
        callback: impl FnOnce(SocketEvent) + Send + 'static,
    ) -> Subscription {
        self.emitter.once(kind, callback)
    }

    /// Queues a payload for the driver to write.
    ///
    /// No state precondition is checked here; gating by connection state is
    /// the caller's concern. A payload queued before the handshake finishes
    /// is written once the connection opens.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the driver task is gone.
    pub fn send(&self, payload: Payload) -> Result<()> {
        self.command_tx
            .send(Command::Send(payload))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Requests the closing handshake without a status code.
    ///
    /// Moves the state to closing immediately; the close event fires once
    /// the handshake completes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the driver task is gone.
    pub fn close(&self) -> Result<()> {
        self.request_close(None)
    }

    /// Requests the closing handshake with a status code and reason.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the driver task is gone.
    pub fn close_with(&self, code: u16, reason: &str) -> Result<()> {
        self.request_close(Some((code, reason.to_string())))
    }

    fn request_close(&self, frame: Option<(u16, String)>) -> Result<()> {
        // connecting/open -> closing; closing/closed stay where they are
        let _ = self
            .state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current < ReadyState::Closing.as_u8()).then(|| ReadyState::Closing.as_u8())
            });

        self.command_tx
            .send(Command::Close(frame))
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Socket - Test Support
// ============================================================================

#[cfg(test)]
impl Socket {
    /// Creates a socket with no driver task; the command receiver is handed
    /// back so tests can observe delegated primitives.
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<Command>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let socket = Self {
            state: Arc::new(AtomicU8::new(ReadyState::Connecting.as_u8())),
            emitter: EventEmitter::new(),
            command_tx,
        };
        (socket, command_rx)
    }

    pub(crate) fn emit(&self, event: SocketEvent) {
        self.emitter.emit(event);
    }

    pub(crate) fn set_state(&self, state: ReadyState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    pub(crate) fn listener_count(&self, kind: EventKind) -> usize {
        self.emitter.listener_count(kind)
    }

    pub(crate) fn clear_listeners(&self) {
        self.emitter.clear();
    }
}

// ============================================================================
// PendingSocket
// ============================================================================

/// A socket that is prepared but whose driver has not been launched.
///
/// Splitting preparation from launch lets the caller register listeners
/// before any event can possibly fire; the driver runs concurrently once
/// [`launch`](Self::launch) is called.
///
/// # Example
///
/// ```ignore
/// let pending = PendingSocket::new("ws://127.0.0.1:9001", &[])?;
/// let socket = pending.socket();
/// let open = socket.once(EventKind::Open, |event| { /* ... */ });
/// pending.launch();
/// ```
pub struct PendingSocket {
    socket: Socket,
    command_rx: mpsc::UnboundedReceiver<Command>,
    request: Request,
}

impl PendingSocket {
    /// Validates the address and prepares the connection.
    ///
    /// `protocols` become a single `Sec-WebSocket-Protocol` header value.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the address is not a parsable URL
    /// - [`Error::UnsupportedScheme`] if the scheme is not `ws`/`wss`
    /// - [`Error::InvalidProtocol`] if the subprotocol list is not a valid
    ///   header value
    /// - [`Error::WebSocket`] if the handshake request cannot be built
    pub fn new(url: &str, protocols: &[&str]) -> Result<Self> {
        let parsed = Url::parse(url)?;
        match parsed.scheme() {
            "ws" | "wss" => {}
            scheme => return Err(Error::unsupported_scheme(scheme)),
        }

        let mut request = parsed.as_str().into_client_request()?;
        if !protocols.is_empty() {
            let value = HeaderValue::from_str(&protocols.join(", "))
                .map_err(|e| Error::invalid_protocol(e.to_string()))?;
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let socket = Socket {
            state: Arc::new(AtomicU8::new(ReadyState::Connecting.as_u8())),
            emitter: EventEmitter::new(),
            command_tx,
        };

        Ok(Self {
            socket,
            command_rx,
            request,
        })
    }

    /// Returns a handle to the prepared socket.
    #[must_use]
    pub fn socket(&self) -> Socket {
        self.socket.clone()
    }

    /// Spawns the driver task and returns the socket handle.
    pub fn launch(self) -> Socket {
        let socket = self.socket.clone();
        tokio::spawn(run_driver(
            self.request,
            Arc::clone(&self.socket.state),
            self.socket.emitter.clone(),
            self.command_rx,
        ));
        socket
    }

    #[cfg(test)]
    pub(crate) fn request(&self) -> &Request {
        &self.request
    }
}

// ============================================================================
// Driver Event Loop
// ============================================================================

/// Driver task: handshake, then frames and commands until the connection
/// ends.
async fn run_driver(
    request: Request,
    state: Arc<AtomicU8>,
    emitter: EventEmitter,
    mut command_rx: mpsc::UnboundedReceiver<Command>,
) {
    let uri = request.uri().clone();
    debug!(url = %uri, "connecting");

    let (ws_stream, response) = match tokio_tungstenite::connect_async(request).await {
        Ok(established) => established,
        Err(e) => {
            debug!(url = %uri, error = %e, "handshake failed");
            state.store(ReadyState::Closed.as_u8(), Ordering::SeqCst);
            emitter.emit(SocketEvent::Error(ErrorEvent::new(e.to_string())));
            emitter.clear();
            return;
        }
    };

    let protocol = response
        .headers()
        .get(SEC_WEBSOCKET_PROTOCOL)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    debug!(url = %uri, protocol = %protocol, "connection open");
    state.store(ReadyState::Open.as_u8(), Ordering::SeqCst);
    emitter.emit(SocketEvent::Open(OpenEvent::new(protocol)));

    let (mut ws_write, mut ws_read) = ws_stream.split();

    loop {
        tokio::select! {
            frame = ws_read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        trace!(len = text.len(), "text frame");
                        emitter.emit(SocketEvent::Message(MessageEvent::new(
                            Payload::Text(text.as_str().to_string()),
                        )));
                    }

                    Some(Ok(Message::Binary(bytes))) => {
                        trace!(len = bytes.len(), "binary frame");
                        emitter.emit(SocketEvent::Message(MessageEvent::new(
                            Payload::Binary(bytes.to_vec()),
                        )));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        let event = match frame {
                            Some(frame) => CloseEvent::new(
                                u16::from(frame.code),
                                frame.reason.as_str(),
                                true,
                            ),
                            None => CloseEvent::new(CLOSE_CODE_NO_STATUS, "", true),
                        };
                        debug!(code = event.code, "close frame received");
                        state.store(ReadyState::Closed.as_u8(), Ordering::SeqCst);
                        emitter.emit(SocketEvent::Close(event));
                        break;
                    }

                    // Ping/Pong handled inside tungstenite
                    Some(Ok(_)) => {}

                    Some(Err(e)) => {
                        warn!(error = %e, "transport error");
                        state.store(ReadyState::Closed.as_u8(), Ordering::SeqCst);
                        emitter.emit(SocketEvent::Error(ErrorEvent::new(e.to_string())));
                        break;
                    }

                    None => {
                        debug!("stream ended without a close frame");
                        state.store(ReadyState::Closed.as_u8(), Ordering::SeqCst);
                        emitter.emit(SocketEvent::Close(CloseEvent::new(
                            CLOSE_CODE_ABNORMAL,
                            "",
                            false,
                        )));
                        break;
                    }
                }
            }

            command = command_rx.recv() => {
                match command {
                    Some(Command::Send(payload)) => {
                        if let Err(e) = ws_write.send(payload.into()).await {
                            warn!(error = %e, "send failed");
                            emitter.emit(SocketEvent::Error(ErrorEvent::new(e.to_string())));
                        }
                    }

                    Some(Command::Close(frame)) => {
                        let frame = frame.map(|(code, reason)| CloseFrame {
                            code: code.into(),
                            reason: reason.into(),
                        });
                        debug!("close requested");
                        if let Err(e) = ws_write.send(Message::Close(frame)).await {
                            warn!(error = %e, "close failed");
                            emitter.emit(SocketEvent::Error(ErrorEvent::new(e.to_string())));
                        }
                        // keep reading: the peer's close frame ends the loop
                    }

                    None => {
                        debug!("all socket handles dropped");
                        break;
                    }
                }
            }
        }
    }

    let _ = ws_write.close().await;
    state.store(ReadyState::Closed.as_u8(), Ordering::SeqCst);
    // discard remaining registrations so suspended waits resolve instead of hanging
    emitter.clear();
    debug!("driver terminated");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_into_message() {
        let message: Message = Payload::from("hi").into();
        assert!(matches!(message, Message::Text(text) if text.as_str() == "hi"));

        let message: Message = Payload::from(vec![1u8, 2]).into();
        assert!(matches!(message, Message::Binary(bytes) if bytes.to_vec() == vec![1, 2]));
    }

    #[tokio::test]
    async fn test_detached_socket_starts_connecting() {
        let (socket, _command_rx) = Socket::detached();
        assert_eq!(socket.ready_state(), ReadyState::Connecting);
    }

    #[tokio::test]
    async fn test_send_delegates_payload_unchanged() {
        let (socket, mut command_rx) = Socket::detached();
        socket.send(Payload::from("exact bytes")).expect("queued");

        assert_eq!(
            command_rx.try_recv().expect("command"),
            Command::Send(Payload::Text("exact bytes".to_string()))
        );
    }

    #[tokio::test]
    async fn test_send_fails_when_driver_gone() {
        let (socket, command_rx) = Socket::detached();
        drop(command_rx);

        let err = socket.send(Payload::from("lost")).unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_close_moves_state_to_closing() {
        let (socket, mut command_rx) = Socket::detached();
        socket.set_state(ReadyState::Open);

        socket.close().expect("queued");

        assert_eq!(socket.ready_state(), ReadyState::Closing);
        assert_eq!(command_rx.try_recv().expect("command"), Command::Close(None));
    }

    #[tokio::test]
    async fn test_close_with_carries_code_and_reason() {
        let (socket, mut command_rx) = Socket::detached();
        socket.set_state(ReadyState::Open);

        socket.close_with(1000, "done").expect("queued");

        assert_eq!(
            command_rx.try_recv().expect("command"),
            Command::Close(Some((1000, "done".to_string())))
        );
    }

    #[tokio::test]
    async fn test_close_does_not_resurrect_closed_state() {
        let (socket, _command_rx) = Socket::detached();
        socket.set_state(ReadyState::Closed);

        socket.close().expect("queued");

        assert_eq!(socket.ready_state(), ReadyState::Closed);
    }

    #[test]
    fn test_pending_socket_rejects_bad_scheme() {
        let err = PendingSocket::new("http://example.com/socket", &[]).unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme { .. }));
    }

    #[test]
    fn test_pending_socket_rejects_garbage_url() {
        let err = PendingSocket::new("not a url", &[]).unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[test]
    fn test_pending_socket_sets_protocol_header() {
        let pending =
            PendingSocket::new("ws://example.com/socket", &["chat", "superchat"]).expect("pending");

        let header = pending
            .request()
            .headers()
            .get(SEC_WEBSOCKET_PROTOCOL)
            .expect("header");
        assert_eq!(header.to_str().expect("ascii"), "chat, superchat");
    }

    #[test]
    fn test_pending_socket_omits_protocol_header_when_empty() {
        let pending = PendingSocket::new("ws://example.com/socket", &[]).expect("pending");
        assert!(
            pending
                .request()
                .headers()
                .get(SEC_WEBSOCKET_PROTOCOL)
                .is_none()
        );
    }

    #[test]
    fn test_pending_socket_rejects_bad_protocol_value() {
        let err = PendingSocket::new("ws://example.com/socket", &["bad\nvalue"]).unwrap_err();
        assert!(matches!(err, Error::InvalidProtocol { .. }));
    }
}
