//! Connection event types.
//!
//! The underlying socket announces its lifecycle through four named events.
//! Each event carries a payload; [`SocketEvent`] is the union delivered to
//! listeners, [`EventKind`] is the name a listener registers for.
//!
//! # Event Types
//!
//! | Kind | Payload | Fired when |
//! |------|---------|------------|
//! | `Open` | [`OpenEvent`] | the client handshake completes |
//! | `Message` | [`MessageEvent`] | a text or binary frame arrives |
//! | `Close` | [`CloseEvent`] | the close handshake completes or the peer goes away |
//! | `Error` | [`ErrorEvent`] | the handshake or an I/O operation fails |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::DeserializeOwned;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Normal closure (RFC 6455 §7.4.1).
pub const CLOSE_CODE_NORMAL: u16 = 1000;

/// The peer's close frame carried no status code (RFC 6455 §7.4.1).
pub const CLOSE_CODE_NO_STATUS: u16 = 1005;

/// The connection ended without a close frame (RFC 6455 §7.4.1).
pub const CLOSE_CODE_ABNORMAL: u16 = 1006;

// ============================================================================
// EventKind
// ============================================================================

/// The four named events the underlying socket emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The connection reached the open state.
    Open,
    /// An inbound message arrived.
    Message,
    /// The connection finished closing.
    Close,
    /// The connection failed.
    Error,
}

impl EventKind {
    /// Returns the event name as used by the socket runtime.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Message => "message",
            Self::Close => "close",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Payload
// ============================================================================

/// The data carried by an outbound or inbound message.
///
/// The socket transports text and binary frames; everything else (ping,
/// pong, close) is lifecycle traffic and never surfaces as a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A UTF-8 text frame.
    Text(String),
    /// A binary frame.
    Binary(Vec<u8>),
}

impl Payload {
    /// Returns the text content, or `None` for binary payloads.
    #[inline]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Binary(_) => None,
        }
    }

    /// Returns the raw bytes of the payload.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Returns the payload length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the payload is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

// ============================================================================
// OpenEvent
// ============================================================================

/// Fired once when the connection reaches the open state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpenEvent {
    /// Subprotocol negotiated during the handshake, empty when none.
    pub protocol: String,
}

impl OpenEvent {
    /// Creates an open event with the negotiated subprotocol.
    #[inline]
    #[must_use]
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
        }
    }
}

// ============================================================================
// MessageEvent
// ============================================================================

/// Fired for each inbound text or binary frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// The message payload.
    pub payload: Payload,
}

impl MessageEvent {
    /// Creates a message event from any payload-convertible value.
    #[inline]
    #[must_use]
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Returns the text content, or `None` for binary messages.
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.payload.as_text()
    }

    /// Deserializes the payload as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload is not
    /// valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(self.payload.as_bytes())?)
    }
}

// ============================================================================
// CloseEvent
// ============================================================================

/// Fired once when the connection finishes closing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    /// Close status code; [`CLOSE_CODE_NO_STATUS`] when the peer sent none,
    /// [`CLOSE_CODE_ABNORMAL`] when no close frame was received at all.
    pub code: u16,
    /// Close reason, empty when the peer sent none.
    pub reason: String,
    /// `true` when a close frame completed the closing handshake.
    pub was_clean: bool,
}

impl CloseEvent {
    /// Creates a close event.
    #[inline]
    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>, was_clean: bool) -> Self {
        Self {
            code,
            reason: reason.into(),
            was_clean,
        }
    }

    /// Returns `true` for a normal closure (code 1000).
    #[inline]
    #[must_use]
    pub fn is_normal(&self) -> bool {
        self.code == CLOSE_CODE_NORMAL
    }
}

// ============================================================================
// ErrorEvent
// ============================================================================

/// Fired when the handshake or an I/O operation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    /// Human-readable description of the failure.
    pub message: String,
}

impl ErrorEvent {
    /// Creates an error event.
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ============================================================================
// SocketEvent
// ============================================================================

/// The union of the four event payloads, as delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The connection reached the open state.
    Open(OpenEvent),
    /// An inbound message arrived.
    Message(MessageEvent),
    /// The connection finished closing.
    Close(CloseEvent),
    /// The connection failed.
    Error(ErrorEvent),
}

impl SocketEvent {
    /// Returns the kind a listener registers for to observe this event.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Open(_) => EventKind::Open,
            Self::Message(_) => EventKind::Message,
            Self::Close(_) => EventKind::Close,
            Self::Error(_) => EventKind::Error,
        }
    }

    /// Extracts the open payload.
    #[inline]
    #[must_use]
    pub fn into_open(self) -> Option<OpenEvent> {
        match self {
            Self::Open(event) => Some(event),
            _ => None,
        }
    }

    /// Extracts the message payload.
    #[inline]
    #[must_use]
    pub fn into_message(self) -> Option<MessageEvent> {
        match self {
            Self::Message(event) => Some(event),
            _ => None,
        }
    }

    /// Extracts the close payload.
    #[inline]
    #[must_use]
    pub fn into_close(self) -> Option<CloseEvent> {
        match self {
            Self::Close(event) => Some(event),
            _ => None,
        }
    }

    /// Extracts the error payload.
    #[inline]
    #[must_use]
    pub fn into_error(self) -> Option<ErrorEvent> {
        match self {
            Self::Error(event) => Some(event),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
