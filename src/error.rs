//! Error types for the WebSocket bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use ws_bridge::{Result, open};
//!
//! async fn example() -> Result<()> {
//!     let handle = open("ws://127.0.0.1:9001").await?;
//!     handle.send("ping")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Setup | [`Error::Url`], [`Error::UnsupportedScheme`], [`Error::InvalidProtocol`] |
//! | Connection events | [`Error::Event`] |
//! | Send preconditions | [`Error::Closing`], [`Error::AlreadyClosed`] |
//! | Teardown | [`Error::ConnectionClosed`] |
//! | External | [`Error::WebSocket`], [`Error::Json`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::event::ErrorEvent;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Failures from the underlying connection are never retried or swallowed;
/// they surface as-is at the call site that was awaiting them.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Setup Errors
    // ========================================================================
    /// The address is not a parsable URL.
    #[error("Invalid WebSocket URL: {0}")]
    Url(#[from] url::ParseError),

    /// The address does not use the `ws` or `wss` scheme.
    #[error("Unsupported URL scheme: {scheme} (expected ws or wss)")]
    UnsupportedScheme {
        /// The offending scheme.
        scheme: String,
    },

    /// The subprotocol list cannot be sent as a header value.
    #[error("Invalid subprotocol: {message}")]
    InvalidProtocol {
        /// Description of the invalid subprotocol.
        message: String,
    },

    // ========================================================================
    // Connection Event Errors
    // ========================================================================
    /// The connection emitted an error event.
    ///
    /// Raised by whichever wait lost its race to the error event: setup
    /// (before open), teardown (during close), or message reception.
    #[error("Connection error: {0}")]
    Event(ErrorEvent),

    // ========================================================================
    // Send Preconditions
    // ========================================================================
    /// `send` was called while the connection is closing.
    #[error("The Web Socket is closing")]
    Closing,

    /// `send` was called after the connection closed.
    #[error("The Web Socket is already closed")]
    AlreadyClosed,

    // ========================================================================
    // Teardown Errors
    // ========================================================================
    /// The driver task is gone and can no longer serve this operation.
    ///
    /// Returned when a command cannot be delivered, or when a pending wait
    /// was discarded because the connection tore down without firing the
    /// awaited event.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// WebSocket protocol or transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates an error from a connection error event.
    #[inline]
    pub fn event(event: ErrorEvent) -> Self {
        Self::Event(event)
    }

    /// Creates an unsupported scheme error.
    #[inline]
    pub fn unsupported_scheme(scheme: impl Into<String>) -> Self {
        Self::UnsupportedScheme {
            scheme: scheme.into(),
        }
    }

    /// Creates an invalid subprotocol error.
    #[inline]
    pub fn invalid_protocol(message: impl Into<String>) -> Self {
        Self::InvalidProtocol {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a send precondition failure.
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Closing | Self::AlreadyClosed)
    }

    /// Returns `true` if this error carries a connection error event.
    #[inline]
    #[must_use]
    pub fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }

    /// Returns `true` if this is a connection-level failure.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Event(_) | Self::ConnectionClosed | Self::WebSocket(_)
        )
    }

    /// Returns the error event, if this error carries one.
    #[inline]
    #[must_use]
    pub fn as_event(&self) -> Option<&ErrorEvent> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
