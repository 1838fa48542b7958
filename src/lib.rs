//! ws-bridge - Structured-concurrency bridge over event-driven WebSockets.
//!
//! This library adapts a callback/event-driven WebSocket connection into a
//! small structured-concurrency surface: one awaitable setup operation, a
//! synchronous state-gated send, an awaitable close, and a lazy unbounded
//! stream of inbound messages.
//!
//! # Architecture
//!
//! Every wait is the same mechanism all the way down:
//!
//! - The socket driver emits four named events (open, message, close,
//!   error) as the connection progresses
//! - A one-shot listener fires at most once and deregisters itself
//! - A pending wait races one success listener against one error listener;
//!   the first event to fire decides the outcome and the losing listener is
//!   cancelled
//!
//! There is no reconnection, buffering, or multiplexing here - the bridge
//! adds awaitability, not transport features.
//!
//! # Quick Start
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use ws_bridge::{Result, open};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Resolves once the connection is open
//!     let handle = open("ws://127.0.0.1:9001").await?;
//!
//!     // Synchronous; fails fast if the connection is closing or closed
//!     handle.send("hello")?;
//!
//!     // Lazy and unbounded; one wait per pulled value
//!     let mut messages = handle.receive();
//!     if let Some(message) = messages.next().await {
//!         println!("received: {:?}", message?.text());
//!     }
//!
//!     // Resolves once teardown completes
//!     let close = handle.close().await?;
//!     println!("closed with code {}", close.code);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Opener, capability [`Handle`], message stream |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`event`] | Named events and their payloads |
//! | [`socket`] | Event-driven socket layer (internal) |

// ============================================================================
// Modules
// ============================================================================

/// The structured-concurrency bridge: opener, handle, message stream.
pub mod bridge;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Named connection events and their payloads.
pub mod event;

/// The event-driven socket layer.
///
/// Internal module housing the one-shot emitter and the tungstenite-backed
/// driver task.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge operations
pub use bridge::{Handle, MessageStream, open, open_with_protocols};

// Error types
pub use error::{Error, Result};

// Event types
pub use event::{
    CLOSE_CODE_ABNORMAL, CLOSE_CODE_NO_STATUS, CLOSE_CODE_NORMAL, CloseEvent, ErrorEvent,
    EventKind, MessageEvent, OpenEvent, Payload, SocketEvent,
};

// Socket types
pub use socket::{EventEmitter, ListenerId, PendingSocket, ReadyState, Socket, Subscription};
