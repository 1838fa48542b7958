//! The connection opener.
//!
//! Turns "create a socket and wait for it to open" into one awaitable
//! operation: the returned future resolves to a [`Handle`] when the open
//! event fires, or fails with the error event if the connection never gets
//! that far. Exactly one of the two outcomes occurs.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::error::Result;
use crate::event::EventKind;
use crate::socket::PendingSocket;

use super::handle::Handle;
use super::race::EventRace;

// ============================================================================
// open
// ============================================================================

/// Opens a WebSocket connection.
///
/// Completes once the connection reaches the open state. There is no retry
/// and no timeout: the future takes however long the connection attempt
/// takes, and the first of the open/error events decides the outcome.
///
/// # Example
///
/// ```no_run
/// use ws_bridge::{Result, open};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let handle = open("ws://127.0.0.1:9001").await?;
///     handle.send("hello")?;
///     Ok(())
/// }
/// ```
///
/// # Errors
///
/// - [`Error::Url`](crate::Error::Url) /
///   [`Error::UnsupportedScheme`](crate::Error::UnsupportedScheme) if the
///   address is invalid (checked before connecting)
/// - [`Error::Event`](crate::Error::Event) if the connection signals an
///   error before opening
pub async fn open(url: &str) -> Result<Handle> {
    open_with_protocols(url, &[]).await
}

/// Opens a WebSocket connection, offering the given subprotocols.
///
/// The negotiated subprotocol (if any) is carried by the open event and
/// logged; callers that need it can inspect the handshake response headers
/// server-side.
///
/// # Errors
///
/// Same as [`open`], plus
/// [`Error::InvalidProtocol`](crate::Error::InvalidProtocol) if the
/// subprotocol list is not a valid header value.
pub async fn open_with_protocols(url: &str, protocols: &[&str]) -> Result<Handle> {
    let pending = PendingSocket::new(url, protocols)?;
    let socket = pending.socket();

    // listen before launching: the driver must not be able to win (or lose)
    // the handshake before the race is registered
    let race = EventRace::new(&socket, EventKind::Open);
    pending.launch();

    let event = race.resolve().await?;
    if let Some(open) = event.into_open()
        && !open.protocol.is_empty()
    {
        debug!(protocol = %open.protocol, "subprotocol negotiated");
    }

    Ok(Handle::new(socket))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::tungstenite::Message;

    use crate::error::Error;
    use crate::event::CLOSE_CODE_NORMAL;
    use crate::socket::ReadyState;

    /// Binds an in-process echo server that mirrors frames back and
    /// completes the closing handshake.
    async fn spawn_echo_server() -> (String, JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind echo server");
        let addr = listener.local_addr().expect("local addr");

        let task = tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let mut ws = tokio_tungstenite::accept_async(stream)
                    .await
                    .expect("upgrade");

                while let Some(Ok(message)) = ws.next().await {
                    match message {
                        Message::Text(_) | Message::Binary(_) => {
                            let _ = ws.send(message).await;
                        }
                        Message::Close(_) => {
                            // flush the queued close reply
                            let _ = ws.close(None).await;
                            break;
                        }
                        _ => {}
                    }
                }
            }
        });

        (format!("ws://{addr}"), task)
    }

    #[tokio::test]
    async fn test_open_reaches_open_state() {
        let (url, server) = spawn_echo_server().await;

        let handle = open(&url).await.expect("open");
        assert_eq!(handle.ready_state(), ReadyState::Open);

        let _ = handle.close().await;
        let _ = server.await;
    }

    #[tokio::test]
    async fn test_echo_roundtrip() {
        let (url, server) = spawn_echo_server().await;

        let handle = open(&url).await.expect("open");
        let mut messages = handle.receive();

        // one frame in flight at a time: the stream registers its listener
        // per pulled value, so each echo is awaited before the next send
        handle.send("ping").expect("send text");
        let first = messages
            .next()
            .await
            .expect("stream open")
            .expect("first echo");
        assert_eq!(first.text(), Some("ping"));

        handle.send(vec![1u8, 2, 3]).expect("send binary");
        let second = messages
            .next()
            .await
            .expect("stream open")
            .expect("second echo");
        assert_eq!(second.payload.as_bytes(), &[1, 2, 3]);

        let _ = handle.close().await;
        let _ = server.await;
    }

    #[tokio::test]
    async fn test_close_completes_teardown() {
        let (url, server) = spawn_echo_server().await;

        let handle = open(&url).await.expect("open");
        let event = handle.close_with(CLOSE_CODE_NORMAL, "done").await.expect("close");

        assert!(event.was_clean);
        assert_eq!(event.code, CLOSE_CODE_NORMAL);
        assert_eq!(handle.ready_state(), ReadyState::Closed);

        let _ = server.await;
    }

    #[tokio::test]
    async fn test_send_after_close_is_rejected() {
        let (url, server) = spawn_echo_server().await;

        let handle = open(&url).await.expect("open");
        handle.close().await.expect("close");

        let err = handle.send("too late").unwrap_err();
        assert_eq!(err.to_string(), "The Web Socket is already closed");

        let _ = server.await;
    }

    #[tokio::test]
    async fn test_open_fails_when_nobody_listens() {
        // grab a port, then free it so the connect is refused
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);

        let err = open(&format!("ws://{addr}")).await.unwrap_err();
        assert!(matches!(err, Error::Event(_)));
    }

    #[tokio::test]
    async fn test_open_rejects_bad_scheme_before_connecting() {
        let err = open("https://example.com/socket").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedScheme { .. }));
    }

    #[tokio::test]
    async fn test_open_rejects_garbage_url() {
        let err = open("definitely not a url").await.unwrap_err();
        assert!(matches!(err, Error::Url(_)));
    }

    #[tokio::test]
    async fn test_receive_errors_when_peer_vanishes() {
        // a server that accepts the handshake and then drops the TCP
        // connection without a close frame
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let server = tokio::spawn(async move {
            if let Ok((stream, _)) = listener.accept().await {
                let ws = tokio_tungstenite::accept_async(stream)
                    .await
                    .expect("upgrade");
                drop(ws);
            }
        });

        let handle = open(&format!("ws://{addr}")).await.expect("open");
        let mut messages = handle.receive();

        let item = messages.next().await.expect("terminating item");
        assert!(item.is_err());

        let _ = server.await;
    }
}
