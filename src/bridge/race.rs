//! Pending waits: one success event raced against the error event.
//!
//! Every awaitable operation in the bridge reduces to the same shape: wait
//! for one named event, unless the error event fires first. Both sides are
//! one-shot listeners feeding a single channel through a take-once slot, so
//! whichever event the connection delivers first decides the outcome -
//! even when both fired before the caller was polled.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::event::{EventKind, SocketEvent};
use crate::socket::{Socket, Subscription};

// ============================================================================
// EventRace
// ============================================================================

/// One pending wait on a socket.
///
/// Holds the listener pair for its lifetime: resolving cancels the side
/// that did not fire, and dropping an unresolved race cancels both. No
/// registration survives the wait that created it.
pub(crate) struct EventRace {
    rx: oneshot::Receiver<SocketEvent>,
    success: Subscription,
    failure: Subscription,
}

impl EventRace {
    /// Registers the `success`-vs-error listener pair on `socket`.
    ///
    /// Registration happens synchronously, before this call returns, so a
    /// race created before the driver acts cannot miss its event.
    pub(crate) fn new(socket: &Socket, success: EventKind) -> Self {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Mutex::new(Some(tx)));

        let success_sub = {
            let slot = Arc::clone(&slot);
            socket.once(success, move |event| {
                if let Some(tx) = slot.lock().take() {
                    let _ = tx.send(event);
                }
            })
        };

        let failure_sub = socket.once(EventKind::Error, move |event| {
            if let Some(tx) = slot.lock().take() {
                let _ = tx.send(event);
            }
        });

        Self {
            rx,
            success: success_sub,
            failure: failure_sub,
        }
    }

    /// Waits for the first of the two events.
    ///
    /// # Errors
    ///
    /// - [`Error::Event`] if the error event fired first
    /// - [`Error::ConnectionClosed`] if the connection tore down and
    ///   discarded the wait without firing either event
    pub(crate) async fn resolve(self) -> Result<SocketEvent> {
        let Self {
            rx,
            success,
            failure,
        } = self;

        let event = rx.await.map_err(|_| Error::ConnectionClosed)?;

        match event {
            SocketEvent::Error(event) => {
                // the success side lost; its registration must not linger
                success.cancel();
                drop(failure);
                Err(Error::event(event))
            }
            event => {
                failure.cancel();
                drop(success);
                Ok(event)
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::{CloseEvent, ErrorEvent, MessageEvent, OpenEvent};

    #[tokio::test]
    async fn test_success_event_wins() {
        let (socket, _command_rx) = Socket::detached();
        let race = EventRace::new(&socket, EventKind::Open);

        socket.emit(SocketEvent::Open(OpenEvent::new("chat")));

        let event = race.resolve().await.expect("open should win");
        assert_eq!(event.into_open().expect("open payload").protocol, "chat");
        assert_eq!(socket.listener_count(EventKind::Open), 0);
        assert_eq!(socket.listener_count(EventKind::Error), 0);
    }

    #[tokio::test]
    async fn test_error_event_wins() {
        let (socket, _command_rx) = Socket::detached();
        let race = EventRace::new(&socket, EventKind::Open);

        socket.emit(SocketEvent::Error(ErrorEvent::new("refused")));

        let err = race.resolve().await.unwrap_err();
        assert_eq!(err.as_event().expect("error event").message, "refused");
        // the losing open listener was cancelled
        assert_eq!(socket.listener_count(EventKind::Open), 0);
        assert_eq!(socket.listener_count(EventKind::Error), 0);
    }

    #[tokio::test]
    async fn test_first_fired_event_wins() {
        // error delivered before the message: the error must win, even
        // though both fired before the race was polled
        let (socket, _command_rx) = Socket::detached();
        let race = EventRace::new(&socket, EventKind::Message);

        socket.emit(SocketEvent::Error(ErrorEvent::new("broken pipe")));
        socket.emit(SocketEvent::Message(MessageEvent::new("late")));

        let err = race.resolve().await.unwrap_err();
        assert!(err.is_event());
    }

    #[tokio::test]
    async fn test_message_before_error_wins() {
        let (socket, _command_rx) = Socket::detached();
        let race = EventRace::new(&socket, EventKind::Message);

        socket.emit(SocketEvent::Message(MessageEvent::new("first")));
        socket.emit(SocketEvent::Error(ErrorEvent::new("second")));

        let event = race.resolve().await.expect("message should win");
        assert_eq!(
            event.into_message().expect("message payload").text(),
            Some("first")
        );
    }

    #[tokio::test]
    async fn test_discarded_wait_resolves_connection_closed() {
        let (socket, _command_rx) = Socket::detached();
        let race = EventRace::new(&socket, EventKind::Close);

        socket.clear_listeners();

        let err = race.resolve().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_dropped_race_cancels_both_sides() {
        let (socket, _command_rx) = Socket::detached();
        let race = EventRace::new(&socket, EventKind::Close);

        assert_eq!(socket.listener_count(EventKind::Close), 1);
        assert_eq!(socket.listener_count(EventKind::Error), 1);

        drop(race);

        assert_eq!(socket.listener_count(EventKind::Close), 0);
        assert_eq!(socket.listener_count(EventKind::Error), 0);
    }

    #[tokio::test]
    async fn test_second_occurrence_does_not_double_fire() {
        let (socket, _command_rx) = Socket::detached();
        let race = EventRace::new(&socket, EventKind::Close);

        socket.emit(SocketEvent::Close(CloseEvent::new(1000, "first", true)));
        socket.emit(SocketEvent::Close(CloseEvent::new(1001, "second", true)));

        let event = race.resolve().await.expect("close event");
        assert_eq!(event.into_close().expect("close payload").reason, "first");
        assert_eq!(socket.listener_count(EventKind::Close), 0);
    }
}
