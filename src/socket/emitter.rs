//! One-shot event listeners.
//!
//! Every wait in this crate is built from single-use listeners: a listener
//! registers for one named event, fires at most once, and deregisters
//! itself on firing. Registrations that never fire are removed through
//! their [`Subscription`] guard, so a listener can never outlive the wait
//! that created it.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::event::{EventKind, SocketEvent};

// ============================================================================
// Types
// ============================================================================

/// Boxed single-use listener callback.
type OnceCallback = Box<dyn FnOnce(SocketEvent) + Send>;

// ============================================================================
// ListenerId
// ============================================================================

/// Identifies one registration within an emitter.
///
/// Ids are unique for the lifetime of the emitter, across all event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// ============================================================================
// ListenerTable
// ============================================================================

/// One registered listener.
struct Entry {
    id: ListenerId,
    callback: OnceCallback,
}

/// Listener storage, keyed by event kind.
#[derive(Default)]
struct ListenerTable {
    listeners: FxHashMap<EventKind, Vec<Entry>>,
    next_id: u64,
}

// ============================================================================
// EventEmitter
// ============================================================================

/// Dispatches named events to one-shot listeners.
///
/// Cheaply cloneable; clones share the same listener table. Emission is
/// serialized by the caller (the driver task is the only event source), so
/// listeners observe events in delivery order.
#[derive(Clone, Default)]
pub struct EventEmitter {
    table: Arc<Mutex<ListenerTable>>,
}

impl EventEmitter {
    /// Creates an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for the next occurrence of `kind`.
    ///
    /// The callback is invoked at most once; the registration is removed
    /// when it fires. Dropping (or cancelling) the returned guard removes
    /// a registration that has not fired yet.
    #[must_use = "dropping the subscription cancels the registration"]
    pub fn once(
        &self,
        kind: EventKind,
        callback: impl FnOnce(SocketEvent) + Send + 'static,
    ) -> Subscription {
        let id = {
            let mut table = self.table.lock();
            table.next_id += 1;
            let id = ListenerId(table.next_id);
            table.listeners.entry(kind).or_default().push(Entry {
                id,
                callback: Box::new(callback),
            });
            id
        };

        Subscription {
            emitter: self.clone(),
            kind,
            id,
        }
    }

    /// Removes a registration that has not fired yet.
    ///
    /// Returns `true` if the registration was still present.
    pub fn remove(&self, kind: EventKind, id: ListenerId) -> bool {
        let removed = {
            let mut table = self.table.lock();
            let Some(entries) = table.listeners.get_mut(&kind) else {
                return false;
            };
            entries
                .iter()
                .position(|entry| entry.id == id)
                .map(|index| entries.remove(index))
        };
        // the entry (and whatever its callback owns) drops outside the lock
        removed.is_some()
    }

    /// Fires an event to every listener currently registered for its kind.
    ///
    /// Listeners are deregistered before they run and are invoked in
    /// registration order. Callbacks run outside the table lock, so a
    /// callback may register the next wait.
    pub fn emit(&self, event: SocketEvent) {
        let fired = {
            let mut table = self.table.lock();
            table.listeners.remove(&event.kind()).unwrap_or_default()
        };

        for entry in fired {
            (entry.callback)(event.clone());
        }
    }

    /// Returns the number of listeners registered for `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.table
            .lock()
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Discards every registration without invoking it.
    ///
    /// Pending waits observe the discard (their callbacks are dropped) and
    /// resolve with [`Error::ConnectionClosed`](crate::Error::ConnectionClosed).
    pub fn clear(&self) {
        let discarded = {
            let mut table = self.table.lock();
            std::mem::take(&mut table.listeners)
        };
        // entries drop outside the lock
        drop(discarded);
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Guard for one registration.
///
/// A registration is removed on whichever comes first: its event firing, or
/// this guard being cancelled/dropped. Both sides of a race hold one guard
/// each; resolving the race cancels the side that did not fire.
#[must_use = "dropping the subscription cancels the registration"]
pub struct Subscription {
    emitter: EventEmitter,
    kind: EventKind,
    id: ListenerId,
}

impl Subscription {
    /// Returns the event kind this registration listens for.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Returns the registration id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes the registration if it has not fired yet.
    ///
    /// Dropping the guard has the same effect; `cancel` states the intent
    /// at race-resolution sites.
    pub fn cancel(self) {
        // removal happens in Drop
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.emitter.remove(self.kind, self.id);
    }
}

// ============================================================================
// Tests
// ============================================================================
