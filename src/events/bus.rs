//! # Broadcast bus for dispatch lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] giving the
//! worker and the facade a non-blocking way to publish lifecycle events to
//! any number of observers (the internal log listener, test harnesses).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or suspends.
//! - **Bounded capacity**: a single ring buffer stores recent events; slow
//!   receivers observe `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: with no active receivers an event is dropped.
//!   Diagnostics are advisory, never load-bearing.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for dispatch lifecycle events.
///
/// Cheap to clone (the sender is `Arc`-backed internally); every receiver
/// gets its own clone of each event published after it subscribed.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus with the given ring-buffer capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// Returns immediately; if nobody is subscribed the event is dropped.
    pub fn publish(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    /// Creates an independent receiver observing subsequent events only.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
