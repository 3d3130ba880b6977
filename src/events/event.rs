//! # Lifecycle events emitted by the dispatcher and the delivery worker.
//!
//! The [`EventKind`] enum classifies events across the payload lifecycle
//! (queued, delivered, failed, dropped) and the worker lifecycle
//! (circuit-open, stop-requested, drained). The [`Event`] struct carries
//! optional metadata: payload description, HTTP status, queue age, error
//! text and pending-queue size.
//!
//! ## Ordering
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically; use it to restore order when events are observed from
//! multiple receivers.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of dispatch lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Payload lifecycle ===
    /// A payload was encoded and pushed to the queue front.
    ///
    /// Sets: `description`, `pending`.
    PayloadQueued,

    /// A payload was delivered (status below 400) and removed.
    ///
    /// Sets: `description`, `status`, `delta_ms` (queue age).
    DeliverySucceeded,

    /// A delivery attempt failed (transport error or status ≥ 400).
    ///
    /// Sets: `description`, `delta_ms`, and `status` **or** `error`.
    DeliveryFailed,

    /// A payload that failed while stopping was dropped permanently.
    ///
    /// Sets: `description`.
    PayloadDropped,

    // === Worker lifecycle ===
    /// The consecutive-failure threshold was reached; no further attempts
    /// this pass.
    ///
    /// Sets: `pending`.
    CircuitOpen,

    /// Graceful shutdown was requested.
    ///
    /// Sets: `pending`.
    StopRequested,

    /// The worker observed the stop request and exited its loop.
    ///
    /// Sets: `pending` (payloads abandoned, normally 0).
    WorkerDrained,
}

/// Lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Payload description, if applicable.
    pub description: Option<Arc<str>>,
    /// HTTP status code of the attempt.
    pub status: Option<u16>,
    /// Time the payload spent queued, in milliseconds (compact).
    pub delta_ms: Option<u64>,
    /// Failure message when no status was obtained.
    pub error: Option<Arc<str>>,
    /// Queue size at the time of the event.
    pub pending: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            description: None,
            status: None,
            delta_ms: None,
            error: None,
            pending: None,
        }
    }

    /// Attaches a payload description.
    #[inline]
    pub fn with_description(mut self, description: impl Into<Arc<str>>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attaches an HTTP status code.
    #[inline]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the queue age (stored as milliseconds).
    #[inline]
    pub fn with_delta(mut self, age: Duration) -> Self {
        let ms = age.as_millis().min(u128::from(u64::MAX)) as u64;
        self.delta_ms = Some(ms);
        self
    }

    /// Attaches a failure message.
    #[inline]
    pub fn with_error(mut self, error: impl Into<Arc<str>>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attaches the queue size observed at event time.
    #[inline]
    pub fn with_pending(mut self, pending: usize) -> Self {
        self.pending = Some(pending);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::DeliveryFailed)
            .with_description("Event [c:a a:b l: v:]")
            .with_delta(Duration::from_millis(250))
            .with_error("connection refused");

        assert_eq!(ev.kind, EventKind::DeliveryFailed);
        assert_eq!(ev.description.as_deref(), Some("Event [c:a a:b l: v:]"));
        assert_eq!(ev.delta_ms, Some(250));
        assert_eq!(ev.error.as_deref(), Some("connection refused"));
        assert!(ev.status.is_none());
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::PayloadQueued);
        let b = Event::new(EventKind::PayloadQueued);
        assert!(b.seq > a.seq);
    }
}
