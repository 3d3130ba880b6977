//! # Pending-payload queue shared by submitters and the delivery worker.
//!
//! [`EventQueue`] is an unbounded concurrent deque of [`Payload`]s with a
//! deliberately narrow API: `push_front` for fresh submissions, `pop_front`
//! for the worker, `push_back` for failed-delivery requeues.
//!
//! ## Ordering contract
//! Both submission and draining operate on the **front**, so a burst of
//! freshly submitted payloads is delivered most-recent-first relative to
//! each other. A payload that fails delivery is demoted to the **back** and
//! retried only after everything currently ahead of it: fresh events get
//! delivery priority over retries, while retries are never abandoned as
//! long as the worker keeps running. This discipline is intentional; do not
//! "fix" it to plain FIFO.
//!
//! ## Rules
//! - Every in-flight payload is present in the queue exactly once.
//! - All operations are O(1) and safe under concurrent callers; the lock is
//!   internal and never held across anything that can block or panic, so
//!   submitters never suspend and poisoning cannot occur in practice.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::payload::Payload;

/// Unbounded concurrent deque of payloads awaiting delivery.
#[derive(Debug, Default)]
pub struct EventQueue {
    items: Mutex<VecDeque<Payload>>,
}

impl EventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a freshly submitted payload to the front.
    pub fn push_front(&self, payload: Payload) {
        self.lock().push_front(payload);
    }

    /// Pops the next payload to attempt, if any.
    pub fn pop_front(&self) -> Option<Payload> {
        self.lock().pop_front()
    }

    /// Requeues a failed payload at the back, behind everything currently
    /// queued and anything submitted before its next turn.
    pub fn push_back(&self, payload: Payload) {
        self.lock().push_back(payload);
    }

    /// Returns true when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the number of queued payloads.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Payload>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
