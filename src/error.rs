//! Error types used by the dispatcher runtime and the delivery transport.
//!
//! This module defines two error types:
//!
//! - [`DispatchError`] — errors raised by the dispatcher lifecycle itself,
//!   reported by `stop()` after shutdown has completed anyway.
//! - [`TransportError`] — a single delivery attempt failed before a status
//!   code could be obtained (connection refused, DNS, timeout, TLS).
//!
//! Both provide `as_label()` helpers producing short stable strings for
//! logs/metrics.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the dispatcher lifecycle.
///
/// These are reported, not thrown: `stop()` always runs both of its bounded
/// waits and releases the worker regardless, then returns the first timeout
/// it observed so callers can log it.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The worker did not drain the queue within the drain timeout.
    ///
    /// Payloads still queued at that point are abandoned (nothing is
    /// persisted across restarts).
    #[error("drain timeout {waited:?} exceeded; {pending} payload(s) still queued")]
    DrainTimeout {
        /// The configured drain wait that elapsed.
        waited: Duration,
        /// Number of payloads left in the queue when the wait expired.
        pending: usize,
    },

    /// The worker task did not finish within the join timeout after the
    /// drain phase; it was aborted.
    #[error("worker did not join within {waited:?}; aborted")]
    JoinTimeout {
        /// The configured join wait that elapsed.
        waited: Duration,
    },
}

impl DispatchError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            DispatchError::DrainTimeout { .. } => "dispatch_drain_timeout",
            DispatchError::JoinTimeout { .. } => "dispatch_join_timeout",
        }
    }
}

/// # A single delivery attempt failed without producing a status code.
///
/// The [`Transport`](crate::Transport) boundary is abstract; this type
/// deliberately carries only a message so implementations do not leak their
/// HTTP client's error types and test transports can construct it directly.
///
/// A `TransportError` is never fatal to the worker: the payload is requeued
/// (or dropped during shutdown) and the loop continues.
#[derive(Error, Debug)]
#[error("delivery failed: {message}")]
pub struct TransportError {
    message: String,
}

impl TransportError {
    /// Creates a transport error from any displayable cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the underlying failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest chains the source into Display; keep it on one line.
        Self::new(err.to_string())
    }
}
