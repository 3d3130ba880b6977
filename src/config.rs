//! # Dispatcher configuration.
//!
//! Provides [`DispatcherConfig`], the centralized settings for the
//! dispatcher runtime: collector endpoints, worker pacing, the
//! consecutive-failure threshold and the graceful-shutdown waits.
//!
//! All fields are public for flexibility; prefer the helper accessors over
//! sprinkling sentinel/clamping checks across the codebase.

use std::time::Duration;

use crate::policy::PacingPolicy;

/// Global configuration for the dispatcher runtime.
///
/// ## Field semantics
/// - `collect_url`: base URL of the event collector (credentials are added
///   as query parameters per payload)
/// - `page_view_url`: base URL of the page-view collector
/// - `failure_threshold`: consecutive delivery failures within one pass
///   that open the circuit breaker (min 1; clamped)
/// - `pacing`: inter-pass sleep policy (base idle, escalation, cap)
/// - `drain_timeout`: maximum wait for the worker to drain on `stop()`
/// - `join_timeout`: maximum wait for the worker task to finish after the
///   drain phase; the task is aborted past it
/// - `bus_capacity`: diagnostics bus ring-buffer size (min 1; clamped)
/// - `request_timeout`: per-request timeout of the HTTP transport
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Base URL payloads for named events are POSTed to.
    pub collect_url: String,

    /// Base URL page views are POSTed to.
    pub page_view_url: String,

    /// Consecutive failures within one pass that open the circuit breaker.
    ///
    /// Once reached, the worker stops attempting deliveries for the rest of
    /// the pass; the counter resets at the start of the next pass.
    pub failure_threshold: u32,

    /// Inter-pass sleep policy.
    pub pacing: PacingPolicy,

    /// Maximum wait for the worker to drain the queue during `stop()`.
    pub drain_timeout: Duration,

    /// Maximum wait for the worker task to finish after the drain phase.
    pub join_timeout: Duration,

    /// Capacity of the diagnostics bus ring buffer.
    ///
    /// Slow receivers lagging behind more than this many events observe
    /// `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Per-request timeout applied by [`HttpTransport`](crate::HttpTransport).
    pub request_timeout: Duration,
}

impl DispatcherConfig {
    /// Returns the failure threshold clamped to a minimum of 1.
    #[inline]
    pub fn failure_threshold_clamped(&self) -> u32 {
        self.failure_threshold.max(1)
    }

    /// Returns the bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for DispatcherConfig {
    /// Default configuration:
    ///
    /// - collector endpoints: the GA4 measurement-protocol URLs
    /// - `failure_threshold = 3`
    /// - `pacing = PacingPolicy::default()` (100ms idle, ×2 escalation, 5min cap)
    /// - `drain_timeout = 10s`, `join_timeout = 10s`
    /// - `bus_capacity = 1024`
    /// - `request_timeout = 30s`
    fn default() -> Self {
        Self {
            collect_url: "https://www.google-analytics.com/mp/collect".to_string(),
            page_view_url: "https://www.google-analytics.com/g/collect".to_string(),
            failure_threshold: 3,
            pacing: PacingPolicy::default(),
            drain_timeout: Duration::from_secs(10),
            join_timeout: Duration::from_secs(10),
            bus_capacity: 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}
