//! # telecourier
//!
//! **Telecourier** is a background telemetry dispatcher for Rust.
//!
//! Application code enqueues named events (category/action/label/value);
//! a single background worker delivers them to a remote collection
//! endpoint as HTTP payloads, tolerating transient network failures
//! without blocking the caller and without losing events under normal
//! shutdown.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   caller ──► Dispatcher::submit_event ──► encoder ──► Payload
//!                     │                                   │
//!                     │ (lazy start, first event)         ▼
//!                     │                          ┌─────────────────┐
//!                     │                          │   EventQueue    │
//!                     │              push FRONT ─►  (concurrent    │
//!                     │                          │     deque)      │
//!                     │                          └───┬─────────▲───┘
//!                     ▼                      pop front│         │push BACK
//!              ┌──────────────┐                       ▼         │ (failed,
//!              │ DispatchWorker (one background task)           │  retry)
//!              │  - drains queue front-first                    │
//!              │  - circuit breaker after N consecutive failures│
//!              │  - escalating inter-pass pacing ───────────────┘
//!              └──────┬───────┘
//!                     ▼
//!              Transport::deliver(url, body)   success: status < 400
//!                     │
//!                     ▼
//!              Bus (broadcast) ──► log listener / test observers
//! ```
//!
//! ### Delivery ordering
//! Fresh submissions and draining both operate on the queue **front**, so a
//! burst of fresh events is delivered most-recent-first; a payload that
//! fails delivery is demoted to the **back** and retried only after
//! everything ahead of it. Fresh events get priority; retries are never
//! abandoned while the worker runs. During shutdown a failed delivery is
//! dropped instead of requeued (best-effort flush).
//!
//! ### Lifecycle
//! ```text
//! Dispatcher::configure("tracking|client|secret")
//!         │
//! submit_event ──► worker starts lazily ──► Draining ◄──► Idle
//!         ...
//! stop() ──► stop requested ──► Stopping (failures drop) ──► Stopped
//!         └─► wait drain (≤ 10s) ──► wait join (≤ 10s, then abort)
//! ```
//!
//! ## Features
//! | Area            | Description                                             | Key types                          |
//! |-----------------|---------------------------------------------------------|------------------------------------|
//! | **Submission**  | Fire-and-forget events and page views.                  | [`Dispatcher`]                     |
//! | **Delivery**    | Abstract transport; `reqwest` implementation included.  | [`Transport`], [`HttpTransport`]   |
//! | **Pacing**      | Idle interval, failure escalation, circuit threshold.   | [`PacingPolicy`], [`DispatcherConfig`] |
//! | **Observability**| Lifecycle events on a broadcast bus + `tracing` logs.  | [`Event`], [`EventKind`], [`Bus`]  |
//! | **Errors**      | Typed shutdown/transport errors.                        | [`DispatchError`], [`TransportError`] |
//!
//! ## Example
//! ```no_run
//! use telecourier::{Dispatcher, DispatcherConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dispatcher = Dispatcher::new(DispatcherConfig::default())?;
//!
//!     // "tracking-id|client-id|app-secret"
//!     dispatcher.configure("GA4-123|client99|secretXYZ");
//!
//!     // Never blocks; the worker starts on first use.
//!     dispatcher.submit_event("app", "start", "cold", "1");
//!     dispatcher.submit_page_view("Main Window", "app://main");
//!
//!     // Graceful shutdown: flush what remains, bounded waits.
//!     dispatcher.stop().await?;
//!     Ok(())
//! }
//! ```

mod clock;
mod config;
mod core;
mod credentials;
mod error;
mod events;
mod payload;
mod policy;
mod queue;
mod transport;

// ---- Public re-exports ----

pub use clock::{Clock, SystemClock};
pub use config::DispatcherConfig;
pub use core::Dispatcher;
pub use credentials::Credentials;
pub use error::{DispatchError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use payload::{encode_event, Payload};
pub use policy::PacingPolicy;
pub use queue::EventQueue;
pub use transport::{HttpTransport, Transport};
