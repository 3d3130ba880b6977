//! Dispatch lifecycle events: types, broadcast bus, log translation.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the delivery worker and
//! the dispatcher facade.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//! - `log` — internal listener translating events to `tracing` records
//!
//! ## Quick reference
//! - **Publishers**: `Dispatcher` (queued / stop-requested), `DispatchWorker`
//!   (delivered / failed / dropped / circuit-open / drained).
//! - **Consumers**: the dispatcher's log listener, and any receiver obtained
//!   via `Dispatcher::subscribe` (tests lean on this).

mod bus;
mod event;
pub(crate) mod log;

pub use bus::Bus;
pub use event::{Event, EventKind};
