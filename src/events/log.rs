//! Translates bus events into `tracing` records.
//!
//! The dispatcher runs one listener task feeding each event through
//! [`log_event`]. Steady-state outcomes log at `debug`; conditions an
//! operator should notice (drops, open circuit) log at `warn`.

use tracing::{debug, warn};

use super::event::{Event, EventKind};

pub(crate) fn log_event(event: &Event) {
    let description = event.description.as_deref().unwrap_or("");
    match event.kind {
        EventKind::PayloadQueued => {
            debug!(description, pending = event.pending, "payload queued");
        }
        EventKind::DeliverySucceeded => {
            debug!(
                description,
                status = event.status,
                delta_ms = event.delta_ms,
                "payload delivered"
            );
        }
        EventKind::DeliveryFailed => {
            debug!(
                description,
                status = event.status,
                error = event.error.as_deref(),
                delta_ms = event.delta_ms,
                "delivery failed"
            );
        }
        EventKind::PayloadDropped => {
            warn!(description, "payload dropped during shutdown");
        }
        EventKind::CircuitOpen => {
            warn!(
                pending = event.pending,
                "consecutive failures reached threshold; pausing until next pass"
            );
        }
        EventKind::StopRequested => {
            debug!(pending = event.pending, "stop requested");
        }
        EventKind::WorkerDrained => {
            debug!(pending = event.pending, "worker drained and stopped");
        }
    }
}
