//! # DispatchWorker: the draining/retry loop.
//!
//! Supervises delivery of queued payloads with:
//! - requeue-to-back on failure (fresh events keep delivery priority),
//! - a consecutive-failure circuit breaker per pass,
//! - escalating inter-pass pacing per [`PacingPolicy`],
//! - cooperative shutdown via [`CancellationToken`].
//!
//! ## State machine
//! ```text
//!              queue non-empty
//!     Idle ───────────────────────► Draining
//!      ▲                               │
//!      └───── queue empty, ────────────┘
//!             stop not requested
//!
//!     Idle/Draining ── stop requested ──► Stopping (still draining;
//!                                          failures drop instead of requeue)
//!     Stopping ── queue empty ──► Stopped (terminal; signals `done`)
//! ```
//!
//! ## Per-pass algorithm
//! ```text
//! loop {
//!   ├─► capture stopping = stop.is_cancelled()
//!   ├─► queue empty?
//!   │     ├─ yes, stopping  → break (Stopped)
//!   │     └─ yes, running   → idle through this pass
//!   ├─► drain: pop front → deliver
//!   │     ├─ status < 400       → success, reset failure counter
//!   │     ├─ failure, running   → push to BACK, counter += 1
//!   │     │                       counter == threshold → circuit open,
//!   │     │                       stop attempting for this pass
//!   │     └─ failure, stopping  → drop permanently (best-effort flush)
//!   ├─► sleep pacing interval (clean pass → idle; after a failing pass
//!   │   the next interval escalates ×factor up to the cap)
//!   └─► repeat
//! }
//! on exit: publish WorkerDrained, cancel `done`
//! ```
//!
//! ## Rules
//! - Delivery failures are never fatal to the worker; they decide one
//!   payload's fate per the rules above and the loop continues.
//! - The stopping flag is captured **once per pass**: a stop arriving
//!   mid-pass takes effect on the next pass.
//! - The failure counter resets on every success and at each pass start.

use std::sync::Arc;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::events::{Bus, Event, EventKind};
use crate::policy::PacingPolicy;
use crate::queue::EventQueue;
use crate::transport::Transport;

/// Status codes below this are treated as delivered.
const DELIVERED_BELOW: u16 = 400;

/// The single long-lived delivery loop. One instance runs per dispatcher.
pub(crate) struct DispatchWorker {
    pub(crate) queue: Arc<EventQueue>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) bus: Bus,
    pub(crate) failure_threshold: u32,
    pub(crate) pacing: PacingPolicy,
}

impl DispatchWorker {
    /// Runs the loop until a stop request is observed and the queue is
    /// drained (or emptied by shutdown drops). Cancels `done` on exit.
    ///
    /// `stop` is sampled at pass boundaries only; delivery attempts are
    /// never interrupted mid-flight.
    pub(crate) async fn run(self, stop: CancellationToken, done: CancellationToken) {
        let mut delay = self.pacing.idle;

        loop {
            let stopping = stop.is_cancelled();

            let pass_failed = if self.queue.is_empty() {
                if stopping {
                    break;
                }
                false
            } else {
                self.drain_pass(stopping).await
            };

            // Sleep between passes regardless of outcome to bound CPU usage
            // and the outgoing request rate. A clean pass resets the
            // interval; a failing pass escalates the next one.
            if pass_failed {
                time::sleep(delay).await;
                delay = self.pacing.next(delay);
            } else {
                delay = self.pacing.idle;
                time::sleep(delay).await;
            }
        }

        self.bus
            .publish(Event::new(EventKind::WorkerDrained).with_pending(self.queue.len()));
        done.cancel();
    }

    /// Drains the queue front-first until it is empty or the circuit
    /// breaker opens. Returns whether any delivery failed this pass.
    async fn drain_pass(&self, stopping: bool) -> bool {
        let mut failures: u32 = 0;
        let mut any_failed = false;

        while let Some(payload) = self.queue.pop_front() {
            let age = payload.age(self.clock.now());
            let outcome = self.transport.deliver(payload.url(), payload.body()).await;

            let delivered = matches!(&outcome, Ok(code) if *code < DELIVERED_BELOW);
            if delivered {
                failures = 0;
                let status = outcome.unwrap_or_default();
                self.bus.publish(
                    Event::new(EventKind::DeliverySucceeded)
                        .with_description(payload.description())
                        .with_status(status)
                        .with_delta(age),
                );
                continue;
            }

            any_failed = true;
            let failed = Event::new(EventKind::DeliveryFailed)
                .with_description(payload.description())
                .with_delta(age);
            let failed = match &outcome {
                Ok(code) => failed.with_status(*code),
                Err(err) => failed.with_error(err.to_string()),
            };
            self.bus.publish(failed);

            if stopping {
                // Best-effort only during shutdown: one failed attempt and
                // the payload is gone.
                self.bus.publish(
                    Event::new(EventKind::PayloadDropped).with_description(payload.description()),
                );
                continue;
            }

            self.queue.push_back(payload);
            failures += 1;
            if failures >= self.failure_threshold {
                self.bus
                    .publish(Event::new(EventKind::CircuitOpen).with_pending(self.queue.len()));
                break;
            }
        }

        any_failed
    }
}
