//! # Dispatcher: facade owning the worker lifecycle.
//!
//! The [`Dispatcher`] owns the queue, the credentials, the diagnostics bus
//! and the single background worker. Callers interact with it from any
//! task; nothing here ever blocks on network I/O.
//!
//! ## High-level wiring
//! ```text
//! caller ── configure(raw) ──► Credentials::parse ──► atomic swap
//! caller ── submit_event ──┬─► gate: tracking id configured?
//!                          ├─► start worker (lazy, idempotent)
//!                          ├─► encode_event ──► queue.push_front
//!                          └─► Bus: PayloadQueued
//!
//! worker task ── drains queue ──► Transport::deliver ──► Bus events
//! log listener ── Bus ──► tracing records
//!
//! stop():
//!   stop.cancel() ──► worker observes at next pass boundary
//!   wait done (≤ drain_timeout) ──► wait join (≤ join_timeout, then abort)
//!   both waits always run; the first timeout observed is returned as an
//!   error value after shutdown has completed anyway
//! ```
//!
//! ## Rules
//! - Submissions with no configured tracking id are ignored (logged).
//! - Encoding failures drop the event with a diagnostic; submitters never
//!   see an error.
//! - `stop()` is terminal: the dispatcher does not restart after it.
//! - `stop()` is safe to call when the worker never started, and safe to
//!   call more than once.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::task::JoinHandle;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::DispatcherConfig;
use crate::core::worker::DispatchWorker;
use crate::credentials::Credentials;
use crate::error::{DispatchError, TransportError};
use crate::events::{log::log_event, Bus, Event, EventKind};
use crate::payload::{encode_event, encode_page_view, PageSession, Payload};
use crate::queue::EventQueue;
use crate::transport::{HttpTransport, Transport};

/// Facade over the telemetry pipeline: submission, lazy worker start,
/// graceful stop.
pub struct Dispatcher {
    cfg: DispatcherConfig,
    queue: Arc<EventQueue>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    bus: Bus,
    credentials: RwLock<Arc<Credentials>>,
    session: Mutex<PageSession>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stop: CancellationToken,
    done: CancellationToken,
}

impl Dispatcher {
    /// Creates a dispatcher with the production HTTP transport and system
    /// clock. Fails only if the HTTP client cannot be constructed.
    pub fn new(cfg: DispatcherConfig) -> Result<Self, TransportError> {
        let transport = Arc::new(HttpTransport::new(cfg.request_timeout)?);
        Ok(Self::with_parts(cfg, transport, Arc::new(SystemClock)))
    }

    /// Creates a dispatcher with injected transport and clock.
    pub fn with_parts(
        cfg: DispatcherConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Self {
            cfg,
            queue: Arc::new(EventQueue::new()),
            transport,
            clock,
            bus,
            credentials: RwLock::new(Arc::new(Credentials::default())),
            session: Mutex::new(PageSession::new()),
            worker: Mutex::new(None),
            stop: CancellationToken::new(),
            done: CancellationToken::new(),
        }
    }

    /// Parses and stores new collector credentials, replacing the previous
    /// value atomically, and begins a new page-view session.
    ///
    /// Malformed input degrades to an empty tracking id; subsequent
    /// submissions then no-op with a diagnostic.
    pub fn configure(&self, raw: &str) {
        let creds = Credentials::parse(raw);
        if creds.is_configured() {
            debug!(
                tracking_id = %creds.tracking_id,
                client_id = %creds.client_id,
                "credentials configured"
            );
        } else {
            warn!("credentials empty after sanitizing; submissions will be ignored");
        }

        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(creds);

        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .on_configure();
    }

    /// Returns the currently configured credentials.
    pub fn credentials(&self) -> Arc<Credentials> {
        Arc::clone(
            &self
                .credentials
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Encodes a named event and queues it for delivery.
    ///
    /// Fire-and-forget: returns immediately after enqueueing, never blocks
    /// on network I/O. `value` is interpreted as an integer when possible.
    /// No-ops (with a diagnostic) until a tracking id is configured.
    ///
    /// Must be called within a Tokio runtime (the worker is started lazily
    /// on first use).
    pub fn submit_event(&self, category: &str, action: &str, label: &str, value: &str) {
        let creds = self.credentials();
        if !creds.is_configured() {
            debug!("event ignored: no tracking id configured");
            return;
        }
        if self.stop.is_cancelled() {
            debug!("event ignored: dispatcher stopped");
            return;
        }
        self.start();

        match encode_event(
            &creds,
            &self.cfg.collect_url,
            category,
            action,
            label,
            value,
            self.clock.as_ref(),
        ) {
            Ok(payload) => self.enqueue(payload),
            Err(err) => debug!(error = %err, "event encoding failed; event dropped"),
        }
    }

    /// Encodes a page view against the current session and queues it.
    ///
    /// Same gating and lazy start as [`submit_event`](Self::submit_event).
    pub fn submit_page_view(&self, title: &str, location: &str) {
        let creds = self.credentials();
        if !creds.is_configured() {
            debug!("page view ignored: no tracking id configured");
            return;
        }
        if self.stop.is_cancelled() {
            debug!("page view ignored: dispatcher stopped");
            return;
        }
        self.start();

        let encoded = {
            let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
            session.begin_view(&creds, self.clock.wall_millis());
            encode_page_view(
                &creds,
                &self.cfg.page_view_url,
                &session,
                title,
                location,
                self.clock.as_ref(),
            )
        };
        match encoded {
            Ok(payload) => self.enqueue(payload),
            Err(err) => debug!(error = %err, "page view encoding failed; dropped"),
        }
    }

    /// Launches the worker if not already running. Idempotent; a no-op
    /// after `stop()`.
    pub fn start(&self) {
        let mut guard = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() || self.stop.is_cancelled() {
            return;
        }

        self.spawn_log_listener();
        let worker = DispatchWorker {
            queue: Arc::clone(&self.queue),
            transport: Arc::clone(&self.transport),
            clock: Arc::clone(&self.clock),
            bus: self.bus.clone(),
            failure_threshold: self.cfg.failure_threshold_clamped(),
            pacing: self.cfg.pacing,
        };
        *guard = Some(tokio::spawn(worker.run(self.stop.clone(), self.done.clone())));
    }

    /// Requests graceful shutdown and waits, bounded, for it to complete.
    ///
    /// Two sequential waits: up to `drain_timeout` for the worker to flush
    /// the queue (failures are dropped rather than requeued during this
    /// window), then up to `join_timeout` for the worker task to finish,
    /// past which it is aborted. Shutdown proceeds past either timeout; the
    /// first one observed is returned as an error value callers may ignore.
    pub async fn stop(&self) -> Result<(), DispatchError> {
        self.stop.cancel();
        self.bus
            .publish(Event::new(EventKind::StopRequested).with_pending(self.queue.len()));

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(mut handle) = handle else {
            // Never started (or already stopped): nothing to drain.
            self.done.cancel();
            return Ok(());
        };

        let drained = time::timeout(self.cfg.drain_timeout, self.done.cancelled())
            .await
            .is_ok();

        let joined = time::timeout(self.cfg.join_timeout, &mut handle).await.is_ok();
        if !joined {
            handle.abort();
        }

        if !drained {
            return Err(DispatchError::DrainTimeout {
                waited: self.cfg.drain_timeout,
                pending: self.queue.len(),
            });
        }
        if !joined {
            return Err(DispatchError::JoinTimeout {
                waited: self.cfg.join_timeout,
            });
        }
        Ok(())
    }

    /// Number of payloads currently awaiting delivery.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// True while the worker task is running.
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Subscribes to dispatch lifecycle events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    fn enqueue(&self, payload: Payload) {
        let description = payload.description().to_string();
        self.queue.push_front(payload);
        self.bus.publish(
            Event::new(EventKind::PayloadQueued)
                .with_description(description)
                .with_pending(self.queue.len()),
        );
    }

    /// Forwards bus events to `tracing` until the bus closes.
    fn spawn_log_listener(&self) {
        let mut rx = self.bus.subscribe();
        tokio::spawn(async move {
            while let Ok(ev) = rx.recv().await {
                log_event(&ev);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedTransport {
        script: StdMutex<VecDeque<Result<u16, String>>>,
        deliveries: StdMutex<Vec<(String, String)>>,
    }

    impl ScriptedTransport {
        fn arc_with_script(outcomes: Vec<Result<u16, String>>) -> Arc<Self> {
            Arc::new(Self {
                script: StdMutex::new(outcomes.into()),
                deliveries: StdMutex::new(Vec::new()),
            })
        }

        fn deliveries(&self) -> Vec<(String, String)> {
            self.deliveries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn deliver(&self, url: &str, body: &str) -> Result<u16, TransportError> {
            self.deliveries
                .lock()
                .unwrap()
                .push((url.to_string(), body.to_string()));
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(code)) => Ok(code),
                Some(Err(msg)) => Err(TransportError::new(msg)),
                None => Ok(204),
            }
        }
    }

    /// A transport whose requests never complete.
    struct StuckTransport;

    #[async_trait]
    impl Transport for StuckTransport {
        async fn deliver(&self, _url: &str, _body: &str) -> Result<u16, TransportError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    fn dispatcher_with(transport: Arc<dyn Transport>) -> Dispatcher {
        Dispatcher::with_parts(
            DispatcherConfig::default(),
            transport,
            Arc::new(SystemClock),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_before_configure_is_noop() {
        let transport = ScriptedTransport::arc_with_script(vec![]);
        let dispatcher = dispatcher_with(transport.clone());

        dispatcher.submit_event("cat", "act", "lab", "1");
        assert_eq!(dispatcher.pending(), 0);
        assert!(!dispatcher.is_running());
        assert!(transport.deliveries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_starts_worker_and_delivers() {
        let transport = ScriptedTransport::arc_with_script(vec![]);
        let dispatcher = dispatcher_with(transport.clone());

        dispatcher.configure("GA4-123|client99|secretXYZ");
        dispatcher.submit_event("app", "start", "cold", "42");
        assert!(dispatcher.is_running());

        time::sleep(Duration::from_millis(500)).await;
        let deliveries = transport.deliveries();
        assert_eq!(deliveries.len(), 1);

        let (url, body) = &deliveries[0];
        assert!(url.contains("api_secret=secretXYZ"));
        assert!(url.contains("measurement_id=GA4-123"));
        let v: serde_json::Value = serde_json::from_str(body).expect("valid json");
        assert_eq!(v["client_id"], "client99");
        assert_eq!(v["events"][0]["params"]["value"], 42);
        assert_eq!(v["events"][0]["params"]["currency"], "USD");

        assert_eq!(dispatcher.pending(), 0);
        assert!(dispatcher.stop().await.is_ok());
        assert!(!dispatcher.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_drops_failing_payloads_and_returns_ok() {
        // Every delivery fails; stop() must still empty the queue by
        // dropping and return cleanly.
        let transport = ScriptedTransport::arc_with_script(vec![
            Err("down".into()),
            Err("down".into()),
            Err("down".into()),
            Err("down".into()),
            Err("down".into()),
            Err("down".into()),
        ]);
        let dispatcher = dispatcher_with(transport.clone());

        dispatcher.configure("GA4-123|client99|secretXYZ");
        dispatcher.submit_event("a", "b", "", "");
        dispatcher.submit_event("c", "d", "", "");

        assert!(dispatcher.stop().await.is_ok());
        assert_eq!(dispatcher.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_without_start_is_ok() {
        let transport = ScriptedTransport::arc_with_script(vec![]);
        let dispatcher = dispatcher_with(transport);
        assert!(dispatcher.stop().await.is_ok());
        // Idempotent.
        assert!(dispatcher.stop().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_after_stop_is_ignored() {
        let transport = ScriptedTransport::arc_with_script(vec![]);
        let dispatcher = dispatcher_with(transport.clone());

        dispatcher.configure("GA4-123|client99|secretXYZ");
        assert!(dispatcher.stop().await.is_ok());

        dispatcher.submit_event("a", "b", "", "");
        assert_eq!(dispatcher.pending(), 0);
        assert!(!dispatcher.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_reports_drain_timeout_when_transport_hangs() {
        let dispatcher = dispatcher_with(Arc::new(StuckTransport));

        dispatcher.configure("GA4-123|client99|secretXYZ");
        dispatcher.submit_event("a", "b", "", "");

        let err = dispatcher.stop().await.expect_err("drain cannot finish");
        assert!(matches!(err, DispatchError::DrainTimeout { .. }));
        assert!(!dispatcher.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_views_carry_incrementing_sequence() {
        let transport = ScriptedTransport::arc_with_script(vec![]);
        let dispatcher = dispatcher_with(transport.clone());

        dispatcher.configure("GA4-123|client99|secretXYZ");
        dispatcher.submit_page_view("Home", "app://main");
        dispatcher.submit_page_view("Settings", "app://settings");

        time::sleep(Duration::from_millis(500)).await;
        let deliveries = transport.deliveries();
        assert_eq!(deliveries.len(), 2);

        // Fresh submissions are delivered most-recent-first.
        let (settings_url, settings_body) = &deliveries[0];
        let (home_url, home_body) = &deliveries[1];
        assert!(settings_body.is_empty());
        assert!(home_body.is_empty());
        assert!(settings_url.contains("en=page_view"));
        assert!(settings_url.contains("_s=2"));
        assert!(home_url.contains("_s=1"));

        assert!(dispatcher.stop().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_swaps_credentials_atomically() {
        let transport = ScriptedTransport::arc_with_script(vec![]);
        let dispatcher = dispatcher_with(transport);

        dispatcher.configure("GA4-123|client99|secretXYZ");
        assert_eq!(dispatcher.credentials().tracking_id, "GA4-123");

        dispatcher.configure("GA4-456|other|s2");
        let creds = dispatcher.credentials();
        assert_eq!(creds.tracking_id, "GA4-456");
        assert_eq!(creds.client_id, "other");
        assert_eq!(creds.app_secret, "s2");

        // Degraded reconfigure gates submissions again.
        dispatcher.configure("!!!");
        dispatcher.submit_event("a", "b", "", "");
        assert_eq!(dispatcher.pending(), 0);
    }
}
