//! # Time sources for queue-age measurement and payload timestamping.
//!
//! [`Clock`] is the single seam through which the dispatcher reads time:
//! - a **monotonic** instant for measuring how long a payload sat in the
//!   queue (never jumps backwards, unaffected by NTP);
//! - **wall-clock** microseconds for the `timestamp_micros` body field;
//! - the **local** date-time for the `date_sec`/`date_min` body fields.
//!
//! Production code uses [`SystemClock`]; tests substitute a fixed fake so
//! encoded bodies are deterministic.

use std::time::Instant;

use chrono::{Local, NaiveDateTime, Utc};

/// Time source consumed by the encoder and the delivery worker.
pub trait Clock: Send + Sync + 'static {
    /// Returns a monotonic instant, used for queue-age diagnostics.
    fn now(&self) -> Instant;

    /// Returns wall-clock microseconds since the Unix epoch.
    fn wall_micros(&self) -> i64;

    /// Returns wall-clock milliseconds since the Unix epoch.
    fn wall_millis(&self) -> i64 {
        self.wall_micros() / 1000
    }

    /// Returns the current local date-time, used for the human-oriented
    /// date fields in event bodies.
    fn local_now(&self) -> NaiveDateTime;
}

/// System-backed [`Clock`]: `Instant::now` plus chrono's wall clocks.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_micros(&self) -> i64 {
        Utc::now().timestamp_micros()
    }

    fn local_now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
