//! # Immutable delivery payloads and the encoders that produce them.
//!
//! A [`Payload`] is one encoded, self-contained unit of telemetry awaiting
//! delivery. Once created it is never mutated; only its position in the
//! queue and its delivery outcome change. The wall-clock timestamp is baked
//! into the body at encoding time for the same reason.
//!
//! Two encoders exist:
//! - [`encode_event`] — a named event (category/action/label/value) encoded
//!   as a measurement-protocol JSON body, POSTed to the event collector;
//! - [`encode_page_view`] — a page view encoded entirely in the URL query
//!   string (empty body), using the per-process [`PageSession`] state.
//!
//! ## Rules
//! - Encoding never fails the submitter: a non-numeric `value` simply omits
//!   the numeric field, and empty category/action/label are emitted as
//!   empty fields. The only failure modes are serialization/URL errors,
//!   which the dispatcher logs and drops.
//! - The numeric `value`, when present, always carries the fixed `USD`
//!   currency tag the collector expects.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use serde::Serialize;
use url::Url;

use crate::clock::Clock;
use crate::credentials::Credentials;

/// One encoded, immutable unit of telemetry awaiting delivery.
#[derive(Debug)]
pub struct Payload {
    created_at: Instant,
    url: String,
    body: String,
    description: String,
}

impl Payload {
    pub(crate) fn new(created_at: Instant, url: String, body: String, description: String) -> Self {
        Self {
            created_at,
            url,
            body,
            description,
        }
    }

    /// Monotonic instant at which this payload was encoded.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Full collector URL for this payload.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Encoded delivery content. Empty for page views.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Short human-readable label for diagnostics.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Time spent queued, measured against `now`.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }
}

#[derive(Serialize)]
struct EventBody<'a> {
    client_id: &'a str,
    timestamp_micros: i64,
    events: [EventEntry<'a>; 1],
}

#[derive(Serialize)]
struct EventEntry<'a> {
    name: &'a str,
    params: EventParams<'a>,
}

#[derive(Serialize)]
struct EventParams<'a> {
    items: [&'a str; 0],
    event_category: &'a str,
    event_label: &'a str,
    date_sec: String,
    date_min: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<&'static str>,
}

/// Encodes a named event into a deliverable payload.
///
/// Pure except for clock reads. `value` is interpreted as an integer when
/// possible; otherwise the numeric field (and its currency tag) is omitted
/// without error. Empty `category`/`action`/`label` are emitted as empty
/// fields.
pub fn encode_event(
    credentials: &Credentials,
    collect_base: &str,
    category: &str,
    action: &str,
    label: &str,
    value: &str,
    clock: &dyn Clock,
) -> Result<Payload, serde_json::Error> {
    let date_sec = clock.local_now().format("%Y%m%d%H%M%S").to_string();
    let date_min = date_sec[..date_sec.len().saturating_sub(2)].to_string();

    let numeric = value.parse::<i64>().ok();
    let body = EventBody {
        client_id: &credentials.client_id,
        timestamp_micros: clock.wall_micros(),
        events: [EventEntry {
            name: action,
            params: EventParams {
                items: [],
                event_category: category,
                event_label: label,
                date_sec,
                date_min,
                value: numeric,
                currency: numeric.map(|_| "USD"),
            },
        }],
    };

    Ok(Payload::new(
        clock.now(),
        credentials.collect_url(collect_base),
        serde_json::to_string(&body)?,
        format!("Event [c:{category} a:{action} l:{label} v:{value}]"),
    ))
}

/// Page-view session state, owned by the dispatcher.
///
/// The derived client id is computed once per process; the session id is
/// the wall millis of the first page view after (re)configuration; the
/// session count increments per configuration; the sequence number
/// increments per page view.
#[derive(Debug, Default)]
pub(crate) struct PageSession {
    client_id: String,
    session_id: String,
    session_count: u32,
    sequence: u64,
}

impl PageSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Marks the start of a new session: clears the session id and bumps
    /// the session count. Called on every (re)configuration.
    pub(crate) fn on_configure(&mut self) {
        self.session_id.clear();
        self.session_count += 1;
    }

    /// Advances the session for one page view: lazily fills the derived
    /// client id and session id, then increments the sequence number.
    pub(crate) fn begin_view(&mut self, credentials: &Credentials, wall_millis: i64) {
        if self.session_id.is_empty() {
            self.session_id = wall_millis.to_string();
        }
        if self.client_id.is_empty() {
            let mut hasher = DefaultHasher::new();
            credentials.client_id.hash(&mut hasher);
            credentials.app_secret.hash(&mut hasher);
            let digest = hasher.finish();
            self.client_id = format!("{digest}.{digest}");
        }
        self.sequence += 1;
    }

    pub(crate) fn sequence(&self) -> u64 {
        self.sequence
    }

    pub(crate) fn session_count(&self) -> u32 {
        self.session_count
    }
}

/// Encodes a page view into a deliverable payload.
///
/// Page views carry everything in the URL query string and an empty body.
/// Call [`PageSession::begin_view`] first; this function only reads the
/// session.
pub(crate) fn encode_page_view(
    credentials: &Credentials,
    page_base: &str,
    session: &PageSession,
    title: &str,
    location: &str,
    clock: &dyn Clock,
) -> Result<Payload, url::ParseError> {
    let now_millis = clock.wall_millis();
    let engagement_ms = session
        .session_id
        .parse::<i64>()
        .map(|start| (now_millis - start).max(0))
        .unwrap_or(0);

    let mut url = Url::parse(page_base)?;
    url.query_pairs_mut()
        .append_pair("v", "2")
        .append_pair("tid", &credentials.tracking_id)
        .append_pair("en", "page_view")
        .append_pair("_p", &now_millis.to_string())
        .append_pair("cid", &session.client_id)
        .append_pair("_s", &session.sequence().to_string())
        .append_pair("sid", &session.session_id)
        .append_pair("sct", &session.session_count().to_string())
        .append_pair("dt", title)
        .append_pair("dl", location)
        .append_pair("_et", &engagement_ms.to_string());

    Ok(Payload::new(
        clock.now(),
        url.into(),
        String::new(),
        format!("PageView [{title}]"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;

    struct FakeClock;

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            Instant::now()
        }
        fn wall_micros(&self) -> i64 {
            1_700_000_000_123_456
        }
        fn local_now(&self) -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2025, 3, 1)
                .expect("valid date")
                .and_hms_opt(12, 34, 56)
                .expect("valid time")
        }
    }

    fn creds() -> Credentials {
        Credentials::parse("GA4-123|client99|secretXYZ")
    }

    #[test]
    fn test_event_body_with_numeric_value() {
        let payload = encode_event(&creds(), "https://c.test/mp/collect", "cat", "act", "lab", "42", &FakeClock)
            .expect("encodes");

        let v: serde_json::Value = serde_json::from_str(payload.body()).expect("valid json");
        assert_eq!(v["client_id"], "client99");
        assert_eq!(v["timestamp_micros"], 1_700_000_000_123_456i64);
        assert_eq!(v["events"][0]["name"], "act");

        let params = &v["events"][0]["params"];
        assert_eq!(params["items"], serde_json::json!([]));
        assert_eq!(params["event_category"], "cat");
        assert_eq!(params["event_label"], "lab");
        assert_eq!(params["date_sec"], "20250301123456");
        assert_eq!(params["date_min"], "202503011234");
        assert_eq!(params["value"], 42);
        assert_eq!(params["currency"], "USD");
    }

    #[test]
    fn test_event_body_non_numeric_value_omits_field() {
        let payload = encode_event(&creds(), "https://c.test/mp/collect", "cat", "act", "lab", "n/a", &FakeClock)
            .expect("encodes");

        let v: serde_json::Value = serde_json::from_str(payload.body()).expect("valid json");
        let params = &v["events"][0]["params"];
        assert!(params.get("value").is_none());
        assert!(params.get("currency").is_none());
    }

    #[test]
    fn test_event_tolerates_empty_fields() {
        let payload = encode_event(&creds(), "https://c.test/mp/collect", "", "", "", "", &FakeClock)
            .expect("encodes");

        let v: serde_json::Value = serde_json::from_str(payload.body()).expect("valid json");
        assert_eq!(v["events"][0]["name"], "");
        assert_eq!(v["events"][0]["params"]["event_category"], "");
        assert_eq!(payload.description(), "Event [c: a: l: v:]");
    }

    #[test]
    fn test_event_url_and_description() {
        let payload = encode_event(&creds(), "https://c.test/mp/collect", "cat", "act", "lab", "7", &FakeClock)
            .expect("encodes");
        assert_eq!(
            payload.url(),
            "https://c.test/mp/collect?api_secret=secretXYZ&measurement_id=GA4-123"
        );
        assert_eq!(payload.description(), "Event [c:cat a:act l:lab v:7]");
    }

    #[test]
    fn test_page_view_url_params_and_empty_body() {
        let creds = creds();
        let mut session = PageSession::new();
        session.on_configure();
        session.begin_view(&creds, FakeClock.wall_millis());

        let payload = encode_page_view(&creds, "https://c.test/g/collect", &session, "Home Page", "app://main", &FakeClock)
            .expect("encodes");
        assert!(payload.body().is_empty());
        assert_eq!(payload.description(), "PageView [Home Page]");

        let url = Url::parse(payload.url()).expect("valid url");
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["v"], "2");
        assert_eq!(pairs["tid"], "GA4-123");
        assert_eq!(pairs["en"], "page_view");
        assert_eq!(pairs["_s"], "1");
        assert_eq!(pairs["sct"], "1");
        assert_eq!(pairs["sid"], FakeClock.wall_millis().to_string());
        assert_eq!(pairs["dt"], "Home Page");
        assert_eq!(pairs["dl"], "app://main");
        assert_eq!(pairs["_et"], "0");
    }

    #[test]
    fn test_page_view_sequence_increments() {
        let creds = creds();
        let mut session = PageSession::new();
        session.on_configure();

        session.begin_view(&creds, 1000);
        assert_eq!(session.sequence(), 1);
        session.begin_view(&creds, 2000);
        assert_eq!(session.sequence(), 2);

        // Session id is pinned by the first view; a reconfigure resets it.
        session.on_configure();
        assert_eq!(session.session_count(), 2);
        session.begin_view(&creds, 3000);
        let payload = encode_page_view(&creds, "https://c.test/g/collect", &session, "t", "l", &FakeClock)
            .expect("encodes");
        let url = Url::parse(payload.url()).expect("valid url");
        let pairs: HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["sid"], "3000");
        assert_eq!(pairs["_s"], "3");
    }

    #[test]
    fn test_payload_age_saturates() {
        let now = Instant::now();
        let payload = Payload::new(now, String::new(), String::new(), String::new());
        assert_eq!(payload.age(now), Duration::ZERO);
    }
}
