//! # Dispatch target identity parsed from a configuration string.
//!
//! The collector credentials arrive as a single setting in the form
//! `"<tracking-id>|<client-id>|<app-secret>"`. Parsing is deliberately
//! forgiving: every character outside `[A-Za-z0-9|-]` is stripped silently,
//! and missing fields become empty strings. A credentials value with an
//! empty tracking id is "unconfigured": submissions are ignored until a
//! valid id is supplied.
//!
//! [`Credentials`] is an immutable value object. Reconfiguration swaps the
//! whole value atomically rather than mutating fields in place, so readers
//! never observe a half-updated identity.

use url::Url;

/// Identity of the collection endpoint: tracking id, client id, app secret.
///
/// Immutable once parsed; the dispatcher replaces the whole value on
/// reconfiguration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Measurement/tracking id (`measurement_id` query parameter).
    pub tracking_id: String,
    /// Client id reported in event bodies.
    pub client_id: String,
    /// API secret (`api_secret` query parameter).
    pub app_secret: String,
}

impl Credentials {
    /// Parses a raw configuration string.
    ///
    /// Characters outside `[A-Za-z0-9|-]` are discarded, then the remainder
    /// is split on `|` into up to three fields. Missing fields are empty.
    /// Never fails: hopeless input degrades to an unconfigured value.
    pub fn parse(raw: &str) -> Self {
        let sanitized: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '|' || *c == '-')
            .collect();

        let mut fields = sanitized.split('|');
        let tracking_id = fields.next().unwrap_or_default().to_string();
        let client_id = fields.next().unwrap_or_default().to_string();
        let app_secret = fields.next().unwrap_or_default().to_string();

        Self {
            tracking_id,
            client_id,
            app_secret,
        }
    }

    /// Returns true when a non-empty tracking id is present.
    pub fn is_configured(&self) -> bool {
        !self.tracking_id.is_empty()
    }

    /// Builds the event-collector URL for these credentials.
    ///
    /// The query-parameter names `api_secret` and `measurement_id` are a
    /// wire-compatibility requirement of the collector.
    pub fn collect_url(&self, base: &str) -> String {
        match Url::parse(base) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("api_secret", &self.app_secret)
                    .append_pair("measurement_id", &self.tracking_id);
                url.into()
            }
            // Unparsable base: fall back to naive assembly. Credential
            // fields are already restricted to URL-safe characters.
            Err(_) => format!(
                "{base}?api_secret={}&measurement_id={}",
                self.app_secret, self.tracking_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_triple() {
        let creds = Credentials::parse("GA4-123|client99|secretXYZ");
        assert_eq!(creds.tracking_id, "GA4-123");
        assert_eq!(creds.client_id, "client99");
        assert_eq!(creds.app_secret, "secretXYZ");
        assert!(creds.is_configured());
    }

    #[test]
    fn test_parse_strips_disallowed_characters() {
        let creds = Credentials::parse("bad id!!");
        assert_eq!(creds.tracking_id, "badid");
        assert_eq!(creds.client_id, "");
        assert_eq!(creds.app_secret, "");
        assert!(creds.is_configured());
    }

    #[test]
    fn test_parse_partial_fields() {
        let creds = Credentials::parse("GA4-123|client99");
        assert_eq!(creds.tracking_id, "GA4-123");
        assert_eq!(creds.client_id, "client99");
        assert_eq!(creds.app_secret, "");
    }

    #[test]
    fn test_parse_empty_is_unconfigured() {
        let creds = Credentials::parse("");
        assert!(!creds.is_configured());

        let creds = Credentials::parse("!!! ???");
        assert!(!creds.is_configured());
    }

    #[test]
    fn test_collect_url_query_parameters() {
        let creds = Credentials::parse("GA4-123|client99|secretXYZ");
        let url = creds.collect_url("https://collector.example/mp/collect");
        assert_eq!(
            url,
            "https://collector.example/mp/collect?api_secret=secretXYZ&measurement_id=GA4-123"
        );
    }

    #[test]
    fn test_collect_url_unparsable_base_falls_back() {
        let creds = Credentials::parse("id|c|s");
        let url = creds.collect_url("not a url");
        assert_eq!(url, "not a url?api_secret=s&measurement_id=id");
    }
}
