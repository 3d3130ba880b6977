//! # Delivery boundary: one abstract operation, one HTTP implementation.
//!
//! The worker only ever calls [`Transport::deliver`]: POST the payload body
//! to the payload URL and report the resulting status code, or a
//! [`TransportError`] when no status could be obtained at all. Judging the
//! status (success is anything below 400) is the worker's business, not the
//! transport's: a 500 is a *delivered request* with a failing outcome.
//!
//! [`HttpTransport`] is the production implementation on `reqwest`:
//! connection pooling, TLS and redirects come from the client; the body is
//! sent as `text/plain`, which is what the collector expects.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::error::TransportError;

/// Abstract delivery operation consumed by the worker.
///
/// Implementations must be cheap to call repeatedly and safe to share
/// behind an `Arc` across tasks. Test suites substitute scripted fakes.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Attempts one delivery; returns the HTTP status code, or an error if
    /// the request never produced one.
    async fn deliver(&self, url: &str, body: &str) -> Result<u16, TransportError>;
}

/// `reqwest`-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Builds a transport with the given per-request timeout.
    pub fn new(request_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn deliver(&self, url: &str, body: &str) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "text/plain")
            .body(body.to_owned())
            .send()
            .await?;
        Ok(response.status().as_u16())
    }
}
