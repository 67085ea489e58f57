//! Fetching and parsing the upstream payload.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use url::Url;

use super::{SchemeCheck, SecurityPolicyViolation, check_scheme};
use crate::http::{HttpClient, HttpError, HttpRequest};

/// Error type for one upstream fetch.
///
/// Every variant is non-fatal: the caller keeps its previous snapshot and
/// the next scheduled tick is the retry.
#[derive(Debug, Error)]
pub enum FetchError {
    /// No complete response within the configured timeout.
    #[error("Upstream request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The endpoint answered with a non-2xx status.
    #[error("Upstream returned HTTP {0}")]
    BadStatus(http::StatusCode),

    /// The body is not valid JSON.
    #[error("Upstream body is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Transport failure (DNS, connect, TLS, reset).
    #[error("Upstream request failed: {0}")]
    Network(#[source] HttpError),

    /// The endpoint URL violates the transport policy.
    #[error(transparent)]
    Policy(#[from] SecurityPolicyViolation),
}

/// Source of upstream payloads.
///
/// The engine is generic over this trait so cycles can be driven by
/// scripted payloads in tests.
pub trait PayloadFetcher: Send + Sync {
    /// The endpoint being polled (for logs and status).
    fn endpoint(&self) -> &Url;

    /// Checks the endpoint against the transport policy without any I/O.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityPolicyViolation`] if polling must not happen.
    fn check_policy(&self) -> Result<(), SecurityPolicyViolation>;

    /// Performs one bounded GET and parses the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on policy, transport, status, timeout or parse
    /// failure. Implementations never retry.
    fn fetch(&self) -> impl std::future::Future<Output = Result<Value, FetchError>> + Send;
}

/// HTTP implementation of [`PayloadFetcher`].
#[derive(Debug, Clone)]
pub struct UpstreamFetcher<H> {
    client: H,
    url: Url,
    timeout: Duration,
    allow_insecure_http: bool,
}

impl<H: HttpClient> UpstreamFetcher<H> {
    /// Creates a fetcher for the given endpoint.
    #[must_use]
    pub const fn new(client: H, url: Url, timeout: Duration) -> Self {
        Self {
            client,
            url,
            timeout,
            allow_insecure_http: false,
        }
    }

    /// Permits plain `http` endpoints (logged as degraded security).
    #[must_use]
    pub const fn with_allow_insecure_http(mut self, allow: bool) -> Self {
        self.allow_insecure_http = allow;
        self
    }
}

impl<H: HttpClient> PayloadFetcher for UpstreamFetcher<H> {
    fn endpoint(&self) -> &Url {
        &self.url
    }

    fn check_policy(&self) -> Result<(), SecurityPolicyViolation> {
        check_scheme(&self.url, self.allow_insecure_http).map(|_| ())
    }

    async fn fetch(&self) -> Result<Value, FetchError> {
        if check_scheme(&self.url, self.allow_insecure_http)? == SchemeCheck::InsecureAllowed {
            tracing::warn!(
                "Degraded security: fetching {} over plain HTTP (allow_insecure_http is set)",
                self.url
            );
        }

        let request = HttpRequest::get_json(self.url.clone());

        let response = match tokio::time::timeout(self.timeout, self.client.request(request)).await
        {
            Err(_) | Ok(Err(HttpError::Timeout)) => {
                return Err(FetchError::Timeout(self.timeout));
            }
            Ok(Err(e)) => return Err(FetchError::Network(e)),
            Ok(Ok(response)) => response,
        };

        if !response.is_success() {
            return Err(FetchError::BadStatus(response.status));
        }

        response.json().map_err(FetchError::Malformed)
    }
}

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;
