//! Production HTTP client implementation using reqwest.

use std::path::PathBuf;
use std::time::Duration;

use super::{ClientBuildError, HttpClient, HttpError, HttpRequest, HttpResponse};

/// TLS settings applied when building a [`ReqwestClient`].
///
/// Verification is on by default. A custom PEM bundle adds a trust root on
/// top of the built-in roots; disabling verification is logged loudly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsOptions {
    /// Verify server certificates.
    pub verify: bool,
    /// Additional trust root (PEM).
    pub ca_file: Option<PathBuf>,
}

impl Default for TlsOptions {
    fn default() -> Self {
        Self {
            verify: true,
            ca_file: None,
        }
    }
}

/// Production HTTP client using reqwest.
///
/// A thin wrapper around `reqwest::Client`; clones share one connection pool,
/// so a single instance is built at startup and reused by every poll cycle.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    inner: reqwest::Client,
}

impl ReqwestClient {
    /// Creates an HTTP client from an existing reqwest client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { inner: client }
    }

    /// Builds a client honouring the given TLS options and request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] if the CA file cannot be read or parsed,
    /// or if reqwest rejects the configuration.
    pub fn with_tls(tls: &TlsOptions, timeout: Duration) -> Result<Self, ClientBuildError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout);

        if let Some(ref path) = tls.ca_file {
            let pem = std::fs::read(path).map_err(|source| ClientBuildError::CaRead {
                path: path.clone(),
                source,
            })?;
            let cert =
                reqwest::Certificate::from_pem(&pem).map_err(|source| ClientBuildError::CaParse {
                    path: path.clone(),
                    source,
                })?;
            tracing::info!("Using custom trust root: {}", path.display());
            builder = builder.add_root_certificate(cert);
        }

        if !tls.verify {
            tracing::warn!(
                "TLS certificate verification is DISABLED for upstream requests; \
                 responses can be forged by anyone on the network path"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
            .build()
            .map(Self::from_client)
            .map_err(ClientBuildError::Build)
    }
}

impl HttpClient for ReqwestClient {
    async fn request(&self, req: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut builder = self.inner.request(req.method, req.url.as_str());

        for (name, value) in &req.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout
            } else if e.is_builder() {
                HttpError::InvalidUrl(e.to_string())
            } else {
                HttpError::Connection(Box::new(e))
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HttpError::Timeout
                } else {
                    HttpError::Connection(Box::new(e))
                }
            })?
            .to_vec();

        Ok(HttpResponse::new(status, headers, body))
    }
}
