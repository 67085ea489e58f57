//! Error types for HTTP operations.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for a single HTTP exchange.
///
/// Describes what went wrong without dictating recovery strategy.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed (DNS, refused, TLS handshake, reset).
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server did not respond within the client's timeout.
    #[error("Request timed out")]
    Timeout,

    /// The request could not be built from the given URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Error raised while constructing a [`super::ReqwestClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// The custom trust root file could not be read.
    #[error("Failed to read CA file '{}': {source}", path.display())]
    CaRead {
        /// Path to the PEM bundle
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The custom trust root file is not a valid PEM certificate.
    #[error("Invalid CA certificate '{}': {source}", path.display())]
    CaParse {
        /// Path to the PEM bundle
        path: PathBuf,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },

    /// reqwest refused the builder configuration.
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}
