//! HTTP request/response types and client trait.

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue, InvalidHeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::HttpError;

fn application_json() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

/// An HTTP request to be sent.
///
/// Both ends of basewatch speak JSON: the upstream status feed is fetched
/// with [`HttpRequest::get_json`] and alerts are posted with
/// [`HttpRequest::with_json`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method
    pub method: http::Method,
    /// Target URL
    pub url: url::Url,
    /// HTTP headers to send
    pub headers: http::HeaderMap,
    /// Optional request body
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: http::Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: http::HeaderMap::new(),
            body: None,
        }
    }

    /// Creates a GET request that asks for a JSON response.
    #[must_use]
    pub fn get_json(url: url::Url) -> Self {
        Self::new(http::Method::GET, url).with_header(ACCEPT, application_json())
    }

    /// Creates a POST request to the given URL.
    #[must_use]
    pub fn post(url: url::Url) -> Self {
        Self::new(http::Method::POST, url)
    }

    /// Serializes `body` as the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns the serialization error, if any.
    pub fn with_json<T>(mut self, body: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers.insert(CONTENT_TYPE, application_json());
        Ok(self)
    }

    /// Sets an `Authorization: <scheme> <credentials>` header.
    ///
    /// The value is marked sensitive so it never shows up in debug output.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials contain characters not allowed in
    /// a header value.
    pub fn with_authorization(
        mut self,
        scheme: &str,
        credentials: &str,
    ) -> Result<Self, InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&format!("{scheme} {credentials}"))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    /// Adds a header to the request.
    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }
}

/// An HTTP response with a fully buffered body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: http::StatusCode,
    /// Response headers
    pub headers: http::HeaderMap,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a new HTTP response.
    #[must_use]
    pub const fn new(status: http::StatusCode, headers: http::HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Creates a response with the given status, no headers and a body.
    #[must_use]
    pub fn with_status(status: http::StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self::new(status, http::HeaderMap::new(), body.into())
    }

    /// Returns true if the status code indicates success (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parses the body as JSON, whatever the declared content type.
    ///
    /// # Errors
    ///
    /// Returns the parse error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Returns the body as a UTF-8 string, if valid.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Trait for making HTTP requests.
///
/// Both the upstream fetcher and the channel sender are generic over this
/// trait, so tests can swap in scripted clients.
pub trait HttpClient: Send + Sync {
    /// Sends an HTTP request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] when:
    /// - Network connection fails ([`HttpError::Connection`])
    /// - Request times out ([`HttpError::Timeout`])
    /// - URL is invalid ([`HttpError::InvalidUrl`])
    fn request(
        &self,
        req: HttpRequest,
    ) -> impl std::future::Future<Output = Result<HttpResponse, HttpError>> + Send;
}
