//! Transport security policy for the upstream endpoint.

use thiserror::Error;
use url::Url;

/// The endpoint URL is not allowed by the transport policy.
///
/// Polling is disabled while this holds; the rest of the process keeps
/// running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Refusing to poll '{url}': {reason}")]
pub struct SecurityPolicyViolation {
    /// The rejected URL.
    pub url: String,
    /// Why it was rejected.
    pub reason: &'static str,
}

/// Outcome of a passing scheme check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeCheck {
    /// `https`.
    Secure,
    /// Plain `http`, permitted by explicit override. Callers log this as a
    /// degraded-security condition.
    InsecureAllowed,
}

/// Checks the endpoint scheme.
///
/// `https` always passes. `http` passes only with `allow_insecure_http`.
/// Every other scheme is rejected.
///
/// # Errors
///
/// Returns [`SecurityPolicyViolation`] when the scheme is not permitted.
pub fn check_scheme(
    url: &Url,
    allow_insecure_http: bool,
) -> Result<SchemeCheck, SecurityPolicyViolation> {
    match url.scheme() {
        "https" => Ok(SchemeCheck::Secure),
        "http" if allow_insecure_http => Ok(SchemeCheck::InsecureAllowed),
        "http" => Err(SecurityPolicyViolation {
            url: url.to_string(),
            reason: "plain HTTP requires allow_insecure_http",
        }),
        _ => Err(SecurityPolicyViolation {
            url: url.to_string(),
            reason: "only http(s) endpoints are supported",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn https_is_secure() {
        assert_eq!(
            check_scheme(&url("https://api.example.com/pob_goods"), false),
            Ok(SchemeCheck::Secure)
        );
    }

    #[test]
    fn http_rejected_without_override() {
        let err = check_scheme(&url("http://api.example.com/"), false).unwrap_err();

        assert!(err.to_string().contains("allow_insecure_http"));
        assert!(err.to_string().contains("http://api.example.com/"));
    }

    #[test]
    fn http_allowed_with_override_is_flagged() {
        assert_eq!(
            check_scheme(&url("http://api.example.com/"), true),
            Ok(SchemeCheck::InsecureAllowed)
        );
    }

    #[test]
    fn other_schemes_rejected_even_with_override() {
        assert!(check_scheme(&url("ftp://api.example.com/"), true).is_err());
        assert!(check_scheme(&url("file:///tmp/data.json"), true).is_err());
    }
}
