//! Upstream status endpoint access.
//!
//! This module provides:
//! - The transport security policy for the endpoint URL ([`check_scheme`])
//! - The fetch abstraction used by the engine ([`PayloadFetcher`])
//! - The production HTTP implementation ([`UpstreamFetcher`])

mod fetcher;
mod policy;

pub use fetcher::{FetchError, PayloadFetcher, UpstreamFetcher};
pub use policy::{SchemeCheck, SecurityPolicyViolation, check_scheme};
