//! Outbound HTTP plumbing shared by the upstream fetcher and alert delivery.
//!
//! This module provides:
//! - Request/response value types ([`HttpRequest`], [`HttpResponse`])
//! - The client abstraction used for dependency injection ([`HttpClient`])
//! - The production client with TLS policy support ([`ReqwestClient`], [`TlsOptions`])

mod client;
mod error;
mod request;


pub use client::{ReqwestClient, TlsOptions};
pub use error::{ClientBuildError, HttpError};
pub use request::{HttpClient, HttpRequest, HttpResponse};
