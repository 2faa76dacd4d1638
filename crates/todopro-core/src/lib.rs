//! # todopro-core
//!
//! Shared plumbing for the `TodoPro` client crates:
//!
//! - **HTTP client seam**: [`ApiClient`] trait with a `reqwest`-backed
//!   implementation ([`ReqwestApiClient`]) that resolves paths against a base
//!   URL and attaches a bearer token from a [`BearerSource`]
//! - **Errors**: [`ApiError`] taxonomy with server `detail` extraction
//! - **Logging**: [`logging::init_subscriber`] for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod http;
pub mod logging;

pub use client::{ApiClient, ApiRequest, BearerSource, Method};
pub use errors::ApiError;
pub use http::ReqwestApiClient;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
