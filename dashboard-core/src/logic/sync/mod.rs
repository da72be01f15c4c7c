//! Sync Module - Dashboard to Backend Communication
//!
//! This module handles:
//! - Transport abstraction over HTTP
//! - Per-attempt timeouts and retry with exponential backoff
//! - Per-endpoint call spacing
//! - Typed feed calls

pub mod client;
pub mod fetcher;
pub mod throttle;
pub mod transport;

#[cfg(test)]
pub(crate) mod scripted;

pub use client::ApiClient;
pub use fetcher::{decode_body, ResilientFetcher, RetryPolicy};
pub use throttle::EndpointThrottle;
pub use transport::{ApiRequest, HttpMethod, HttpTransport, RawResponse, Transport, TransportError};
