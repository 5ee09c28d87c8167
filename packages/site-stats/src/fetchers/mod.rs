//! Fetcher implementations.
//!
//! - `HttpFetcher` - reqwest-backed fetcher with manual and following clients
//! - `MockFetcher` - canned responses for tests (see [`crate::testing`])

mod http;

pub use http::{HttpFetcher, HttpFetcherFactory, DEFAULT_MAX_BODY_BYTES};

// Re-export from traits for convenience
pub use crate::traits::fetcher::{Fetcher, FetcherFactory, RedirectMode};
