//! Fetcher trait for pluggable HTTP access.
//!
//! Row workers never talk to `reqwest` directly. They receive a [`Fetcher`]
//! from a [`FetcherFactory`], one per row, so each row runs in its own
//! session and tests can substitute canned responses.
//!
//! # Usage
//!
//! ```rust,ignore
//! use site_stats::traits::fetcher::{Fetcher, FetcherFactory, RedirectMode};
//!
//! let fetcher = factory.create()?;
//! let page = fetcher.fetch("http://example.com", RedirectMode::Manual).await?;
//! if page.is_redirect() {
//!     println!("redirects to {:?}", page.location());
//! }
//! ```

use async_trait::async_trait;

use crate::error::FetchResult;
use crate::types::page::FetchedPage;

/// How a fetch treats 3xx responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RedirectMode {
    /// Return 3xx responses as-is so the caller can inspect `Location`.
    Manual,

    /// Follow redirects transparently.
    Follow,
}

/// A single GET with a bounded timeout.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, reading the whole body.
    ///
    /// Network-level failures (DNS, refused connection, timeout) are
    /// errors. HTTP error statuses are not: the page is returned with its
    /// status and body.
    async fn fetch(&self, url: &str, mode: RedirectMode) -> FetchResult<FetchedPage>;

    /// Get the fetcher name (for logging/debugging).
    fn name(&self) -> &str {
        "unknown"
    }
}

/// Produces an independent fetcher for each row task.
pub trait FetcherFactory: Send + Sync {
    type Fetcher: Fetcher + 'static;

    /// Create a fresh fetcher. A failure here is recorded on the row.
    fn create(&self) -> FetchResult<Self::Fetcher>;
}
