//! Testing utilities including mock implementations.
//!
//! These are useful for exercising the pipeline without making real
//! network calls or touching the filesystem.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use crate::error::{FetchError, FetchResult, SinkResult};
use crate::traits::fetcher::{Fetcher, FetcherFactory, RedirectMode};
use crate::traits::sink::ResultSink;
use crate::types::page::FetchedPage;
use crate::types::row::ResultRow;

#[derive(Debug, Clone)]
enum MockResponse {
    Page(FetchedPage),
    Error(String),
}

/// Mock fetcher with canned responses keyed by URL and redirect mode.
///
/// Unknown URLs fail like an unreachable host. Clones share responses and
/// call history, so a clone handed to a worker can be inspected afterwards.
///
/// # Example
///
/// ```rust
/// use site_stats::testing::MockFetcher;
/// use site_stats::traits::fetcher::RedirectMode;
/// use site_stats::types::page::FetchedPage;
///
/// let fetcher = MockFetcher::new()
///     .with_page(RedirectMode::Manual, FetchedPage::redirect("http://a.com", 301, "http://b.com"))
///     .with_page(RedirectMode::Follow, FetchedPage::new("http://b.com", "<title>B</title>"));
/// ```
#[derive(Clone, Default)]
pub struct MockFetcher {
    responses: Arc<RwLock<HashMap<(String, RedirectMode), MockResponse>>>,
    calls: Arc<RwLock<Vec<(String, RedirectMode)>>>,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` for its own URL in `mode`.
    pub fn with_page(self, mode: RedirectMode, page: FetchedPage) -> Self {
        let url = page.url.clone();
        self.with_response(url, mode, page)
    }

    /// Serve `page` when `url` is requested in `mode`.
    pub fn with_response(self, url: impl Into<String>, mode: RedirectMode, page: FetchedPage) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert((url.into(), mode), MockResponse::Page(page));
        self
    }

    /// Fail requests for `url` in `mode` with `message`.
    pub fn with_error(self, url: impl Into<String>, mode: RedirectMode, message: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert((url.into(), mode), MockResponse::Error(message.into()));
        self
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Requests made so far, in order.
    pub fn calls(&self) -> Vec<(String, RedirectMode)> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str, mode: RedirectMode) -> FetchResult<FetchedPage> {
        self.calls.write().unwrap().push((url.to_string(), mode));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let response = self
            .responses
            .read()
            .unwrap()
            .get(&(url.to_string(), mode))
            .cloned();

        match response {
            Some(MockResponse::Page(page)) => Ok(page),
            Some(MockResponse::Error(message)) => Err(FetchError::Http(message.into())),
            None => Err(FetchError::Http(
                format!("mock: no response for {}", url).into(),
            )),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl FetcherFactory for MockFetcher {
    type Fetcher = MockFetcher;

    fn create(&self) -> FetchResult<MockFetcher> {
        Ok(self.clone())
    }
}

/// A factory that cannot build fetchers, for exercising that failure path.
#[derive(Debug, Clone, Default)]
pub struct FailingFactory;

impl FetcherFactory for FailingFactory {
    type Fetcher = MockFetcher;

    fn create(&self) -> FetchResult<MockFetcher> {
        Err(FetchError::ClientBuild("mock: client unavailable".to_string()))
    }
}

/// In-memory sink collecting rows in write order.
#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<Vec<ResultRow>>,
    fail_index: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the write for the row with this index.
    pub fn failing_on(index: usize) -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_index: Some(index),
        }
    }

    pub fn rows(&self) -> Vec<ResultRow> {
        self.rows.lock().unwrap().clone()
    }

    /// Indices written, sorted.
    pub fn indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.rows().iter().map(|r| r.index).collect();
        indices.sort_unstable();
        indices
    }

    pub fn row(&self, index: usize) -> Option<ResultRow> {
        self.rows().into_iter().find(|r| r.index == index)
    }
}

impl ResultSink for MemorySink {
    fn write_row(&self, row: &ResultRow) -> SinkResult<()> {
        if self.fail_index == Some(row.index) {
            return Err(std::io::Error::other("mock: disk full").into());
        }
        self.rows.lock().unwrap().push(row.clone());
        Ok(())
    }
}
