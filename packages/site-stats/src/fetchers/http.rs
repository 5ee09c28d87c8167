//! reqwest-backed fetcher.
//!
//! Holds two clients that share one timeout: one that never follows
//! redirects, so the caller sees the 3xx and its `Location`, and one that
//! follows them like a browser would.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{Fetcher, FetcherFactory, RedirectMode};
use crate::types::config::{EnrichConfig, DEFAULT_USER_AGENT};
use crate::types::page::FetchedPage;

/// Bodies longer than this are truncated.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Redirect hops allowed in [`RedirectMode::Follow`].
const MAX_REDIRECTS: usize = 10;

/// HTTP fetcher with manual and following redirect clients.
pub struct HttpFetcher {
    manual: reqwest::Client,
    follow: reqwest::Client,
    max_body_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration, user_agent: &str) -> FetchResult<Self> {
        Ok(Self {
            manual: build_client(timeout, user_agent, Policy::none())?,
            follow: build_client(timeout, user_agent, Policy::limited(MAX_REDIRECTS))?,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        })
    }

    /// Set the body size cap.
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }

    fn client(&self, mode: RedirectMode) -> &reqwest::Client {
        match mode {
            RedirectMode::Manual => &self.manual,
            RedirectMode::Follow => &self.follow,
        }
    }

    /// Read the body chunk by chunk, stopping at the size cap.
    async fn read_body(&self, url: &str, mut response: reqwest::Response) -> FetchResult<Vec<u8>> {
        let mut body = Vec::new();
        loop {
            let chunk = response.chunk().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Body {
                        url: url.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

            let Some(chunk) = chunk else { break };
            let room = self.max_body_bytes.saturating_sub(body.len());
            if chunk.len() >= room {
                body.extend_from_slice(&chunk[..room]);
                debug!(url = %url, limit = self.max_body_bytes, "Body truncated at size cap");
                break;
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn build_client(timeout: Duration, user_agent: &str, policy: Policy) -> FetchResult<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("ru,en-US;q=0.7,en;q=0.5"));

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .default_headers(headers)
        .redirect(policy)
        .build()
        .map_err(|e| FetchError::ClientBuild(e.to_string()))
}

/// Collect headers with lower-cased names; repeats are joined with `", "`.
fn collect_headers(headers: &HeaderMap) -> HashMap<String, String> {
    let mut collected: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let Ok(value) = value.to_str() else { continue };
        collected
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    collected
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, mode: RedirectMode) -> FetchResult<FetchedPage> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;

        debug!(url = %url, mode = ?mode, "HTTP fetch starting");
        let response = self.client(mode).get(parsed).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "HTTP request failed");
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http(Box::new(e))
            }
        })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());
        let body = self.read_body(url, response).await?;

        debug!(
            url = %url,
            final_url = %final_url,
            status = status,
            body_len = body.len(),
            "HTTP fetch completed"
        );

        Ok(FetchedPage {
            url: final_url,
            status,
            headers,
            body,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Builds a fresh [`HttpFetcher`] for every row.
#[derive(Debug, Clone)]
pub struct HttpFetcherFactory {
    timeout: Duration,
    user_agent: String,
    max_body_bytes: usize,
}

impl HttpFetcherFactory {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_config(config: &EnrichConfig) -> Self {
        Self::new(config.timeout).with_user_agent(config.user_agent.clone())
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

impl FetcherFactory for HttpFetcherFactory {
    type Fetcher = HttpFetcher;

    fn create(&self) -> FetchResult<HttpFetcher> {
        Ok(HttpFetcher::new(self.timeout, &self.user_agent)?
            .with_max_body_bytes(self.max_body_bytes))
    }
}
