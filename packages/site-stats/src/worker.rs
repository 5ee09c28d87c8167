//! Row worker: one input row in, exactly one result row out.
//!
//! Every failure along the way (primary fetch, re-fetch after a redirect,
//! lookup) is written into the row as text. Nothing here returns an error.

use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::inspector::inspect;
use crate::lookup::LookupClient;
use crate::traits::fetcher::{Fetcher, RedirectMode};
use crate::types::page::FetchedPage;
use crate::types::row::{normalize_url, InputRow, ResultRow};

/// `redirect_status` recorded when the redirect came from a canonical link.
pub const CANONICAL_REDIRECT: &str = "canonical";

pub const EMPTY_URL_ERROR: &str = "empty URL cell";
pub const MISSING_LOCATION_ERROR: &str = "redirect without Location header";
pub const LOOKUP_SKIPPED: &str = "skipped: no URL";

/// Processes rows with its own fetcher.
pub struct RowWorker<F> {
    fetcher: F,
    lookup: Arc<LookupClient>,
    canonical_fallback: bool,
}

impl<F: Fetcher> RowWorker<F> {
    pub fn new(fetcher: F, lookup: Arc<LookupClient>) -> Self {
        Self {
            fetcher,
            lookup,
            canonical_fallback: false,
        }
    }

    /// Use `Link: rel=canonical` as a redirect signal when the status is not one.
    pub fn with_canonical_fallback(mut self, enabled: bool) -> Self {
        self.canonical_fallback = enabled;
        self
    }

    /// Run the whole pipeline for one row.
    pub async fn process(&self, row: &InputRow) -> ResultRow {
        let url = row.normalized_url();
        let mut result = ResultRow::new(row.index, url.clone());

        if url.is_empty() {
            warn!(index = row.index, "Row has no URL");
            result.website_error = EMPTY_URL_ERROR.to_string();
            result.lookup_error = LOOKUP_SKIPPED.to_string();
            return result;
        }

        let target = self.visit_website(&url, &mut result).await;
        result.resolved_url = target.clone();

        match self.lookup.lookup(&self.fetcher, &target).await {
            Ok(stats) => result = result.with_lookup(stats),
            Err(e) => {
                warn!(index = row.index, url = %target, error = %e, "Lookup failed");
                result.lookup_error = e.to_string();
            }
        }

        info!(
            index = result.index,
            url = %result.resolved_url,
            title = %result.title,
            "Row completed"
        );
        result
    }

    /// Fetch the website itself. Returns the URL the lookup should use.
    async fn visit_website(&self, url: &str, result: &mut ResultRow) -> String {
        let page = match self.fetcher.fetch(url, RedirectMode::Manual).await {
            Ok(page) => page,
            Err(e) => {
                warn!(index = result.index, url = %url, error = %e, "Website fetch failed");
                result.website_error = e.to_string();
                return url.to_string();
            }
        };

        if page.is_redirect() {
            return self.follow_redirect(url, &page, result).await;
        }

        let meta = inspect(&page);
        result.title = meta.title;

        if self.canonical_fallback {
            if let Some(canonical) = meta
                .canonical_redirect_target
                .filter(|target| !same_url(target, url))
            {
                debug!(index = result.index, url = %url, canonical = %canonical, "Canonical link redirect");
                result.redirect_status = CANONICAL_REDIRECT.to_string();
                let target = normalize_url(&canonical);
                result.new_website = canonical;
                return target;
            }
        }

        url.to_string()
    }

    /// Handle a 3xx: record it, re-fetch the target with redirects
    /// followed, and take the title from there.
    async fn follow_redirect(&self, url: &str, page: &FetchedPage, result: &mut ResultRow) -> String {
        result.redirect_status = page.status_text();

        let Some(location) = page.location() else {
            result.secondary_error = MISSING_LOCATION_ERROR.to_string();
            result.title = inspect(page).title;
            return url.to_string();
        };

        let target = resolve_location(url, location);
        result.new_website = target.clone();
        let self_redirect = same_url(&target, url);

        debug!(
            index = result.index,
            url = %url,
            location = %target,
            self_redirect = self_redirect,
            "Following redirect"
        );

        match self.fetcher.fetch(&target, RedirectMode::Follow).await {
            Ok(final_page) => result.title = inspect(&final_page).title,
            Err(e) => {
                warn!(index = result.index, url = %target, error = %e, "Redirect target fetch failed");
                result.secondary_error = e.to_string();
            }
        }

        if self_redirect {
            url.to_string()
        } else {
            normalize_url(&target)
        }
    }
}

/// Relative locations are joined onto `base`.
fn resolve_location(base: &str, location: &str) -> String {
    if Url::parse(location).is_ok() {
        return location.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(location))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| location.to_string())
}

fn same_url(a: &str, b: &str) -> bool {
    match (Url::parse(a), Url::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use crate::types::row::NO_INFO;

    const ENDPOINT: &str = "https://stats.test/q?sword=";

    fn worker(fetcher: MockFetcher) -> RowWorker<MockFetcher> {
        RowWorker::new(fetcher, Arc::new(LookupClient::new(ENDPOINT)))
    }

    fn lookup_url(target: &str) -> String {
        LookupClient::new(ENDPOINT).query_url(target)
    }

    fn stats_page(url: String, yandex: &str, google: &str) -> FetchedPage {
        let mut cells = vec!["-"; 11];
        cells[1] = yandex;
        cells[10] = google;
        let cells: String = cells.iter().map(|c| format!("<td>{}</td>", c)).collect();
        FetchedPage::new(
            url,
            format!(r#"<table class="data_table stat"><tr class="white">{}</tr></table>"#, cells),
        )
    }

    fn html(title: &str) -> String {
        format!("<html><head><title>{}</title></head><body></body></html>", title)
    }

    #[tokio::test]
    async fn test_redirect_scenario() {
        let fetcher = MockFetcher::new()
            .with_page(
                RedirectMode::Manual,
                FetchedPage::redirect("http://example.com", 301, "http://example.org"),
            )
            .with_page(
                RedirectMode::Follow,
                FetchedPage::new("http://example.org", html("Example Domain")),
            )
            .with_page(
                RedirectMode::Follow,
                stats_page(lookup_url("http://example.org"), "10", "20"),
            );

        let result = worker(fetcher.clone())
            .process(&InputRow::new(3, "example.com "))
            .await;

        assert_eq!(result.index, 3);
        assert_eq!(result.resolved_url, "http://example.org");
        assert_eq!(result.title, "Example Domain");
        assert_eq!(result.redirect_status, "301 Moved Permanently");
        assert_eq!(result.new_website, "http://example.org");
        assert_eq!(result.yandex, "10");
        assert_eq!(result.google, "20");
        assert!(result.website_error.is_empty());
        assert!(result.secondary_error.is_empty());
        assert!(result.lookup_error.is_empty());

        // First fetch is the normalized URL, without following redirects
        assert_eq!(
            fetcher.calls()[0],
            ("http://example.com".to_string(), RedirectMode::Manual)
        );
    }

    #[tokio::test]
    async fn test_plain_page() {
        let fetcher = MockFetcher::new()
            .with_page(
                RedirectMode::Manual,
                FetchedPage::new("http://example.com", html("Home")),
            )
            .with_page(
                RedirectMode::Follow,
                stats_page(lookup_url("http://example.com"), "1", "2"),
            );

        let result = worker(fetcher).process(&InputRow::new(0, "example.com")).await;
        assert_eq!(result.title, "Home");
        assert_eq!(result.resolved_url, "http://example.com");
        assert!(result.redirect_status.is_empty());
        assert!(result.new_website.is_empty());
        assert_eq!(result.yandex, "1");
    }

    #[tokio::test]
    async fn test_fetch_error_still_looks_up() {
        let fetcher = MockFetcher::new()
            .with_error("http://down.test", RedirectMode::Manual, "dns error")
            .with_page(
                RedirectMode::Follow,
                stats_page(lookup_url("http://down.test"), "5", "6"),
            );

        let result = worker(fetcher).process(&InputRow::new(1, "down.test")).await;
        assert_eq!(result.website_error, "dns error");
        assert_eq!(result.title, "");
        assert_eq!(result.resolved_url, "http://down.test");
        assert_eq!(result.yandex, "5");
    }

    #[tokio::test]
    async fn test_lookup_error_recorded_with_sentinels() {
        let fetcher = MockFetcher::new().with_page(
            RedirectMode::Manual,
            FetchedPage::new("http://example.com", html("Home")),
        );

        let result = worker(fetcher).process(&InputRow::new(2, "example.com")).await;
        assert!(!result.lookup_error.is_empty());
        assert_eq!(result.yandex, NO_INFO);
        assert_eq!(result.google, NO_INFO);
        assert_eq!(result.title, "Home");
    }

    #[tokio::test]
    async fn test_redirect_target_fetch_error() {
        let fetcher = MockFetcher::new()
            .with_page(
                RedirectMode::Manual,
                FetchedPage::redirect("http://a.test", 302, "http://b.test/landing"),
            )
            .with_error("http://b.test/landing", RedirectMode::Follow, "connection refused");

        let result = worker(fetcher.clone()).process(&InputRow::new(4, "a.test")).await;
        assert_eq!(result.redirect_status, "302 Found");
        assert_eq!(result.new_website, "http://b.test/landing");
        assert_eq!(result.secondary_error, "connection refused");
        assert_eq!(result.title, "");
        assert!(result.website_error.is_empty());

        // Lookup uses the redirect target
        assert_eq!(result.resolved_url, "http://b.test/landing");
        assert!(fetcher
            .calls()
            .contains(&(lookup_url("http://b.test/landing"), RedirectMode::Follow)));
    }

    #[tokio::test]
    async fn test_self_redirect_refetches_same_url() {
        let fetcher = MockFetcher::new()
            .with_page(
                RedirectMode::Manual,
                FetchedPage::redirect("http://loop.test", 307, "http://loop.test/"),
            )
            .with_response(
                "http://loop.test/",
                RedirectMode::Follow,
                FetchedPage::new("http://loop.test/", html("Loop")),
            );

        let result = worker(fetcher.clone()).process(&InputRow::new(5, "loop.test")).await;
        assert_eq!(result.redirect_status, "307 Temporary Redirect");
        assert_eq!(result.title, "Loop");
        assert_eq!(result.resolved_url, "http://loop.test");
    }

    #[tokio::test]
    async fn test_relative_location_is_resolved() {
        let fetcher = MockFetcher::new()
            .with_page(
                RedirectMode::Manual,
                FetchedPage::redirect("http://rel.test/old", 301, "/new"),
            )
            .with_page(
                RedirectMode::Follow,
                FetchedPage::new("http://rel.test/new", html("New")),
            );

        let result = worker(fetcher).process(&InputRow::new(6, "rel.test/old")).await;
        assert_eq!(result.new_website, "http://rel.test/new");
        assert_eq!(result.resolved_url, "http://rel.test/new");
        assert_eq!(result.title, "New");
    }

    #[tokio::test]
    async fn test_redirect_without_location() {
        let fetcher = MockFetcher::new().with_page(
            RedirectMode::Manual,
            FetchedPage::new("http://odd.test", html("Odd")).with_status(301),
        );

        let result = worker(fetcher).process(&InputRow::new(7, "odd.test")).await;
        assert_eq!(result.redirect_status, "301 Moved Permanently");
        assert_eq!(result.secondary_error, MISSING_LOCATION_ERROR);
        assert_eq!(result.title, "Odd");
        assert_eq!(result.resolved_url, "http://odd.test");
    }

    #[tokio::test]
    async fn test_empty_url_skips_network() {
        let fetcher = MockFetcher::new();
        let result = worker(fetcher.clone()).process(&InputRow::new(8, "  ")).await;
        assert_eq!(result.website_error, EMPTY_URL_ERROR);
        assert_eq!(result.lookup_error, LOOKUP_SKIPPED);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_canonical_fallback() {
        let page = FetchedPage::new("http://canon.test", html("Canon"))
            .with_header("link", "<https://www.canon.test/>; rel=\"canonical\"");
        let fetcher = MockFetcher::new().with_page(RedirectMode::Manual, page);

        // Off by default: the header is ignored
        let result = worker(fetcher.clone()).process(&InputRow::new(9, "canon.test")).await;
        assert!(result.redirect_status.is_empty());
        assert_eq!(result.resolved_url, "http://canon.test");

        let result = worker(fetcher)
            .with_canonical_fallback(true)
            .process(&InputRow::new(9, "canon.test"))
            .await;
        assert_eq!(result.redirect_status, CANONICAL_REDIRECT);
        assert_eq!(result.new_website, "https://www.canon.test/");
        assert_eq!(result.resolved_url, "https://www.canon.test/");
        assert_eq!(result.title, "Canon");
    }

    #[tokio::test]
    async fn test_canonical_pointing_at_self_is_not_a_redirect() {
        let page = FetchedPage::new("http://canon.test", html("Canon"))
            .with_header("link", "<http://canon.test/>; rel=canonical");
        let fetcher = MockFetcher::new().with_page(RedirectMode::Manual, page);

        let result = worker(fetcher)
            .with_canonical_fallback(true)
            .process(&InputRow::new(10, "canon.test"))
            .await;
        assert!(result.redirect_status.is_empty());
    }

    #[test]
    fn test_resolve_location() {
        assert_eq!(
            resolve_location("http://a.test/x/y", "http://b.test"),
            "http://b.test"
        );
        assert_eq!(resolve_location("http://a.test/x/y", "z"), "http://a.test/x/z");
        assert_eq!(resolve_location("http://a.test/x/y", "/z"), "http://a.test/z");
    }

    #[tokio::test]
    async fn test_directory_redirect_uses_target() {
        let fetcher = MockFetcher::new()
            .with_page(
                RedirectMode::Manual,
                FetchedPage::redirect("http://x.test/dir", 301, "http://x.test/dir/"),
            )
            .with_page(
                RedirectMode::Follow,
                FetchedPage::new("http://x.test/dir/", html("Index")),
            );

        let result = worker(fetcher.clone()).process(&InputRow::new(11, "x.test/dir")).await;
        assert_eq!(result.new_website, "http://x.test/dir/");
        assert_eq!(result.resolved_url, "http://x.test/dir/");
        assert_eq!(result.title, "Index");
        assert!(fetcher
            .calls()
            .contains(&(lookup_url("http://x.test/dir/"), RedirectMode::Follow)));
    }

    #[tokio::test]
    async fn test_path_case_redirect_uses_target() {
        let fetcher = MockFetcher::new()
            .with_page(
                RedirectMode::Manual,
                FetchedPage::redirect("http://x.test/About", 301, "http://x.test/about"),
            )
            .with_page(
                RedirectMode::Follow,
                FetchedPage::new("http://x.test/about", html("About")),
            );

        let result = worker(fetcher).process(&InputRow::new(12, "x.test/About")).await;
        assert_eq!(result.resolved_url, "http://x.test/about");
        assert_eq!(result.title, "About");
    }

    #[test]
    fn test_same_url() {
        assert!(same_url("http://a.test/", "http://a.test"));
        assert!(same_url("HTTP://A.test", "http://a.test"));
        assert!(!same_url("https://a.test", "http://a.test"));
        assert!(!same_url("http://a.test/dir", "http://a.test/dir/"));
        assert!(!same_url("http://a.test/About", "http://a.test/about"));
    }
}
