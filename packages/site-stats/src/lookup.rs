//! Lookup-service client.
//!
//! The lookup service answers `sword=<target>` queries with an HTML page
//! holding one statistics table. The values live at fixed cell positions,
//! so a layout change on their side is a change to the constants below.

use scraper::{Html, Selector};
use tracing::debug;

use crate::encoding::{decode_to_utf8, encode_query_value};
use crate::error::FetchResult;
use crate::traits::fetcher::{Fetcher, RedirectMode};
use crate::types::row::LookupResult;

/// Query prefix; the encoded target URL is appended.
pub const DEFAULT_LOOKUP_ENDPOINT: &str = "https://spywords.ru/sword.php?region=&sword=";

/// Cells holding the statistics, in document order.
const STATS_CELLS: &str = "table.data_table.stat tr.white td";

/// Position of the Yandex value among the matched cells.
const YANDEX_CELL: usize = 1;

/// Position of the Google value among the matched cells.
const GOOGLE_CELL: usize = 10;

/// Client for the ranking lookup service.
#[derive(Debug, Clone)]
pub struct LookupClient {
    endpoint: String,
}

impl Default for LookupClient {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_ENDPOINT)
    }
}

impl LookupClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    /// Full query URL for `target`. The service expects the query text in
    /// windows-1251, so the target is transcoded before percent-encoding.
    pub fn query_url(&self, target: &str) -> String {
        format!("{}{}", self.endpoint, encode_query_value(target))
    }

    /// Fetch and parse the statistics for `target`.
    ///
    /// Only a failed fetch is an error. A page without the expected table
    /// yields sentinel values.
    pub async fn lookup<F>(&self, fetcher: &F, target: &str) -> FetchResult<LookupResult>
    where
        F: Fetcher + ?Sized,
    {
        let url = self.query_url(target);
        debug!(target = %target, url = %url, "Lookup query");

        let page = fetcher.fetch(&url, RedirectMode::Follow).await?;
        let html = decode_to_utf8(&page.body, page.content_type());
        let stats = parse_stats(&html);
        if !stats.has_info() {
            debug!(target = %target, status = page.status, "Lookup page has no stats");
        }
        Ok(stats)
    }
}

/// Extract the statistics from a lookup-service page.
pub fn parse_stats(html: &str) -> LookupResult {
    let mut stats = LookupResult::default();

    let Ok(selector) = Selector::parse(STATS_CELLS) else {
        return stats;
    };
    let document = Html::parse_document(html);

    for (position, cell) in document.select(&selector).enumerate() {
        let text = || cell.text().collect::<String>().trim().to_string();
        match position {
            YANDEX_CELL => stats.yandex = text(),
            GOOGLE_CELL => {
                stats.google = text();
                break;
            }
            _ => {}
        }
    }

    stats
}
