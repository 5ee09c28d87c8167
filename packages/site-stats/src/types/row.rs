//! Input rows, lookup results and the assembled output row.

use serde::Serialize;

/// Placeholder written when the lookup service has no value for a field.
pub const NO_INFO: &str = "no info";

/// One URL read from the input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputRow {
    /// 0-based position in the source table
    pub index: usize,

    /// URL cell as read, untrimmed
    pub raw_url: String,
}

impl InputRow {
    pub fn new(index: usize, raw_url: impl Into<String>) -> Self {
        Self {
            index,
            raw_url: raw_url.into(),
        }
    }

    /// The URL with whitespace removed and a scheme guaranteed.
    pub fn normalized_url(&self) -> String {
        normalize_url(&self.raw_url)
    }
}

/// Remove all whitespace and prefix `http://` unless the URL already
/// carries an http(s) scheme. Empty input stays empty.
pub fn normalize_url(raw: &str) -> String {
    let url: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if url.is_empty() {
        return url;
    }

    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        url
    } else {
        format!("http://{}", url)
    }
}

/// Ranking statistics scraped from the lookup service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub yandex: String,
    pub google: String,
}

impl Default for LookupResult {
    fn default() -> Self {
        Self {
            yandex: NO_INFO.to_string(),
            google: NO_INFO.to_string(),
        }
    }
}

impl LookupResult {
    pub fn has_info(&self) -> bool {
        self.yandex != NO_INFO || self.google != NO_INFO
    }
}

/// Column names of the optional header line, in output order.
pub const RESULT_HEADER: [&str; 10] = [
    "index",
    "url",
    "yandex",
    "google",
    "title",
    "website_error",
    "redirect",
    "new_website",
    "secondary_error",
    "lookup_error",
];

/// The final record for one input row. Field order is the output column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultRow {
    pub index: usize,

    /// URL used for the lookup step (redirect target if one was followed)
    pub resolved_url: String,

    pub yandex: String,
    pub google: String,
    pub title: String,

    /// Primary fetch failure
    pub website_error: String,

    /// Redirect status text, e.g. `301 Moved Permanently`
    pub redirect_status: String,

    /// Redirect target
    pub new_website: String,

    /// Failure of the re-fetch after a redirect
    pub secondary_error: String,

    /// Lookup service failure
    pub lookup_error: String,
}

impl ResultRow {
    /// Start a row for `index` with sentinel statistics.
    pub fn new(index: usize, resolved_url: impl Into<String>) -> Self {
        let stats = LookupResult::default();
        Self {
            index,
            resolved_url: resolved_url.into(),
            yandex: stats.yandex,
            google: stats.google,
            ..Default::default()
        }
    }

    pub fn with_lookup(mut self, stats: LookupResult) -> Self {
        self.yandex = stats.yandex;
        self.google = stats.google;
        self
    }

    pub fn is_redirect(&self) -> bool {
        !self.redirect_status.is_empty()
    }

    pub fn has_website_error(&self) -> bool {
        !self.website_error.is_empty()
    }

    pub fn has_lookup_error(&self) -> bool {
        !self.lookup_error.is_empty()
    }

    /// Fields as strings, in output column order.
    pub fn fields(&self) -> [String; 10] {
        [
            self.index.to_string(),
            self.resolved_url.clone(),
            self.yandex.clone(),
            self.google.clone(),
            self.title.clone(),
            self.website_error.clone(),
            self.redirect_status.clone(),
            self.new_website.clone(),
            self.secondary_error.clone(),
            self.lookup_error.clone(),
        ]
    }
}
