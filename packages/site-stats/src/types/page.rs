//! Fetched page and derived page metadata.

use reqwest::StatusCode;
use std::collections::HashMap;

/// Status codes treated as redirects under manual redirect handling.
pub const REDIRECT_STATUSES: [u16; 5] = [301, 302, 303, 307, 308];

/// A successful fetch: the response as received, body fully read.
///
/// A failed fetch is a [`FetchError`](crate::error::FetchError); together
/// they form one fetch outcome.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the response was served from (after redirects, if followed)
    pub url: String,

    /// HTTP status code
    pub status: u16,

    /// Response headers, names lower-cased. Repeated headers are joined
    /// with `", "`.
    pub headers: HashMap<String, String>,

    /// Raw body bytes
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// Create a page with status 200 and no headers.
    pub fn new(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Create a redirect response pointing at `location`.
    pub fn redirect(url: impl Into<String>, status: u16, location: impl Into<String>) -> Self {
        Self::new(url, Vec::new())
            .with_status(status)
            .with_header("location", location)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// `Location` header, if any.
    pub fn location(&self) -> Option<&str> {
        self.header("location")
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    pub fn is_redirect(&self) -> bool {
        REDIRECT_STATUSES.contains(&self.status)
    }

    /// Status code followed by its canonical reason, e.g. `301 Moved Permanently`.
    pub fn status_text(&self) -> String {
        match StatusCode::from_u16(self.status) {
            Ok(code) => match code.canonical_reason() {
                Some(reason) => format!("{} {}", self.status, reason),
                None => self.status.to_string(),
            },
            Err(_) => self.status.to_string(),
        }
    }
}

/// Metadata derived from one successful fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    /// First `<title>` text, decoded to UTF-8; empty if the page has none
    pub title: String,

    /// Target of a `Link: <...>; rel="canonical"` header
    pub canonical_redirect_target: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_detection() {
        for status in REDIRECT_STATUSES {
            let page = FetchedPage::redirect("http://a.com", status, "http://b.com");
            assert!(page.is_redirect(), "{status} should be a redirect");
            assert_eq!(page.location(), Some("http://b.com"));
        }

        // 304 and 300 are 3xx but not redirects we follow
        assert!(!FetchedPage::new("http://a.com", "").with_status(304).is_redirect());
        assert!(!FetchedPage::new("http://a.com", "").with_status(300).is_redirect());
        assert!(!FetchedPage::new("http://a.com", "").is_redirect());
    }

    #[test]
    fn test_status_text() {
        let page = FetchedPage::new("http://a.com", "").with_status(301);
        assert_eq!(page.status_text(), "301 Moved Permanently");

        let page = FetchedPage::new("http://a.com", "").with_status(308);
        assert_eq!(page.status_text(), "308 Permanent Redirect");

        let page = FetchedPage::new("http://a.com", "").with_status(599);
        assert_eq!(page.status_text(), "599");
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let page = FetchedPage::new("http://a.com", "")
            .with_header("Content-Type", "text/html; charset=windows-1251");
        assert_eq!(
            page.content_type(),
            Some("text/html; charset=windows-1251")
        );
        assert_eq!(page.header("CONTENT-TYPE"), page.content_type());
    }

    #[test]
    fn test_blank_location_is_absent() {
        let page = FetchedPage::redirect("http://a.com", 302, "  ");
        assert_eq!(page.location(), None);
    }
}
