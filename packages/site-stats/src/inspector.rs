//! Page inspection: title and canonical-link extraction.

use scraper::{Html, Selector};

use crate::encoding::decode_to_utf8;
use crate::types::page::{FetchedPage, PageMetadata};

/// Decode a fetched page and pull out its metadata.
///
/// The body is decoded to UTF-8 before parsing so non-ASCII titles in
/// legacy encodings survive.
pub fn inspect(page: &FetchedPage) -> PageMetadata {
    let html = decode_to_utf8(&page.body, page.content_type());
    PageMetadata {
        title: extract_title(&html).unwrap_or_default(),
        canonical_redirect_target: page.header("link").and_then(canonical_link),
    }
}

/// Text of the first `<title>` element, whitespace collapsed.
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    document.select(&selector).next().map(|el| {
        el.text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    })
}

/// URL of the `rel="canonical"` entry in a `Link` header value.
///
/// `<https://example.com/>; rel="canonical", <https://example.com/feed>; rel="alternate"`
/// yields `https://example.com/`.
pub fn canonical_link(link_header: &str) -> Option<String> {
    split_link_entries(link_header)
        .into_iter()
        .find(|entry| {
            entry.split(';').skip(1).any(|param| {
                param.split_once('=').is_some_and(|(name, value)| {
                    name.trim().eq_ignore_ascii_case("rel")
                        && value
                            .trim()
                            .trim_matches('"')
                            .split_whitespace()
                            .any(|rel| rel.eq_ignore_ascii_case("canonical"))
                })
            })
        })
        .and_then(|entry| {
            let start = entry.find('<')?;
            let end = entry[start..].find('>')? + start;
            let target = entry[start + 1..end].trim();
            (!target.is_empty()).then(|| target.to_string())
        })
}

/// Split a `Link` header on the commas between entries, not the ones
/// that may appear inside `<...>`.
fn split_link_entries(header: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in header.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                entries.push(header[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    entries.push(header[start..].trim());
    entries
}
