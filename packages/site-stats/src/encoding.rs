//! Character encoding detection and transcoding.
//!
//! All extracted text is normalized to UTF-8. Pages that are not UTF-8 and
//! do not say what they are fall back to windows-1251, the legacy Cyrillic
//! codec the lookup service also expects its queries in.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};

/// The legacy single-byte codec used for lookup queries and as the
/// fallback for undeclared non-UTF-8 pages.
pub const LEGACY: &Encoding = WINDOWS_1251;

/// How far into a document to look for a `<meta>` charset declaration.
const META_SNIFF_BYTES: usize = 1024;

/// Work out the encoding of a response body.
///
/// Order: byte-order mark, `charset` of the Content-Type header, an HTML
/// `<meta>` declaration, valid UTF-8, then [`LEGACY`].
pub fn detect_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }

    if let Some(encoding) = content_type.and_then(charset_param).and_then(for_label) {
        return encoding;
    }

    if let Some(encoding) = sniff_meta_charset(bytes).and_then(|l| for_label(&l)) {
        return encoding;
    }

    if std::str::from_utf8(bytes).is_ok() {
        UTF_8
    } else {
        LEGACY
    }
}

/// Decode a body to UTF-8, transcoding when the detected encoding is not
/// already UTF-8. Malformed sequences become U+FFFD.
pub fn decode_to_utf8(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = detect_encoding(bytes, content_type);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Encode UTF-8 text with the legacy codec. Characters it cannot represent
/// are written as HTML numeric character references.
pub fn encode_legacy(text: &str) -> Vec<u8> {
    let (bytes, _, _) = LEGACY.encode(text);
    bytes.into_owned()
}

/// Legacy-encode `text` and percent-encode the bytes for use as a query
/// string value.
pub fn encode_query_value(text: &str) -> String {
    urlencoding::encode_binary(&encode_legacy(text)).into_owned()
}

fn for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// `charset` parameter of a Content-Type value.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(|c| c == '"' || c == '\''))
        } else {
            None
        }
    })
}

/// Find `charset=...` inside a `<meta>` tag near the top of the document.
/// Covers both `<meta charset="x">` and the `http-equiv` form.
fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    let mut rest = head.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let end = tag.find('>').unwrap_or(tag.len());
        let tag = &tag[..end];

        let value = tag.find("charset").and_then(|pos| {
            tag[pos + "charset".len()..].trim_start().strip_prefix('=')
        });
        if let Some(value) = value {
            let value: String = value
                .trim_start()
                .trim_start_matches(|c| c == '"' || c == '\'')
                .chars()
                .take_while(|c| !matches!(c, '"' | '\'' | ';' | '/' | ' ' | '>'))
                .collect();
            if !value.is_empty() {
                return Some(value);
            }
        }

        rest = &rest[start + end..];
    }
    None
}
