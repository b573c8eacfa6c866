//! Filename extraction from `Content-Disposition` headers and URLs.
//!
//! Priority: RFC 5987 `filename*=` value, then plain `filename=`, then the last
//! URL path segment, then a configured default name.

use percent_encoding::percent_decode_str;
use url::Url;

/// Pick the filename for a resource.
pub fn resolve_filename(disposition: Option<&str>, url: &str, default_name: &str) -> String {
    disposition
        .and_then(filename_from_disposition)
        .or_else(|| filename_from_url(url))
        .unwrap_or_else(|| default_name.to_string())
}

/// Extract a filename from a `Content-Disposition` header value.
///
/// An extended `filename*=charset'lang'value` parameter wins over a plain
/// `filename=` parameter regardless of order.
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let mut extended = None;
    let mut plain = None;

    for param in split_params(value) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let raw = raw.trim();

        if key == "filename*" && extended.is_none() {
            extended = decode_extended(raw);
        } else if key == "filename" && plain.is_none() {
            plain = sanitize(unquote(raw));
        }
    }

    extended.or(plain)
}

/// Extract a filename from the last path segment of a URL.
///
/// Returns `None` for URLs whose path is empty or ends in `/`.
pub fn filename_from_url(url: &str) -> Option<String> {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed.path().rsplit('/').next().unwrap_or("").to_string(),
        Err(_) => {
            let path = url.split(['?', '#']).next().unwrap_or("");
            path.rsplit('/').next().unwrap_or("").to_string()
        }
    };

    if segment.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(&segment).decode_utf8_lossy();
    // Query text can survive decoding when it was itself percent-encoded.
    let decoded = decoded.split('?').next().unwrap_or("");
    sanitize(decoded)
}

/// Decode `charset'lang'value`, discarding the charset and language prefix.
fn decode_extended(raw: &str) -> Option<String> {
    let raw = unquote(raw);
    let encoded = match raw.splitn(3, '\'').collect::<Vec<_>>().as_slice() {
        [_charset, _lang, value] => *value,
        _ => raw,
    };
    let decoded = percent_decode_str(encoded).decode_utf8_lossy();
    sanitize(&decoded)
}

/// Split header parameters on `;`, ignoring separators inside quotes.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.strip_prefix('"') {
        Some(rest) => rest.split('"').next().unwrap_or(""),
        None => raw,
    }
}

/// Keep only the final path component so a header cannot escape the output directory.
fn sanitize(name: &str) -> Option<String> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match name {
        "" | "." | ".." => None,
        _ => Some(name.to_string()),
    }
}
