//! `Accept-*` header membership tests.
//!
//! Each header is a comma-separated list of values with optional `;`
//! parameters. Only `q` matters here: an entry with `q=0` is an explicit
//! refusal and never matches. Everything else is a plain membership test,
//! no ranking. A request without the header has an empty set.

use http::HeaderMap;
use http::header::{ACCEPT, ACCEPT_CHARSET, ACCEPT_ENCODING, ACCEPT_LANGUAGE, HeaderName};

/// Iterates the acceptable (q > 0) values of every `name` header line.
fn entries<'a>(headers: &'a HeaderMap, name: &HeaderName) -> impl Iterator<Item = &'a str> {
    headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(','))
        .filter_map(|item| {
            let mut parts = item.split(';');
            let value = parts.next()?.trim();
            if value.is_empty() {
                return None;
            }
            let refused = parts
                .filter_map(|p| p.split_once('='))
                .any(|(k, v)| k.trim().eq_ignore_ascii_case("q") && is_zero_quality(v.trim()));
            (!refused).then_some(value)
        })
}

fn is_zero_quality(q: &str) -> bool {
    q.parse::<f32>().map(|q| q <= 0.0).unwrap_or(false)
}

/// `true` if `mime` (e.g. `application/json`) is covered by `Accept`.
pub(crate) fn media_type(headers: &HeaderMap, mime: &str) -> bool {
    let (ty, sub) = mime.split_once('/').unwrap_or((mime, ""));
    entries(headers, &ACCEPT).any(|range| {
        let range = range.split_once('/');
        match range {
            Some(("*", "*")) => true,
            Some((rt, "*")) => rt.eq_ignore_ascii_case(ty),
            Some((rt, rs)) => rt.eq_ignore_ascii_case(ty) && rs.eq_ignore_ascii_case(sub),
            None => false,
        }
    })
}

/// `true` if `charset` is covered by `Accept-Charset`. `utf8` and `UTF-8`
/// name the same charset.
pub(crate) fn charset(headers: &HeaderMap, charset: &str) -> bool {
    let wanted = normalize_charset(charset);
    entries(headers, &ACCEPT_CHARSET).any(|c| c == "*" || normalize_charset(c) == wanted)
}

fn normalize_charset(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// `true` if `encoding` is covered by `Accept-Encoding`.
pub(crate) fn encoding(headers: &HeaderMap, encoding: &str) -> bool {
    entries(headers, &ACCEPT_ENCODING).any(|e| e == "*" || e.eq_ignore_ascii_case(encoding))
}

/// `true` if the language tag is listed in `Accept-Language`. Tags compare
/// ignoring case, with `_` read as `-`; `en` does not cover `en-US`.
pub(crate) fn language(headers: &HeaderMap, tag: &str) -> bool {
    let tag = normalize_language(tag);
    entries(headers, &ACCEPT_LANGUAGE).any(|range| range == "*" || normalize_language(range) == tag)
}

fn normalize_language(s: &str) -> String {
    s.replace('_', "-").to_ascii_lowercase()
}
