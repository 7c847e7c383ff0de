//! Request path resolution against the file cache.
//!
//! # Responsibilities
//! - Gate on the request method before any lookup
//! - Map the request target to a cache key
//! - Apply fallbacks in a fixed order, first match wins
//!
//! # Design Decisions
//! - Pure function over `&FileCache`: no I/O, trivially testable
//! - Keys keep the query string, since exported archives store
//!   `style.css?ver=2` as a literal filename
//! - Directory requests redirect to `index.html` instead of serving it so
//!   relative links inside the document resolve correctly

use axum::http::Method;
use percent_encoding::percent_decode_str;

use crate::cache::{FileCache, FileRecord};

/// Where a request ends up.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// A cached file to serve.
    Found(&'a FileRecord),
    /// Redirect (302) to this root-relative location.
    Redirect(String),
    /// No key matched after every fallback.
    NotFound,
    /// Method other than `GET`.
    MethodRejected,
}

/// Resolve `target` (the request path with optional query) for `method`.
pub fn resolve<'a>(cache: &'a FileCache, method: &Method, target: &str) -> Resolution<'a> {
    if method != Method::GET {
        return Resolution::MethodRejected;
    }

    let key = request_key(target);
    if let Some(record) = cache.get(key) {
        return Resolution::Found(record);
    }

    for alternate in alternate_keys(key) {
        if let Some(record) = cache.get(&alternate) {
            return Resolution::Found(record);
        }
    }

    let index = index_key(key);
    if cache.contains(&index) {
        return Resolution::Redirect(format!("/{}", index));
    }

    Resolution::NotFound
}

/// Strip one leading and one trailing slash.
pub fn request_key(target: &str) -> &str {
    let key = target.strip_prefix('/').unwrap_or(target);
    key.strip_suffix('/').unwrap_or(key)
}

/// Alternate spellings of `key`, in lookup order.
///
/// 1. `%2C` → `,` and `%7C` → `|` only, for clients that over-encode
///    archive filenames containing those characters. Lowercase hex is
///    accepted as well.
/// 2. Full percent-decoding, so `%20` and friends resolve too.
///
/// Both go beyond the classic comma/pipe-only substitution; see the
/// "Extra fallback" decision in DESIGN.md.
pub fn alternate_keys(key: &str) -> Vec<String> {
    let mut alternates: Vec<String> = Vec::with_capacity(2);
    if !key.contains('%') {
        return alternates;
    }

    let separators = key
        .replace("%2C", ",")
        .replace("%2c", ",")
        .replace("%7C", "|")
        .replace("%7c", "|");
    if separators != key {
        alternates.push(separators);
    }

    if let Ok(decoded) = percent_decode_str(key).decode_utf8() {
        if decoded != key && !alternates.iter().any(|a| *a == decoded) {
            alternates.push(decoded.into_owned());
        }
    }
    alternates
}

fn index_key(key: &str) -> String {
    if key.is_empty() {
        "index.html".to_string()
    } else {
        format!("{}/index.html", key)
    }
}

/// Pairs of cached keys where the second is an encoded alias of the first:
/// requests for the encoded spelling hit the encoded file by exact match and
/// never reach the decoded one through fallback.
pub fn shadowed_keys(cache: &FileCache) -> Vec<(String, String)> {
    let mut shadowed = Vec::new();
    for record in cache.records() {
        for alternate in alternate_keys(&record.path) {
            if cache.contains(&alternate) {
                shadowed.push((alternate, record.path.clone()));
            }
        }
    }
    shadowed
}
