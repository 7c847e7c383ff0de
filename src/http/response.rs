//! Response building for resolved requests.
//!
//! # Responsibilities
//! - Stream raw files with the cached kind as `Content-Type`
//! - Run HTML documents through the link normalizer before sending
//! - Honour conditional and single-range requests for rewritten documents
//! - Map every terminal state to a well-formed HTTP response
//!
//! # Design Decisions
//! - Raw files go through `ServeFile` (ranges, conditional requests)
//! - Normalization runs on the blocking pool; one request never stalls others
//! - File handles are scoped to the request and dropped on every exit path

use axum::body::Body;
use axum::http::header::{
    ACCEPT_RANGES, CONTENT_RANGE, CONTENT_TYPE, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE,
    IF_UNMODIFIED_SINCE, LAST_MODIFIED, LOCATION, RANGE,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use encoding_rs::Encoding;
use std::ops::Range;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::cache::FileRecord;
use crate::content::charset;
use crate::rewrite::{LinkNormalizer, NormalizeError};

/// Terminal state of one request, used for logs and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    ServedRaw,
    ServedNormalized,
    Redirected,
    NotFound,
    MethodRejected,
    InternalError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::ServedRaw => "served_raw",
            Outcome::ServedNormalized => "served_normalized",
            Outcome::Redirected => "redirected",
            Outcome::NotFound => "not_found",
            Outcome::MethodRejected => "method_rejected",
            Outcome::InternalError => "internal_error",
        }
    }
}

/// Failures while serving a single request; always mapped to 500.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("normalizer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Plain-text body with the status' reason phrase.
pub fn status_text(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or("Error");
    (status, format!("{}\n", reason)).into_response()
}

/// 302 Found to a root-relative location.
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, location.to_string())]).into_response()
}

/// Stream the file as-is, with the cached kind as the content type.
pub async fn serve_raw(record: &FileRecord, request: Request<Body>) -> Response {
    let response = match ServeFile::new(&record.location).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    let mut response = response.map(Body::new);

    if response.status().is_success() {
        if let Ok(kind) = HeaderValue::from_str(record.kind.as_str()) {
            response.headers_mut().insert(CONTENT_TYPE, kind);
        }
    }
    response
}

/// Read the document, rewrite its links, and send the rendered bytes.
///
/// Validators come from the cache record: `Last-Modified` from the file's
/// modification time and a strong `ETag` from its fingerprint. Normalization
/// is deterministic for a given prefix set, so both hold for the rewritten
/// body as well.
pub async fn serve_normalized(
    record: &FileRecord,
    normalizer: &Arc<LinkNormalizer>,
    headers: &HeaderMap,
) -> Result<Response, ServeError> {
    let etag = format!("\"{}\"", record.fingerprint);
    let last_modified = httpdate::fmt_http_date(record.modified);

    match precondition(headers, &etag, record.modified) {
        Precondition::Proceed => {}
        Precondition::NotModified => {
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            set_validators(response.headers_mut(), &etag, &last_modified);
            return Ok(response);
        }
        Precondition::Failed => return Ok(status_text(StatusCode::PRECONDITION_FAILED)),
    }

    let html = tokio::fs::read(&record.location)
        .await
        .map_err(|source| ServeError::Read {
            path: record.location.clone(),
            source,
        })?;

    let encoding = record
        .kind
        .charset()
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or_else(|| charset::sniff_html(&html));
    let normalizer = Arc::clone(normalizer);
    let body = tokio::task::spawn_blocking(move || normalizer.normalize_as(&html, encoding)).await??;

    let len = body.len() as u64;
    let mut response = match byte_range(headers, &etag, record.modified, len) {
        ByteRange::Full => (StatusCode::OK, body).into_response(),
        ByteRange::Partial(range) => {
            let content_range = format!("bytes {}-{}/{}", range.start, range.end - 1, len);
            let part = body[range.start as usize..range.end as usize].to_vec();
            let mut response = (StatusCode::PARTIAL_CONTENT, part).into_response();
            insert(response.headers_mut(), CONTENT_RANGE, &content_range);
            response
        }
        ByteRange::Unsatisfiable => {
            let mut response = status_text(StatusCode::RANGE_NOT_SATISFIABLE);
            insert(response.headers_mut(), CONTENT_RANGE, &format!("bytes */{}", len));
            return Ok(response);
        }
    };

    let headers = response.headers_mut();
    insert(headers, CONTENT_TYPE, record.kind.as_str());
    insert(headers, ACCEPT_RANGES, "bytes");
    set_validators(headers, &etag, &last_modified);
    Ok(response)
}

/// Result of evaluating the conditional request headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Precondition {
    Proceed,
    NotModified,
    Failed,
}

/// `If-Unmodified-Since`, then `If-None-Match`, then `If-Modified-Since`
/// (ignored when `If-None-Match` is present).
fn precondition(headers: &HeaderMap, etag: &str, modified: SystemTime) -> Precondition {
    if let Some(since) = header_date(headers, IF_UNMODIFIED_SINCE) {
        if !not_after(modified, since) {
            return Precondition::Failed;
        }
    }
    if let Some(tags) = header_str(headers, IF_NONE_MATCH) {
        return if etag_listed(tags, etag) {
            Precondition::NotModified
        } else {
            Precondition::Proceed
        };
    }
    if let Some(since) = header_date(headers, IF_MODIFIED_SINCE) {
        if not_after(modified, since) {
            return Precondition::NotModified;
        }
    }
    Precondition::Proceed
}

/// A single byte range requested by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ByteRange {
    Full,
    Partial(Range<u64>),
    Unsatisfiable,
}

/// Single `bytes=` ranges only; multipart requests and malformed headers get
/// the full body. A stale `If-Range` validator also falls back to the full body.
fn byte_range(headers: &HeaderMap, etag: &str, modified: SystemTime, len: u64) -> ByteRange {
    let Some(spec) = header_str(headers, RANGE).and_then(|v| v.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if let Some(validator) = header_str(headers, IF_RANGE) {
        let fresh = if validator.starts_with('"') {
            validator == etag
        } else {
            httpdate::parse_http_date(validator)
                .ok()
                .is_some_and(|date| unix_secs(date).is_some() && unix_secs(date) == unix_secs(modified))
        };
        if !fresh {
            return ByteRange::Full;
        }
    }
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };

    match (first.trim(), last.trim()) {
        ("", suffix) => match suffix.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(_) if len == 0 => ByteRange::Unsatisfiable,
            Ok(n) => ByteRange::Partial(len.saturating_sub(n)..len),
            Err(_) => ByteRange::Full,
        },
        (start, end) => {
            let Ok(start) = start.parse::<u64>() else {
                return ByteRange::Full;
            };
            let end = match end {
                "" => len,
                end => match end.parse::<u64>() {
                    Ok(end) if end >= start => (end + 1).min(len),
                    _ => return ByteRange::Full,
                },
            };
            if start >= len {
                ByteRange::Unsatisfiable
            } else {
                ByteRange::Partial(start..end)
            }
        }
    }
}

fn etag_listed(tags: &str, etag: &str) -> bool {
    tags.split(',')
        .map(|tag| tag.trim())
        .any(|tag| tag == "*" || tag.strip_prefix("W/").unwrap_or(tag) == etag)
}

fn set_validators(headers: &mut HeaderMap, etag: &str, last_modified: &str) {
    insert(headers, ETAG, etag);
    insert(headers, LAST_MODIFIED, last_modified);
}

fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_date(headers: &HeaderMap, name: HeaderName) -> Option<SystemTime> {
    header_str(headers, name).and_then(|v| httpdate::parse_http_date(v).ok())
}

/// Whether `modified` is at or before `since`, to the second.
fn not_after(modified: SystemTime, since: SystemTime) -> bool {
    match (unix_secs(modified), unix_secs(since)) {
        (Some(modified), Some(since)) => modified <= since,
        _ => false,
    }
}

fn unix_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}
