//! MIME classification.
//!
//! # Responsibilities
//! - Decide a file's content type once, at cache-build time
//! - Prefer content sniffing over file extensions
//! - Correct the classic stylesheet-sniffs-as-plain-text case
//!
//! # Design Decisions
//! - Each classifier returns a confident kind or defers to the next one
//! - Chain order is the precedence; the first confident answer wins
//! - `application/octet-stream` only when every link defers

use std::fmt;
use std::path::Path;

use super::charset;

/// Number of leading bytes inspected by the sniffing classifiers.
const SNIFF_LEN: usize = 512;

/// The generic fallback when nothing recognises the content.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A resolved MIME content-type string, possibly with a charset parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kind(String);

impl Kind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The media type without parameters, e.g. `text/html` for
    /// `text/html; charset=utf-8`.
    pub fn essence(&self) -> &str {
        self.0.split(';').next().unwrap_or_default().trim()
    }

    /// Value of the `charset` parameter, if any.
    pub fn charset(&self) -> Option<&str> {
        self.0.split(';').skip(1).find_map(|param| {
            let (name, value) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| value.trim().trim_matches('"'))
        })
    }

    /// Whether documents of this kind go through link normalization.
    pub fn is_html(&self) -> bool {
        self.essence().eq_ignore_ascii_case("text/html")
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Input handed to every classifier in the chain.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    /// Root-relative path, possibly carrying a literal `?query` suffix.
    pub path: &'a str,
    /// Full file content.
    pub bytes: &'a [u8],
}

impl<'a> Sample<'a> {
    pub fn new(path: &'a str, bytes: &'a [u8]) -> Self {
        Self { path, bytes }
    }

    fn head(&self) -> &'a [u8] {
        &self.bytes[..self.bytes.len().min(SNIFF_LEN)]
    }

    /// Extension of the path with any query string removed, lowercased.
    fn extension(&self) -> Option<String> {
        let path = self.path.split('?').next().unwrap_or_default();
        Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

/// Outcome of one classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Confident answer; stops the chain.
    Kind(String),
    /// No opinion; ask the next classifier.
    Defer,
}

/// One link of the classification chain.
pub trait Classifier: Send + Sync + fmt::Debug {
    fn classify(&self, sample: &Sample<'_>) -> Verdict;
}

/// Ordered list of classifiers, queried until one is confident.
#[derive(Debug)]
pub struct ClassifierChain {
    links: Vec<Box<dyn Classifier>>,
}

impl ClassifierChain {
    pub fn new(links: Vec<Box<dyn Classifier>>) -> Self {
        Self { links }
    }

    /// Classify a file, falling back to `application/octet-stream`.
    pub fn classify(&self, path: &str, bytes: &[u8]) -> Kind {
        let sample = Sample::new(path, bytes);
        self.links
            .iter()
            .find_map(|link| match link.classify(&sample) {
                Verdict::Kind(kind) => Some(Kind(kind)),
                Verdict::Defer => None,
            })
            .unwrap_or_else(|| Kind::new(OCTET_STREAM))
    }
}

impl Default for ClassifierChain {
    fn default() -> Self {
        Self::new(vec![
            Box::new(MagicNumber),
            Box::new(Markup),
            Box::new(Json),
            Box::new(StylesheetExtension),
            Box::new(PlainText),
            Box::new(Signature),
        ])
    }
}

/// Magic-number detection backed by the `infer` crate.
///
/// Text matchers are skipped so markup is reported with its charset by
/// [`Markup`] instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct MagicNumber;

impl Classifier for MagicNumber {
    fn classify(&self, sample: &Sample<'_>) -> Verdict {
        match infer::get(sample.bytes) {
            Some(t) if t.matcher_type() != infer::MatcherType::Text => {
                Verdict::Kind(t.mime_type().to_string())
            }
            _ => Verdict::Defer,
        }
    }
}

const HTML_PATTERNS: &[&[u8]] = &[
    b"<!DOCTYPE HTML",
    b"<HTML",
    b"<HEAD",
    b"<SCRIPT",
    b"<IFRAME",
    b"<H1",
    b"<DIV",
    b"<FONT",
    b"<TABLE",
    b"<A",
    b"<STYLE",
    b"<TITLE",
    b"<B",
    b"<BODY",
    b"<BR",
    b"<P",
];

/// HTML and XML detection from the leading bytes of the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct Markup;

impl Classifier for Markup {
    fn classify(&self, sample: &Sample<'_>) -> Verdict {
        let head = trim_leading(strip_bom(sample.head()));

        if head.starts_with(b"<!--") || HTML_PATTERNS.iter().any(|p| starts_with_tag(head, p)) {
            let encoding = charset::sniff_html(sample.bytes);
            return Verdict::Kind(format!("text/html; charset={}", charset::label(encoding)));
        }
        if head.starts_with(b"<?xml") || starts_with_tag(head, b"<SVG") {
            if contains_ignore_case(head, b"<svg") {
                return Verdict::Kind("image/svg+xml".to_string());
            }
            return Verdict::Kind("text/xml; charset=utf-8".to_string());
        }
        Verdict::Defer
    }
}

/// JSON documents (object or array at the top level).
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl Classifier for Json {
    fn classify(&self, sample: &Sample<'_>) -> Verdict {
        let body = trim_leading(strip_bom(sample.bytes));
        if !matches!(body.first(), Some(b'{') | Some(b'[')) {
            return Verdict::Defer;
        }
        match serde_json::from_slice::<serde::de::IgnoredAny>(body) {
            Ok(_) => Verdict::Kind("application/json".to_string()),
            Err(_) => Verdict::Defer,
        }
    }
}

/// Textual content under a `.css` name is a stylesheet.
///
/// Stylesheets carry no magic bytes, so sniffers report them as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StylesheetExtension;

impl Classifier for StylesheetExtension {
    fn classify(&self, sample: &Sample<'_>) -> Verdict {
        if sample.extension().as_deref() == Some("css") && is_textual(sample.head()) {
            Verdict::Kind("text/css".to_string())
        } else {
            Verdict::Defer
        }
    }
}

/// Content without binary control bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl Classifier for PlainText {
    fn classify(&self, sample: &Sample<'_>) -> Verdict {
        let head = sample.head();
        if !is_textual(head) {
            return Verdict::Defer;
        }
        if is_utf8_prefix(head) {
            Verdict::Kind("text/plain; charset=utf-8".to_string())
        } else {
            Verdict::Kind("text/plain".to_string())
        }
    }
}

struct Pattern {
    /// `(offset, bytes)` pairs that must all match.
    parts: &'static [(usize, &'static [u8])],
    kind: &'static str,
}

const SIGNATURES: &[Pattern] = &[
    Pattern { parts: &[(0, b"GIF87a")], kind: "image/gif" },
    Pattern { parts: &[(0, b"GIF89a")], kind: "image/gif" },
    Pattern { parts: &[(0, b"\x89PNG\r\n\x1a\n")], kind: "image/png" },
    Pattern { parts: &[(0, b"\xff\xd8\xff")], kind: "image/jpeg" },
    Pattern { parts: &[(0, b"BM")], kind: "image/bmp" },
    Pattern { parts: &[(0, b"RIFF"), (8, b"WEBPVP")], kind: "image/webp" },
    Pattern { parts: &[(0, b"\x00\x00\x01\x00")], kind: "image/x-icon" },
    Pattern { parts: &[(0, b"\x00\x00\x02\x00")], kind: "image/x-icon" },
    Pattern { parts: &[(0, b"%PDF-")], kind: "application/pdf" },
    Pattern { parts: &[(0, b"%!PS-Adobe-")], kind: "application/postscript" },
    Pattern { parts: &[(0, b"OggS\x00")], kind: "application/ogg" },
    Pattern { parts: &[(0, b"PK\x03\x04")], kind: "application/zip" },
    Pattern { parts: &[(0, b"\x1f\x8b\x08")], kind: "application/x-gzip" },
    Pattern { parts: &[(0, b"Rar!\x1a\x07")], kind: "application/x-rar-compressed" },
    Pattern { parts: &[(0, b"wOFF")], kind: "font/woff" },
    Pattern { parts: &[(0, b"wOF2")], kind: "font/woff2" },
    Pattern { parts: &[(0, b"\x00\x01\x00\x00")], kind: "font/ttf" },
    Pattern { parts: &[(0, b"OTTO")], kind: "font/otf" },
    Pattern { parts: &[(0, b"\x00asm")], kind: "application/wasm" },
    Pattern { parts: &[(4, b"ftyp")], kind: "video/mp4" },
];

/// Small built-in table of common binary signatures.
///
/// Consulted after the heavier detectors have deferred.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signature;

impl Classifier for Signature {
    fn classify(&self, sample: &Sample<'_>) -> Verdict {
        let head = sample.head();
        SIGNATURES
            .iter()
            .find(|pattern| {
                pattern.parts.iter().all(|(offset, magic)| {
                    head.get(*offset..offset + magic.len()) == Some(*magic)
                })
            })
            .map(|pattern| Verdict::Kind(pattern.kind.to_string()))
            .unwrap_or(Verdict::Defer)
    }
}

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes)
}

fn trim_leading(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0c' | b'\r' | b' '))
        .unwrap_or(bytes.len());
    &bytes[start..]
}

/// Case-insensitive tag match followed by a tag-terminating byte.
fn starts_with_tag(head: &[u8], pattern: &[u8]) -> bool {
    if head.len() <= pattern.len() || !head[..pattern.len()].eq_ignore_ascii_case(pattern) {
        return false;
    }
    matches!(head[pattern.len()], b' ' | b'>' | b'\t' | b'\n' | b'\r' | b'/')
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

/// No byte from the WHATWG "binary data byte" set.
fn is_textual(head: &[u8]) -> bool {
    !head
        .iter()
        .any(|&b| matches!(b, 0x00..=0x08 | 0x0b | 0x0e..=0x1a | 0x1c..=0x1f))
}

/// Valid UTF-8, tolerating a multi-byte sequence cut off by the sniff window.
fn is_utf8_prefix(head: &[u8]) -> bool {
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}
