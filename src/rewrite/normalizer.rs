//! Tree-based rewrite of site-absolute links in HTML documents.

use encoding_rs::{Encoding, UTF_8};
use html5ever::serialize::{serialize, Serialize, SerializeOpts, Serializer, TraversalScope};
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{parse_document, Attribute, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::io;
use std::sync::Arc;
use thiserror::Error;

use super::prefix::PrefixSet;
use crate::content::charset;

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The rewritten tree could not be serialized.
    #[error("failed to render HTML: {0}")]
    Render(#[source] io::Error),
}

/// Rewrites `href`/`src`/`srcset` values that start with a site prefix into
/// root-relative paths.
#[derive(Debug, Clone)]
pub struct LinkNormalizer {
    prefixes: Arc<PrefixSet>,
}

impl LinkNormalizer {
    pub fn new(prefixes: Arc<PrefixSet>) -> Self {
        Self { prefixes }
    }

    pub fn prefixes(&self) -> &PrefixSet {
        &self.prefixes
    }

    /// Normalize `html`, sniffing its encoding from the bytes.
    pub fn normalize(&self, html: &[u8]) -> Result<Vec<u8>, NormalizeError> {
        self.normalize_as(html, charset::sniff_html(html))
    }

    /// Decode `html` as `encoding`, rewrite qualifying attributes, and render
    /// the result back into the same encoding (UTF-8 for UTF-16 input).
    ///
    /// A byte-order mark overrides `encoding`.
    pub fn normalize_as(&self, html: &[u8], encoding: &'static Encoding) -> Result<Vec<u8>, NormalizeError> {
        let (text, encoding, malformed) = encoding.decode(html);
        if malformed {
            tracing::debug!(encoding = encoding.name(), "Replaced malformed byte sequences while decoding");
        }
        let dom = parse_document(RcDom::default(), ParseOpts::default()).one(&*text);

        let rewritten = self.rewrite_tree(&dom.document);
        tracing::trace!(rewritten, "Normalized document links");

        let mut out = Vec::with_capacity(html.len());
        let opts = SerializeOpts {
            traversal_scope: TraversalScope::ChildrenOnly(None),
            ..Default::default()
        };
        serialize(&mut out, &Tree(dom.document.clone()), opts).map_err(NormalizeError::Render)?;

        let output = encoding.output_encoding();
        if output == UTF_8 {
            return Ok(out);
        }
        let rendered = String::from_utf8(out)
            .map_err(|e| NormalizeError::Render(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let (bytes, _, _) = output.encode(&rendered);
        Ok(bytes.into_owned())
    }

    /// Depth-first walk over every element, template contents included;
    /// returns the number of attribute values changed.
    fn rewrite_tree(&self, root: &Handle) -> usize {
        let mut rewritten = 0;
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            if let NodeData::Element { ref name, ref attrs, .. } = node.data {
                rewritten += self.rewrite_attrs(&name.local, &mut attrs.borrow_mut());
            }
            stack.extend(children(&node).into_iter().rev());
        }
        rewritten
    }

    fn rewrite_attrs(&self, tag: &str, attrs: &mut [Attribute]) -> usize {
        let mut rewritten = 0;
        for attr in attrs.iter_mut() {
            let value = match (tag, &*attr.name.local) {
                ("a" | "link", "href") | ("script" | "img", "src") => self.prefixes.strip(&attr.value),
                ("img", "srcset") => self.prefixes.strip_srcset(&attr.value),
                _ => None,
            };
            if let Some(value) = value {
                attr.value = StrTendril::from(value);
                rewritten += 1;
            }
        }
        rewritten
    }
}

/// Child nodes, reading through to the content fragment of a `<template>`.
fn children(node: &Handle) -> Vec<Handle> {
    if let NodeData::Element { ref template_contents, .. } = node.data {
        if let Some(contents) = template_contents.borrow().as_ref() {
            return contents.children.borrow().clone();
        }
    }
    node.children.borrow().clone()
}

/// Serializes a document's children.
///
/// `markup5ever_rcdom`'s own impl skips template contents.
struct Tree(Handle);

enum Step {
    Open(Handle),
    Close(QualName),
}

impl Serialize for Tree {
    fn serialize<S: Serializer>(&self, serializer: &mut S, _scope: TraversalScope) -> io::Result<()> {
        let mut steps: Vec<Step> = children(&self.0).into_iter().rev().map(Step::Open).collect();
        while let Some(step) = steps.pop() {
            let node = match step {
                Step::Close(name) => {
                    serializer.end_elem(name)?;
                    continue;
                }
                Step::Open(node) => node,
            };
            match node.data {
                NodeData::Element { ref name, ref attrs, .. } => {
                    serializer.start_elem(
                        name.clone(),
                        attrs.borrow().iter().map(|attr| (&attr.name, &attr.value[..])),
                    )?;
                    steps.push(Step::Close(name.clone()));
                    steps.extend(children(&node).into_iter().rev().map(Step::Open));
                }
                NodeData::Text { ref contents } => serializer.write_text(&contents.borrow())?,
                NodeData::Comment { ref contents } => serializer.write_comment(contents)?,
                NodeData::Doctype { ref name, .. } => serializer.write_doctype(name)?,
                NodeData::ProcessingInstruction { ref target, ref contents } => {
                    serializer.write_processing_instruction(target, contents)?
                }
                NodeData::Document => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> LinkNormalizer {
        LinkNormalizer::new(Arc::new(PrefixSet::new(["http://example.com/", "https://example.com/"])))
    }

    fn normalize(html: &str) -> String {
        String::from_utf8(normalizer().normalize(html.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_anchor_rewritten() {
        let out = normalize(r#"<a href="http://example.com/a/b">x</a>"#);
        assert!(out.contains(r#"<a href="/a/b">x</a>"#), "{}", out);
    }

    #[test]
    fn test_foreign_link_untouched() {
        let out = normalize(r#"<a href="http://other.org/x">x</a>"#);
        assert!(out.contains(r#"<a href="http://other.org/x">x</a>"#), "{}", out);
    }

    #[test]
    fn test_all_attribute_pairs() {
        let out = normalize(concat!(
            r#"<html><head>"#,
            r#"<link rel="stylesheet" href="https://example.com/style.css">"#,
            r#"<script src="http://example.com/js/app.js"></script>"#,
            r#"</head><body>"#,
            r#"<img src="http://example.com/logo.png" srcset="http://example.com/a.png 1x, http://example.com/b.png 2x">"#,
            r#"</body></html>"#,
        ));
        assert!(out.contains(r#"<link rel="stylesheet" href="/style.css">"#), "{}", out);
        assert!(out.contains(r#"<script src="/js/app.js"></script>"#), "{}", out);
        assert!(out.contains(r#"<img src="/logo.png" srcset="/a.png 1x,/b.png 2x">"#), "{}", out);
    }

    #[test]
    fn test_other_attributes_and_tags_untouched() {
        let out = normalize(concat!(
            r#"<div data-href="http://example.com/x"><img alt="http://example.com/y">"#,
            r#"<a name="top" title="http://example.com/t" href="http://example.com/">home</a>"#,
            r#"<form action="http://example.com/post"></form></div>"#,
        ));
        assert!(out.contains(r#"data-href="http://example.com/x""#));
        assert!(out.contains(r#"alt="http://example.com/y""#));
        assert!(out.contains(r#"<a name="top" title="http://example.com/t" href="/">home</a>"#), "{}", out);
        assert!(out.contains(r#"action="http://example.com/post""#));
    }

    #[test]
    fn test_script_and_style_bodies_untouched() {
        let out = normalize(concat!(
            r#"<script>var u = "http://example.com/a";</script>"#,
            r#"<style>body { background: url(http://example.com/bg.png) }</style>"#,
        ));
        assert!(out.contains(r#"var u = "http://example.com/a";"#));
        assert!(out.contains("url(http://example.com/bg.png)"));
    }

    #[test]
    fn test_idempotent() {
        let input = concat!(
            "<!DOCTYPE html><html><head><title>t</title>",
            r#"<link href="http://example.com/s.css" rel="stylesheet"></head>"#,
            r#"<body><p>Hello &amp; welcome</p><a href="https://example.com/p?id=1&amp;x=2">p</a>"#,
            r#"<img srcset="http://example.com/a.png 1x, b.png 2x"></body></html>"#,
        );
        let once = normalizer().normalize(input.as_bytes()).unwrap();
        let twice = normalizer().normalize(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_template_contents_kept_and_rewritten() {
        let out = normalize(r#"<body><template><a href="http://example.com/t">t</a><p>x</p></template></body>"#);
        assert!(out.contains(r#"<template><a href="/t">t</a><p>x</p></template>"#), "{}", out);
    }

    #[test]
    fn test_declared_latin1_bytes_preserved() {
        let input: &[u8] = b"<html><head><meta charset=\"iso-8859-1\"></head><body>\
            <p title=\"caf\xe9\">caf\xe9</p><a href=\"http://example.com/x\">x</a></body></html>";
        let out = normalizer().normalize(input).unwrap();
        let needle: &[u8] = b"<p title=\"caf\xe9\">caf\xe9</p><a href=\"/x\">x</a>";
        assert!(out.windows(needle.len()).any(|w| w == needle), "{}", String::from_utf8_lossy(&out));
    }

    #[test]
    fn test_explicit_encoding() {
        let out = normalizer()
            .normalize_as(b"<p>\xe0 la carte</p><img src=\"http://example.com/i.png\">", encoding_rs::WINDOWS_1252)
            .unwrap();
        let needle: &[u8] = b"<p>\xe0 la carte</p><img src=\"/i.png\">";
        assert!(out.windows(needle.len()).any(|w| w == needle), "{}", String::from_utf8_lossy(&out));
    }

    #[test]
    fn test_utf8_text_untouched() {
        let out = normalize("<p title=\"\u{e9}t\u{e9}\">\u{2603} snow</p>");
        assert!(out.contains("<p title=\"\u{e9}t\u{e9}\">\u{2603} snow</p>"), "{}", out);
    }

    #[test]
    fn test_empty_prefix_set_is_identity_on_links() {
        let normalizer = LinkNormalizer::new(Arc::new(PrefixSet::default()));
        let out = normalizer
            .normalize(br#"<a href="http://example.com/a">a</a>"#)
            .unwrap();
        assert!(String::from_utf8(out).unwrap().contains(r#"href="http://example.com/a""#));
    }
}
