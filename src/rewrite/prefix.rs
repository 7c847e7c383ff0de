//! Absolute URL prefixes that refer to the locally served root.

/// Ordered list of prefixes; the first match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixSet {
    prefixes: Vec<String>,
}

impl PrefixSet {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.prefixes
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// Root-relative form of `value`, or `None` when no prefix matches.
    ///
    /// `http://example.com/a/b` with prefix `http://example.com/` becomes `/a/b`.
    pub fn strip(&self, value: &str) -> Option<String> {
        self.prefixes
            .iter()
            .find_map(|prefix| value.strip_prefix(prefix.as_str()))
            .map(|rest| format!("/{}", rest))
    }

    /// Rewrite a `srcset` list segment by segment.
    ///
    /// Each comma-separated candidate is trimmed and rewritten on its own;
    /// segments are rejoined with `,` in their original order. Returns `None`
    /// when no segment matched, leaving the attribute untouched.
    pub fn strip_srcset(&self, value: &str) -> Option<String> {
        let mut changed = false;
        let segments: Vec<String> = value
            .split(',')
            .map(|segment| {
                let segment = segment.trim();
                match self.strip(segment) {
                    Some(rewritten) => {
                        changed = true;
                        rewritten
                    }
                    None => segment.to_string(),
                }
            })
            .collect();
        changed.then(|| segments.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> PrefixSet {
        PrefixSet::new(["http://example.com/", "https://example.com/"])
    }

    #[test]
    fn test_strip_matching_prefix() {
        assert_eq!(prefixes().strip("http://example.com/a/b").as_deref(), Some("/a/b"));
        assert_eq!(prefixes().strip("https://example.com/").as_deref(), Some("/"));
    }

    #[test]
    fn test_non_matching_untouched() {
        assert_eq!(prefixes().strip("http://other.org/x"), None);
        assert_eq!(prefixes().strip("/already/relative"), None);
        assert_eq!(prefixes().strip("http://example.com"), None);
    }

    #[test]
    fn test_first_prefix_wins() {
        let set = PrefixSet::new(["http://example.com/", "http://example.com/blog/"]);
        assert_eq!(set.strip("http://example.com/blog/x").as_deref(), Some("/blog/x"));
    }

    #[test]
    fn test_srcset_segments() {
        let rewritten = prefixes()
            .strip_srcset("http://example.com/a.png 1x, http://example.com/b.png 2x")
            .unwrap();
        assert_eq!(rewritten, "/a.png 1x,/b.png 2x");
    }

    #[test]
    fn test_srcset_mixed_segments_keep_count() {
        let rewritten = prefixes()
            .strip_srcset("http://cdn.org/a.png 480w, https://example.com/b.png 800w, c.png 1200w")
            .unwrap();
        assert_eq!(rewritten, "http://cdn.org/a.png 480w,/b.png 800w,c.png 1200w");
    }

    #[test]
    fn test_srcset_without_match_untouched() {
        assert_eq!(prefixes().strip_srcset("a.png 1x, b.png 2x"), None);
        assert_eq!(prefixes().strip_srcset("/a.png 1x,/b.png 2x"), None);
    }
}
