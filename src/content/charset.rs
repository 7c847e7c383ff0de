//! Character encoding of HTML documents.
//!
//! Archived pages predate UTF-8 everywhere, so the encoding is taken from the
//! document itself: byte-order mark, then a `<meta>` declaration in the first
//! kilobyte, then UTF-8 if the bytes are valid, otherwise windows-1252.

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252, X_USER_DEFINED};

/// Bytes scanned for a `<meta>` charset declaration.
const PRESCAN_LEN: usize = 1024;

/// Encoding used to decode `bytes` as an HTML document.
pub fn sniff_html(bytes: &[u8]) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if let Some(encoding) = meta_charset(&bytes[..bytes.len().min(PRESCAN_LEN)]) {
        return encoding;
    }
    if Encoding::utf8_valid_up_to(bytes) == bytes.len() {
        UTF_8
    } else {
        WINDOWS_1252
    }
}

/// Charset label advertised for a document decoded with `encoding`.
///
/// UTF-16 documents are re-emitted as UTF-8.
pub fn label(encoding: &'static Encoding) -> String {
    encoding.output_encoding().name().to_ascii_lowercase()
}

/// First `charset=` found inside a `<meta ...>` tag, covering both
/// `<meta charset="x">` and `<meta http-equiv content="...; charset=x">`.
fn meta_charset(head: &[u8]) -> Option<&'static Encoding> {
    let lower = head.to_ascii_lowercase();
    let mut rest = &lower[..];

    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start + 5..];
        let end = tag.iter().position(|&b| b == b'>').unwrap_or(tag.len());
        let tag = &tag[..end];

        if let Some(encoding) = find(tag, b"charset").and_then(|at| charset_value(&tag[at + 7..])) {
            // A page claiming UTF-16 in ASCII-compatible bytes is really UTF-8.
            if encoding == UTF_16LE || encoding == UTF_16BE {
                return Some(UTF_8);
            }
            if encoding == X_USER_DEFINED {
                return Some(WINDOWS_1252);
            }
            return Some(encoding);
        }
        rest = &tag[end..];
    }
    None
}

fn charset_value(after: &[u8]) -> Option<&'static Encoding> {
    let after = skip_space(after);
    let after = skip_space(after.strip_prefix(b"=")?);
    let after = after
        .strip_prefix(b"\"")
        .or_else(|| after.strip_prefix(b"'"))
        .unwrap_or(after);
    let len = after
        .iter()
        .position(|b| matches!(b, b'"' | b'\'' | b';' | b'/' | b'>') || b.is_ascii_whitespace())
        .unwrap_or(after.len());
    Encoding::for_label(&after[..len])
}

fn skip_space(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::{SHIFT_JIS, WINDOWS_1251};

    #[test]
    fn test_bom_wins() {
        assert_eq!(sniff_html(b"\xef\xbb\xbf<meta charset=\"latin1\">"), UTF_8);
        assert_eq!(sniff_html(b"\xff\xfe<\x00p\x00>\x00"), UTF_16LE);
        assert_eq!(label(UTF_16LE), "utf-8");
    }

    #[test]
    fn test_meta_declarations() {
        assert_eq!(sniff_html(b"<html><head><meta charset=\"iso-8859-1\">"), WINDOWS_1252);
        assert_eq!(sniff_html(b"<META CHARSET = 'Shift_JIS' >"), SHIFT_JIS);
        assert_eq!(
            sniff_html(b"<meta http-equiv=\"Content-Type\" content=\"text/html; charset=windows-1251\">"),
            WINDOWS_1251
        );
        assert_eq!(sniff_html(b"<meta name=\"x\"><meta charset=utf-16>"), UTF_8);
    }

    #[test]
    fn test_undeclared_documents() {
        assert_eq!(sniff_html("<p>caf\u{e9}</p>".as_bytes()), UTF_8);
        assert_eq!(sniff_html(b"<p>caf\xe9</p>"), WINDOWS_1252);
        assert_eq!(sniff_html(b"<meta charset=\"bogus\"><p>hi</p>"), UTF_8);
    }

    #[test]
    fn test_label() {
        assert_eq!(label(UTF_8), "utf-8");
        assert_eq!(label(WINDOWS_1252), "windows-1252");
        assert_eq!(label(SHIFT_JIS), "shift_jis");
    }
}
