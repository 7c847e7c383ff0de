//! Content fingerprints.
//!
//! A fingerprint is the SHA-1 digest of a file's bytes, encoded with the
//! base-58 (Bitcoin) alphabet so it prints cleanly in plain-text reports.

use sha1::{Digest, Sha1};
use std::fmt;

/// Printable, content-derived identifier of a byte buffer.
///
/// Two files with the same fingerprint are treated as byte-identical.
/// Not a security credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the given bytes.
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha1::digest(bytes);
        Self(bs58::encode(digest.as_slice()).into_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Pass the formatter through so width/alignment flags apply.
        f.pad(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        assert_eq!(Fingerprint::of(b"").as_str(), "43LNwPunkRCSovrjPyoxpukWVtnU");
        assert_eq!(Fingerprint::of(b"hello world").as_str(), "bVK3NYBMKa8oh2E2cwSTfLNxJKn");
    }

    #[test]
    fn test_deterministic_and_distinct() {
        let a = Fingerprint::of(b"<html></html>");
        let b = Fingerprint::of(b"<html></html>");
        let c = Fingerprint::of(b"<html> </html>");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_alphabet_is_print_safe() {
        let fp = Fingerprint::of(b"some stylesheet body { color: red }");
        assert!(fp.as_str().len() <= 28);
        assert!(!fp.as_str().contains(['0', 'O', 'I', 'l', '+', '/', '=']));
    }

    #[test]
    fn test_display_honours_width() {
        let fp = Fingerprint::of(b"");
        assert_eq!(format!("{:<30}|", fp), "43LNwPunkRCSovrjPyoxpukWVtnU  |");
    }
}
