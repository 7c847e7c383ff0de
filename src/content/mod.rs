//! Content fingerprinting and classification subsystem.
//!
//! # Data Flow
//! ```text
//! (path, bytes) read once during the cache walk
//!     → fingerprint.rs (SHA-1 digest, base-58 text)
//!     → classify.rs (ordered classifier chain; charset.rs for HTML)
//!     → (Fingerprint, Kind) stored on the FileRecord
//! ```
//!
//! # Design Decisions
//! - Both operations are pure: identical input yields identical output
//! - Fingerprints identify duplicates for reporting, never for invalidation
//! - Classification precedence is an explicit chain, testable link by link

pub mod charset;
pub mod classify;
pub mod fingerprint;

pub use classify::{Classifier, ClassifierChain, Kind, Sample, Verdict};
pub use fingerprint::Fingerprint;
