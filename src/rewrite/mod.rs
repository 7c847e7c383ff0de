//! HTML link rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! HTML bytes of one served document
//!     → normalizer.rs (parse into a private DOM)
//!     → element walk: a[href], link[href], script[src], img[src], img[srcset]
//!     → prefix.rs (strip site prefix → root-relative value)
//!     → serialize DOM → rewritten bytes
//! ```
//!
//! # Design Decisions
//! - Pure transform: one call owns its tree, nothing shared is mutated
//! - Only tag attributes change; script and style bodies are never touched
//! - Idempotent: rewritten values no longer match any prefix

pub mod normalizer;
pub mod prefix;

pub use normalizer::{LinkNormalizer, NormalizeError};
pub use prefix::PrefixSet;
