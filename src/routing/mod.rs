//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (method, path + query)
//!     → resolver.rs method gate (GET only)
//!     → exact key
//!     → alternate decodings (%2C / %7C, then full percent-decoding)
//!     → <path>/index.html redirect
//!     → Return: Found(FileRecord) | Redirect | NotFound | MethodRejected
//! ```
//!
//! # Design Decisions
//! - Resolution reads the immutable cache only (no locks)
//! - Deterministic: same target always resolves the same way
//! - First match wins, in the fixed order above

pub mod resolver;

pub use resolver::{resolve, Resolution};
