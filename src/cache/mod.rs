//! Site file cache subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (blocking, before the listener binds):
//!     public dir
//!     → file_cache.rs (walk tree, read each file once)
//!     → content (fingerprint + classify)
//!     → FileCache (path → FileRecord, immutable)
//!     → report.rs (optional checksum / duplicate / kind listings)
//!
//! Per request:
//!     routing looks up FileRecord by root-relative path (read-only)
//! ```
//!
//! # Design Decisions
//! - Built exactly once; no refresh, no persistence across restarts
//! - Any walk, stat, or read error aborts the build (no partial cache)
//! - Shared as `Arc<FileCache>`; no locks since nothing writes after build
//! - Duplicate content is reported, never deduplicated away

pub mod file_cache;
pub mod report;

pub use file_cache::{CacheError, FileCache, FileRecord};
pub use report::{write_reports, ReportError};
