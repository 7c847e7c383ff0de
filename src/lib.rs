//! Archive mirror library.
//!
//! Serves an exported copy of a website from a directory tree, rewriting
//! absolute links to the site's own hostname into root-relative paths.

pub mod cache;
pub mod config;
pub mod content;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod routing;

pub use cache::{FileCache, FileRecord};
pub use config::schema::MirrorConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rewrite::{LinkNormalizer, PrefixSet};
