//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Configure log level from config, overridable via `RUST_LOG`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Fields (method, path, outcome, request_id) rather than formatted strings

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives for a configured log level.
pub fn default_directives(log_level: &str) -> String {
    format!("archive_mirror={},tower_http={}", log_level, log_level)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(log_level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        let directives = default_directives("debug");
        assert_eq!(directives, "archive_mirror=debug,tower_http=debug");
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
