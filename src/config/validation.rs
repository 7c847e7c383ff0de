//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate prefixes are absolute http(s) URLs ending in `/`
//! - Detect overlapping prefixes (first-match-wins would hide one)
//! - Validate addresses and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MirrorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::MirrorConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("site.public_dir must not be empty")]
    EmptyPublicDir,

    #[error("site.prefixes must contain at least one prefix")]
    NoPrefixes,

    #[error("prefix {prefix:?} is not an absolute http(s) URL: {reason}")]
    InvalidPrefix { prefix: String, reason: String },

    #[error("prefix {prefix:?} must end with '/'")]
    PrefixWithoutSlash { prefix: String },

    #[error("prefix {shadowed:?} is never used because {first:?} matches first")]
    OverlappingPrefix { first: String, shadowed: String },

    #[error("{field} {value:?} is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroTimeout,
}

/// Check a loaded configuration, collecting every problem found.
pub fn validate_config(config: &MirrorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.site.public_dir.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyPublicDir);
    }

    let prefixes = &config.site.prefixes;
    if prefixes.is_empty() {
        errors.push(ValidationError::NoPrefixes);
    }
    for prefix in prefixes {
        match Url::parse(prefix) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
            Ok(url) => errors.push(ValidationError::InvalidPrefix {
                prefix: prefix.clone(),
                reason: format!("unsupported scheme {:?}", url.scheme()),
            }),
            Err(e) => errors.push(ValidationError::InvalidPrefix {
                prefix: prefix.clone(),
                reason: e.to_string(),
            }),
        }
        if !prefix.ends_with('/') {
            errors.push(ValidationError::PrefixWithoutSlash {
                prefix: prefix.clone(),
            });
        }
    }
    for (i, first) in prefixes.iter().enumerate() {
        for later in &prefixes[i + 1..] {
            if later.starts_with(first.as_str()) {
                errors.push(ValidationError::OverlappingPrefix {
                    first: first.clone(),
                    shadowed: later.clone(),
                });
            }
        }
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
