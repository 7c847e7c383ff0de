//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the mirror.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the archive mirror.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MirrorConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Site content and link rewriting.
    pub site: SiteConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Site configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory holding the exported pages and assets.
    pub public_dir: PathBuf,

    /// Where to write the checksum, duplicate, and kind listings.
    /// Reports are skipped when unset.
    pub report_dir: Option<PathBuf>,

    /// Absolute URL prefixes that refer to this site's root.
    /// Checked in order; the first match wins.
    pub prefixes: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("../../playbymail.net"),
            report_dir: None,
            prefixes: vec![
                "http://playbymail.net/".to_string(),
                "https://playbymail.net/".to_string(),
            ],
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
