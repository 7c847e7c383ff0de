//! Archive mirror (v1)
//!
//! Serves a folder of exported pages as if it were the live site.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────┐
//!                     │                ARCHIVE MIRROR                  │
//!                     │                                                │
//!   public dir ───────┼─▶ cache (walk, fingerprint, classify) ──┐      │
//!                     │        │                                │      │
//!                     │        └─▶ report files (optional)      │      │
//!                     │                                         ▼      │
//!   Client Request ───┼─▶ http server ─▶ routing (resolve) ─▶ FileCache │
//!                     │                      │                         │
//!                     │          ┌───────────┴──────────┐              │
//!                     │          ▼                      ▼              │
//!   Client Response ◀─┼── raw file (ServeFile)   rewrite (HTML links)  │
//!                     └───────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use archive_mirror::config::{read_config, validate_config, ConfigError, MirrorConfig};
use archive_mirror::lifecycle::{signals, startup, Shutdown};
use archive_mirror::observability::logging;

#[derive(Parser)]
#[command(name = "archive-mirror")]
#[command(about = "Serve an exported website with its absolute links made root-relative", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Location of public files
    #[arg(long)]
    public: Option<PathBuf>,

    /// Location of data files (checksum, duplicate and kind reports)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    /// Absolute URL prefix treated as the site root (repeatable)
    #[arg(long = "prefix")]
    prefixes: Vec<String>,
}

impl Cli {
    fn into_config(self) -> Result<MirrorConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => MirrorConfig::default(),
        };
        if let Some(public) = self.public {
            config.site.public_dir = public;
        }
        if let Some(data) = self.data {
            config.site.report_dir = Some(data);
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if !self.prefixes.is_empty() {
            config.site.prefixes = self.prefixes;
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let started = Instant::now();
    let config = Cli::parse().into_config()?;

    logging::init(&config.observability.log_level);

    tracing::info!("archive-mirror v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        public_dir = %config.site.public_dir.display(),
        bind_address = %config.listener.bind_address,
        prefixes = ?config.site.prefixes,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());

    if let Err(e) = startup::run(config, &shutdown).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e.into());
    }

    tracing::info!(elapsed = ?started.elapsed(), "Shutdown complete");
    Ok(())
}
