//! Startup orchestration.
//!
//! # Responsibilities
//! - Resolve the public directory and build the file cache
//! - Write the optional report files
//! - Start the metrics exporter when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - The cache is complete before the listener binds (no partial cache)
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::cache::{write_reports, CacheError, FileCache, ReportError};
use crate::config::{MirrorConfig, SiteConfig};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::resolver::shadowed_keys;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot open public directory {path}: {source}")]
    PublicDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error("cache build task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("invalid {field} {value:?}")]
    Address { field: &'static str, value: String },

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Build the file cache for `site` and write reports if configured.
///
/// The walk runs on the blocking pool; this returns only once every file is
/// fingerprinted and classified.
pub async fn build_site(site: &SiteConfig) -> Result<Arc<FileCache>, StartupError> {
    let root = std::fs::canonicalize(&site.public_dir).map_err(|source| StartupError::PublicDir {
        path: site.public_dir.clone(),
        source,
    })?;
    tracing::info!(root = %root.display(), "Building file cache");

    let cache = tokio::task::spawn_blocking(move || FileCache::build(&root)).await??;
    metrics::record_cache_size(cache.len());

    for (decoded, encoded) in shadowed_keys(&cache) {
        tracing::warn!(
            decoded = %decoded,
            encoded = %encoded,
            "Encoded filename shadows decoded one for fallback lookups"
        );
    }

    if let Some(dir) = &site.report_dir {
        write_reports(&cache, dir)?;
    }

    Ok(Arc::new(cache))
}

/// Bind the configured address.
pub async fn bind(config: &MirrorConfig) -> Result<TcpListener, StartupError> {
    let address = &config.listener.bind_address;
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;
    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listening for connections");
    }
    Ok(listener)
}

/// Full startup sequence, then serve until `shutdown` fires.
pub async fn run(config: MirrorConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    let cache = build_site(&config.site).await?;
    if shutdown.is_triggered() {
        tracing::info!("Stop requested during startup; not serving");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::Address {
                field: "observability.metrics_address",
                value: config.observability.metrics_address.clone(),
            })?;
        metrics::init_metrics(addr)?;
    }

    let listener = bind(&config).await?;
    let server = HttpServer::new(config, cache);
    server
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_site_writes_reports() {
        let public = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        std::fs::write(public.path().join("a.css"), "p{}").unwrap();
        std::fs::write(public.path().join("b.css"), "p{}").unwrap();

        let site = SiteConfig {
            public_dir: public.path().to_path_buf(),
            report_dir: Some(data.path().to_path_buf()),
            prefixes: vec!["http://example.com/".to_string()],
        };
        let cache = build_site(&site).await.unwrap();
        assert_eq!(cache.len(), 2);

        let dups = std::fs::read_to_string(data.path().join("b58.dups")).unwrap();
        assert!(dups.contains("  a.css\n  b.css\n"));
    }

    #[tokio::test]
    async fn test_missing_public_dir_is_fatal() {
        let site = SiteConfig {
            public_dir: PathBuf::from("/definitely/not/here"),
            ..SiteConfig::default()
        };
        let err = build_site(&site).await.unwrap_err();
        assert!(matches!(err, StartupError::PublicDir { .. }));
    }

    #[tokio::test]
    async fn test_stop_before_bind_skips_serving() {
        let public = tempfile::tempdir().unwrap();
        std::fs::write(public.path().join("index.html"), "<p>hi</p>").unwrap();

        let mut config = MirrorConfig::default();
        config.site.public_dir = public.path().to_path_buf();
        config.listener.bind_address = "127.0.0.1:0".to_string();

        let shutdown = Shutdown::new();
        shutdown.trigger();
        let finished = tokio::time::timeout(std::time::Duration::from_secs(5), run(config, &shutdown)).await;
        assert!(matches!(finished, Ok(Ok(()))));
    }
}
