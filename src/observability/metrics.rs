//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mirror_requests_total` (counter): requests by method (`GET`/`other`), status, outcome
//! - `mirror_request_duration_seconds` (histogram): latency by outcome
//! - `mirror_cache_files` (gauge): files indexed at startup
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    ::metrics::counter!(
        "mirror_requests_total",
        "method" => method_label(method),
        "status" => status.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!("mirror_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Clients choose the method string; only `GET` is served, so everything else
/// shares one series.
fn method_label(method: &str) -> &'static str {
    if method == "GET" {
        "GET"
    } else {
        "other"
    }
}

pub fn record_cache_size(files: usize) {
    ::metrics::gauge!("mirror_cache_files").set(files as f64);
}
