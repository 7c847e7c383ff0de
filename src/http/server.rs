//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the site handler
//! - Wire up middleware (tracing, timeout, request ID)
//! - Bind server to listener
//! - Dispatch requests through path resolution
//! - Serve raw or normalized content
//! - Observability (metrics, per-request outcome logs)

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::FileCache;
use crate::config::MirrorConfig;
use crate::http::request::{request_id, MakeRequestUuidV4};
use crate::http::response::{self, Outcome};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::rewrite::{LinkNormalizer, PrefixSet};
use crate::routing::{resolve, Resolution};

/// Application state injected into handlers.
///
/// Everything here is immutable after startup and shared without locks.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<FileCache>,
    pub normalizer: Arc<LinkNormalizer>,
}

impl AppState {
    pub fn new(cache: Arc<FileCache>, prefixes: PrefixSet) -> Self {
        Self {
            cache,
            normalizer: Arc::new(LinkNormalizer::new(Arc::new(prefixes))),
        }
    }
}

/// HTTP server for the mirrored site.
pub struct HttpServer {
    router: Router,
    config: MirrorConfig,
}

impl HttpServer {
    /// Create a new HTTP server over an already-built cache.
    pub fn new(config: MirrorConfig, cache: Arc<FileCache>) -> Self {
        let state = AppState::new(cache, PrefixSet::new(config.site.prefixes.clone()));
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &MirrorConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(site_handler))
            .route("/", any(site_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Run the server until a shutdown signal arrives, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }
}

/// Site handler.
/// Resolves the request against the cache and serves the result.
async fn site_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let (outcome, response) = match resolve(&state.cache, &method, &target) {
        Resolution::MethodRejected => {
            tracing::info!(request_id = %request_id, method = %method, path = %target, "Method not allowed");
            (Outcome::MethodRejected, response::status_text(StatusCode::UNAUTHORIZED))
        }
        Resolution::NotFound => {
            tracing::info!(request_id = %request_id, method = %method, path = %target, "Not found");
            (Outcome::NotFound, response::status_text(StatusCode::NOT_FOUND))
        }
        Resolution::Redirect(location) => {
            tracing::info!(request_id = %request_id, method = %method, path = %target, location = %location, "Redirecting to index");
            (Outcome::Redirected, response::found(&location))
        }
        Resolution::Found(record) if record.kind.is_html() => {
            match response::serve_normalized(record, &state.normalizer, request.headers()).await {
                Ok(response) => {
                    tracing::info!(
                        request_id = %request_id,
                        method = %method,
                        path = %target,
                        file = %record.path,
                        fingerprint = %record.fingerprint,
                        kind = %record.kind,
                        "Serving normalized document"
                    );
                    (Outcome::ServedNormalized, response)
                }
                Err(e) => {
                    tracing::error!(request_id = %request_id, method = %method, path = %target, file = %record.path, error = %e, "Failed to normalize document");
                    (Outcome::InternalError, response::status_text(StatusCode::INTERNAL_SERVER_ERROR))
                }
            }
        }
        Resolution::Found(record) => {
            tracing::info!(request_id = %request_id, method = %method, path = %target, file = %record.path, kind = %record.kind, "Serving file");
            (Outcome::ServedRaw, response::serve_raw(record, request).await)
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), outcome.as_str(), start_time);
    response
}
