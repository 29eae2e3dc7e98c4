//! HTTP routes for the AAA service.

use crate::app::AaaCore;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the application routes.
///
/// - `/health` - liveness check
/// - `/metrics` - Prometheus scrape endpoint
/// - `/oauth2/token` - Basic credentials for a bearer token
/// - anything else - the filter pipeline in front of the whoami terminal
pub fn build_routes(core: Arc<AaaCore>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let core_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/oauth2/token", post(handlers::token_handler))
        .fallback(handlers::pipeline_handler)
        .with_state(core);

    core_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
