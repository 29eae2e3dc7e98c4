//! HTTP metrics middleware.
//!
//! Layered on the router, so every route and the pipeline fallback are
//! counted, including framework rejections such as 405 and 413.

use crate::observability::metrics::record_http_request;
use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

/// Path label for requests served by the filter pipeline fallback
pub const PIPELINE_PATH_LABEL: &str = "/protected";

/// Record method, route, status and duration of every request.
///
/// The path label is the matched route template; anything without one went
/// to the pipeline and shares [`PIPELINE_PATH_LABEL`], which keeps label
/// cardinality bounded.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| PIPELINE_PATH_LABEL.to_string(), |p| p.as_str().to_string());

    let response = next.run(request).await;

    record_http_request(
        method.as_str(),
        &route,
        response.status().as_u16(),
        started.elapsed(),
    );
    response
}
