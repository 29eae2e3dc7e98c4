//! Axum middleware shared by every route.

pub mod http_metrics;

pub use http_metrics::{http_metrics_middleware, PIPELINE_PATH_LABEL};
