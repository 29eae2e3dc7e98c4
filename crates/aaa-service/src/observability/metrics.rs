//! Metrics definitions for the AAA service
//!
//! All metrics follow Prometheus naming conventions:
//! - `aaa_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `validator`: bounded by the registered validators (basic, bearer, ...)
//! - `status`: success, error, no_match
//! - `outcome`: success, failure
//! - `error_category`: 4 values (authentication, cryptographic, configuration, internal)
//! - `operation`: encrypt, decrypt
//! - `path`: route template, or `/protected` for the filter pipeline

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and return the handle used by `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("aaa_http".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP latency buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Validation Metrics
// ============================================================================

/// Record a token validator outcome
///
/// Metric: `aaa_token_validations_total`
/// Labels: `validator`, `status`, `error_category`
pub fn record_token_validation(validator: &str, status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("aaa_token_validations_total",
        "validator" => validator.to_string(),
        "status" => status.to_string(),
        "error_category" => category.to_string()
    )
    .increment(1);
}

/// Record a Basic login attempt seen by the audit filter
///
/// Metric: `aaa_authentication_attempts_total`
/// Labels: `outcome`
pub fn record_authentication_attempt(outcome: &str) {
    counter!("aaa_authentication_attempts_total", "outcome" => outcome.to_string()).increment(1);
}

// ============================================================================
// Filter Chain Metrics
// ============================================================================

/// Record a filter chain registration attempt
///
/// Metric: `aaa_filter_chain_updates_total`
/// Labels: `status`
pub fn record_filter_chain_update(status: &str) {
    counter!("aaa_filter_chain_updates_total", "status" => status.to_string()).increment(1);
}

/// Update the number of stages in the live filter chain
///
/// Metric: `aaa_filter_chain_stages`
pub fn set_filter_chain_stages(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("aaa_filter_chain_stages").set(count as f64);
}

// ============================================================================
// Encryption Metrics
// ============================================================================

/// Record an encryption service operation
///
/// Metric: `aaa_encryption_operations_total`
/// Labels: `operation`, `status`
///
/// `status` is `passthrough` when the input was returned unchanged.
pub fn record_encryption_operation(operation: &str, status: &str) {
    counter!("aaa_encryption_operations_total",
        "operation" => operation.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `aaa_http_requests_total`, `aaa_http_request_duration_seconds`
/// Labels: `method`, `path` (route template, never the raw URI), `status_code`
pub fn record_http_request(method: &str, path: &str, status_code: u16, duration: Duration) {
    histogram!("aaa_http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status_code" => status_code.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("aaa_http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests execute the recording functions against the global no-op
    // recorder; values are asserted in the HTTP integration tests.

    #[test]
    fn test_record_token_validation() {
        record_token_validation("basic", "success", None);
        record_token_validation("basic", "error", Some("authentication"));
        record_token_validation("bearer", "no_match", None);
    }

    #[test]
    fn test_record_authentication_attempt() {
        record_authentication_attempt("success");
        record_authentication_attempt("failure");
    }

    #[test]
    fn test_record_filter_chain_update() {
        record_filter_chain_update("success");
        record_filter_chain_update("error");
        set_filter_chain_stages(3);
    }

    #[test]
    fn test_record_encryption_operation() {
        record_encryption_operation("encrypt", "success");
        record_encryption_operation("decrypt", "passthrough");
        record_encryption_operation("decrypt", "error");
    }

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(1));
        record_http_request("POST", "/protected", 401, Duration::from_millis(12));
    }
}
