//! HTTP handlers.
//!
//! Everything except the operational endpoints and the token endpoint is
//! served through the filter pipeline.

mod whoami;

pub use whoami::WhoAmI;

use crate::app::AaaCore;
use crate::errors::AaaError;
use crate::filters::{FilterRequest, FilterResponse};
use crate::token_store::{issue_token, TokenStore};
use crate::validators::{HttpBasicAuth, TokenAuth};
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::secret::ExposeSecret;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Largest request body forwarded to the pipeline
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Handler for GET /health
pub async fn health_check() -> &'static str {
    "OK"
}

/// Handler for GET /metrics
///
/// Unauthenticated so Prometheus can scrape it. Labels carry no user data.
#[instrument(skip_all, name = "aaa.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

/// Fallback handler: runs the request through the filter pipeline.
///
/// The pipeline runs on a blocking thread so the thread-confined
/// `AuthContext` covers the whole request.
pub async fn pipeline_handler(State(core): State<Arc<AaaCore>>, request: Request) -> Response {
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            debug!(target: "aaa.http", error = %e, "Rejecting request body");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let mut req = FilterRequest {
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        remote_addr,
        body,
    };
    let pipeline = Arc::clone(&core.pipeline);

    let result = tokio::task::spawn_blocking(move || {
        let mut resp = FilterResponse::default();
        if let Err(e) = pipeline.process(&mut req, &mut resp) {
            error!(target: "aaa.http", error = %e, "Filter pipeline failed");
            resp = FilterResponse::default();
            resp.set_error(&e);
        }
        resp
    })
    .await;

    match result {
        Ok(resp) => resp.into_response(),
        Err(e) => {
            error!(target: "aaa.http", error = %e, "Filter pipeline task failed");
            AaaError::Internal.into_response()
        }
    }
}

/// Response body of POST /oauth2/token
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Handler for POST /oauth2/token
///
/// Exchanges Basic credentials for a bearer token.
#[instrument(skip_all, name = "aaa.token.issue")]
pub async fn token_handler(
    State(core): State<Arc<AaaCore>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AaaError> {
    let worker = Arc::clone(&core);
    let issued = tokio::task::spawn_blocking(move || {
        let basic = HttpBasicAuth::new(worker.credential_auth.clone());
        let auth = basic
            .validate(&headers)?
            .ok_or(AaaError::MissingCredentials)?;
        issue_token(worker.token_store.as_ref(), auth.claim().clone())
    })
    .await
    .map_err(|e| {
        error!(target: "aaa.http", error = %e, "Token task failed");
        AaaError::Internal
    })??;

    Ok(Json(TokenResponse {
        access_token: issued.token.expose_secret().to_string(),
        token_type: "Bearer",
        expires_in: core.token_store.token_expiration(),
    }))
}
