//! Request filter pipeline.
//!
//! A [`FilterPipeline`] wraps a fixed [`Terminal`] handler with an ordered,
//! hot-swappable list of [`Filter`] stages. Each stage receives a [`Next`]
//! continuation; calling [`Next::run`] hands the request to the following
//! stage (or the terminal once the list is exhausted) and returns after the
//! rest of the chain has unwound. A stage that never calls it short-circuits
//! the request.
//!
//! ```text
//! ingress(0) -> ingress(1) -> ... -> terminal -> ... -> egress(1) -> egress(0)
//! ```

mod audit_log;
mod authentication;
mod chain_config;
mod pipeline;

pub use audit_log::AuthenticationLogFilter;
pub use authentication::{AuthenticationFilter, REALM_PARAM};
pub use chain_config::{FilterChainConfig, FilterFactory, FilterRegistry, CUSTOM_FILTER_LIST_KEY};
pub use pipeline::{FilterPipeline, Registration};

use crate::errors::AaaError;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use pipeline::Stage;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Name and init parameters handed to [`Filter::init`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterConfig {
    filter_name: String,
    params: HashMap<String, String>,
}

impl FilterConfig {
    #[must_use]
    pub fn new(filter_name: impl Into<String>) -> Self {
        Self {
            filter_name: filter_name.into(),
            params: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn filter_name(&self) -> &str {
        &self.filter_name
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }
}

/// Inbound request as seen by filters.
#[derive(Debug, Clone)]
pub struct FilterRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
    pub body: Bytes,
}

impl FilterRequest {
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            remote_addr: None,
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Header value as text, if present and visible ASCII.
    #[must_use]
    pub fn header(&self, name: &HeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Outbound response built up by the terminal and the filters.
#[derive(Debug, Clone)]
pub struct FilterResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for FilterResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl FilterResponse {
    /// Replace the body with `value` as JSON.
    pub fn set_json(&mut self, value: &serde_json::Value) {
        self.body = Bytes::from(value.to_string());
        self.headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
    }

    /// Turn a pipeline error into this response.
    pub fn set_error(&mut self, err: &AaaError) {
        self.status = err.status_code();
        self.set_json(&err.response_body());
    }
}

impl IntoResponse for FilterResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// One stage of the pipeline.
///
/// `init` runs once before the first `process` call of a registration and
/// `destroy` once when the stage is released, after the last request using
/// it has returned. Both take `&self`: filters keep their state behind
/// interior mutability.
pub trait Filter: Send + Sync {
    /// Name used in logs and for registry lookup.
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// An error aborts the registration that is initializing this filter.
    fn init(&self, _config: &FilterConfig) -> Result<(), AaaError> {
        Ok(())
    }

    /// Handle the request, calling `next.run` to continue the chain.
    ///
    /// # Errors
    ///
    /// Errors propagate back through the earlier stages to the host.
    fn process(
        &self,
        req: &mut FilterRequest,
        resp: &mut FilterResponse,
        next: Next<'_>,
    ) -> Result<(), AaaError>;

    fn destroy(&self) {}
}

/// Fixed downstream handler at the end of the pipeline.
pub trait Terminal: Send + Sync {
    /// # Errors
    ///
    /// Errors propagate back through every stage to the host.
    fn handle(&self, req: &mut FilterRequest, resp: &mut FilterResponse) -> Result<(), AaaError>;
}

impl<F> Terminal for F
where
    F: Fn(&mut FilterRequest, &mut FilterResponse) -> Result<(), AaaError> + Send + Sync,
{
    fn handle(&self, req: &mut FilterRequest, resp: &mut FilterResponse) -> Result<(), AaaError> {
        self(req, resp)
    }
}

/// Continuation handed to each stage: the rest of the chain.
pub struct Next<'a> {
    stages: &'a [Arc<Stage>],
    terminal: &'a dyn Terminal,
}

impl<'a> Next<'a> {
    pub(crate) fn new(stages: &'a [Arc<Stage>], terminal: &'a dyn Terminal) -> Self {
        Self { stages, terminal }
    }

    /// Run the remaining stages, then the terminal.
    ///
    /// # Errors
    ///
    /// Returns the first error raised downstream, including a lazy `init`
    /// failure of the next stage.
    pub fn run(self, req: &mut FilterRequest, resp: &mut FilterResponse) -> Result<(), AaaError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage.ensure_initialized()?;
                stage
                    .filter()
                    .process(req, resp, Next::new(rest, self.terminal))
            }
            None => self.terminal.handle(req, resp),
        }
    }
}
