use crate::context::AuthContext;
use crate::errors::AaaError;
use crate::filters::{FilterRequest, FilterResponse, Terminal};
use axum::http::StatusCode;
use common::identity::Authentication;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
struct WhoAmIResponse<'a> {
    method: &'a str,
    path: &'a str,
    authenticated: bool,
    authentication: Option<Authentication>,
}

/// Terminal handler reporting the principal attached to the request.
#[derive(Debug)]
pub struct WhoAmI {
    context: Arc<AuthContext>,
}

impl WhoAmI {
    #[must_use]
    pub fn new(context: Arc<AuthContext>) -> Self {
        Self { context }
    }
}

impl Terminal for WhoAmI {
    fn handle(&self, req: &mut FilterRequest, resp: &mut FilterResponse) -> Result<(), AaaError> {
        let authentication = self.context.get();
        let body = WhoAmIResponse {
            method: req.method.as_str(),
            path: req.uri.path(),
            authenticated: authentication.is_some(),
            authentication,
        };
        let value = serde_json::to_value(&body).map_err(|_| AaaError::Internal)?;

        resp.status = StatusCode::OK;
        resp.set_json(&value);
        Ok(())
    }
}
