use super::{Filter, FilterRequest, FilterResponse, Next};
use crate::errors::AaaError;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::record_authentication_attempt;
use crate::validators::headers::BASIC_PREFIX;
use crate::validators::parse_basic_credentials;
use axum::http::{header::AUTHORIZATION, StatusCode};
use tracing::info;

const UNKNOWN_USER: &str = "an unknown user";
const UNKNOWN_HOST: &str = "an unknown host";

/// Audit line for a Basic login attempt.
///
/// The user name is hashed for correlation.
#[must_use]
pub fn attempt_message(successful: bool, username: Option<&str>, host: Option<&str>) -> String {
    let outcome = if successful { "Successful" } else { "Unsuccessful" };
    let user = username.map_or_else(|| UNKNOWN_USER.to_string(), hash_for_correlation);
    let host = host.unwrap_or(UNKNOWN_HOST);
    format!("{outcome} authentication attempt by {user} from {host}")
}

/// Logs the outcome of every Basic-authenticated request.
///
/// Runs the rest of the chain first; the attempt counts as unsuccessful
/// when the chain fails or answers `401`.
#[derive(Debug, Default)]
pub struct AuthenticationLogFilter;

impl AuthenticationLogFilter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Filter for AuthenticationLogFilter {
    fn name(&self) -> &str {
        "auth-log"
    }

    fn process(
        &self,
        req: &mut FilterRequest,
        resp: &mut FilterResponse,
        next: Next<'_>,
    ) -> Result<(), AaaError> {
        let username = req
            .header(&AUTHORIZATION)
            .and_then(|value| value.strip_prefix(BASIC_PREFIX))
            .map(|encoded| {
                parse_basic_credentials(encoded)
                    .ok()
                    .map(|credentials| credentials.username().to_string())
            });
        let host = req.remote_addr.map(|addr| addr.ip().to_string());

        let result = next.run(req, resp);

        if let Some(username) = username {
            let successful = result.is_ok() && resp.status != StatusCode::UNAUTHORIZED;
            record_authentication_attempt(if successful { "success" } else { "failure" });
            info!(
                target: "aaa.audit",
                "{}",
                attempt_message(successful, username.as_deref(), host.as_deref())
            );
        }

        result
    }
}
