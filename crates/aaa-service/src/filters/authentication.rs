use super::{Filter, FilterConfig, FilterRequest, FilterResponse, Next};
use crate::config::DEFAULT_REALM;
use crate::context::AuthContext;
use crate::errors::AaaError;
use crate::observability::hash_for_correlation;
use crate::validators::headers::is_login_attempt;
use crate::validators::TokenAuthenticators;
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderValue, StatusCode};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, instrument, warn};

/// Init parameter overriding the challenge realm
pub const REALM_PARAM: &str = "realm";

/// Requires an authenticated caller when authentication is enabled.
///
/// On success the authentication is attached to the [`AuthContext`] for the
/// rest of the request. Otherwise the request is answered with `401` and a
/// `WWW-Authenticate: Basic realm="..."` challenge.
pub struct AuthenticationFilter {
    context: Arc<AuthContext>,
    validators: TokenAuthenticators,
    realm: RwLock<String>,
}

impl AuthenticationFilter {
    #[must_use]
    pub fn new(context: Arc<AuthContext>, validators: TokenAuthenticators) -> Self {
        Self {
            context,
            validators,
            realm: RwLock::new(DEFAULT_REALM.to_string()),
        }
    }

    #[must_use]
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        *self.realm.get_mut().unwrap_or_else(PoisonError::into_inner) = realm.into();
        self
    }

    #[must_use]
    pub fn realm(&self) -> String {
        self.realm
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn challenge(&self, resp: &mut FilterResponse, err: &AaaError) {
        resp.set_error(err);
        resp.status = StatusCode::UNAUTHORIZED;

        let value = format!("Basic realm=\"{}\"", self.realm());
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                resp.headers.insert(WWW_AUTHENTICATE, value);
            }
            Err(e) => {
                warn!(target: "aaa.filters.authentication", error = %e, "Realm is not a valid header value");
            }
        }
    }
}

impl Filter for AuthenticationFilter {
    fn name(&self) -> &str {
        "authentication"
    }

    fn init(&self, config: &FilterConfig) -> Result<(), AaaError> {
        if let Some(realm) = config.param(REALM_PARAM) {
            if realm.is_empty() || realm.contains('"') {
                return Err(AaaError::FilterInit {
                    filter: config.filter_name().to_string(),
                    reason: format!("invalid realm '{realm}'"),
                });
            }
            *self.realm.write().unwrap_or_else(PoisonError::into_inner) = realm.to_string();
        }
        Ok(())
    }

    #[instrument(skip_all)]
    fn process(
        &self,
        req: &mut FilterRequest,
        resp: &mut FilterResponse,
        next: Next<'_>,
    ) -> Result<(), AaaError> {
        if !self.context.is_auth_enabled() {
            return next.run(req, resp);
        }

        match self.validators.validate(&req.headers) {
            Ok(Some(auth)) => {
                debug!(
                    target: "aaa.filters.authentication",
                    user = %hash_for_correlation(auth.user_id()),
                    "Request authenticated"
                );
                let _scope = self.context.scope(auth);
                next.run(req, resp)
            }
            Ok(None) => {
                if req.header(&AUTHORIZATION).is_some_and(is_login_attempt) {
                    debug!(target: "aaa.filters.authentication", "No validator accepted the credential scheme");
                }
                self.context.clear();
                self.challenge(resp, &AaaError::MissingCredentials);
                Ok(())
            }
            Err(e) => {
                self.context.clear();
                self.challenge(resp, &e);
                Ok(())
            }
        }
    }
}
