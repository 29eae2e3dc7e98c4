use super::headers::BEARER_PREFIX;
use super::TokenAuth;
use crate::errors::AaaError;
use crate::observability::hash_for_correlation;
use crate::token_store::TokenStore;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use common::identity::Authentication;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Validates `Authorization: Bearer <token>` against a [`TokenStore`].
pub struct BearerTokenAuth {
    store: Arc<dyn TokenStore>,
}

impl BearerTokenAuth {
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }
}

impl TokenAuth for BearerTokenAuth {
    #[instrument(skip_all)]
    fn validate(&self, headers: &HeaderMap) -> Result<Option<Authentication>, AaaError> {
        let Some(token) = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        else {
            return Ok(None);
        };

        let token = token.trim();
        if token.is_empty() {
            return Err(AaaError::InvalidToken("Empty bearer token".to_string()));
        }

        match self.store.get(token) {
            Some(auth) => Ok(Some(auth)),
            None => {
                debug!(target: "aaa.validators.bearer", token = %hash_for_correlation(token), "Unknown or expired token");
                Err(AaaError::InvalidToken(
                    "Token is unknown or expired".to_string(),
                ))
            }
        }
    }

    fn name(&self) -> &str {
        "bearer"
    }
}
