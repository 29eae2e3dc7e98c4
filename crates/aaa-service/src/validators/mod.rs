//! Token validators: turn request headers into an [`Authentication`].
//!
//! A validator returns `Ok(None)` when the request carries no credential it
//! understands, so the next validator can try. A credential it understands
//! but rejects is an error and stops the chain: malformed or wrong
//! credentials are never treated as anonymous.

mod bearer;
pub mod headers;
mod http_basic;

pub use bearer::BearerTokenAuth;
pub use http_basic::{parse_basic_credentials, HttpBasicAuth};

use crate::errors::AaaError;
use crate::observability::metrics::record_token_validation;
use crate::observability::ErrorCategory;
use axum::http::HeaderMap;
use common::identity::Authentication;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Extracts an authentication from request headers.
pub trait TokenAuth: Send + Sync {
    /// Validate the credential in `headers`.
    ///
    /// # Errors
    ///
    /// Returns an error when a recognized credential is malformed or rejected.
    fn validate(&self, headers: &HeaderMap) -> Result<Option<Authentication>, AaaError>;

    /// Short label used in logs and metrics.
    fn name(&self) -> &str {
        "token"
    }
}

/// Ordered set of validators; the first match wins.
#[derive(Clone, Default)]
pub struct TokenAuthenticators {
    validators: Vec<Arc<dyn TokenAuth>>,
}

impl TokenAuthenticators {
    #[must_use]
    pub fn new(validators: Vec<Arc<dyn TokenAuth>>) -> Self {
        Self { validators }
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Arc<dyn TokenAuth>) -> Self {
        self.validators.push(validator);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run the validators in order.
    ///
    /// Returns the first authentication produced, `Ok(None)` when no
    /// validator recognized a credential, or the first error raised.
    #[instrument(skip_all)]
    pub fn validate(&self, headers: &HeaderMap) -> Result<Option<Authentication>, AaaError> {
        for validator in &self.validators {
            match validator.validate(headers) {
                Ok(Some(auth)) => {
                    record_token_validation(validator.name(), "success", None);
                    debug!(target: "aaa.validators", validator = validator.name(), "Credential accepted");
                    return Ok(Some(auth));
                }
                Ok(None) => {}
                Err(e) => {
                    let category = ErrorCategory::from(&e);
                    record_token_validation(validator.name(), "error", Some(category.as_str()));
                    debug!(target: "aaa.validators", validator = validator.name(), error = %e, "Credential rejected");
                    return Err(e);
                }
            }
        }

        record_token_validation("all", "no_match", None);
        Ok(None)
    }
}

impl std::fmt::Debug for TokenAuthenticators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.validators.iter().map(|v| v.name()))
            .finish()
    }
}
