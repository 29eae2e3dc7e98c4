//! Observability for the AAA service
//!
//! # Privacy by Default
//!
//! Entry points use `#[instrument(skip_all)]` and log only allow-listed
//! fields. Fields fall into three groups:
//! - **SAFE**: Can be logged in plaintext (filter names, validator names, outcomes)
//! - **HASHED**: Must be SHA-256 hashed for correlation (user names, tokens)
//! - **NEVER**: Must never appear in logs (passwords, passphrases, key material)

pub mod metrics;

use crate::errors::AaaError;
use sha2::{Digest, Sha256};

/// First 8 hex chars of SHA-256, for correlating user ids and tokens across
/// log lines without logging them.
///
/// Not a secret-protection primitive: low-entropy values can be guessed.
#[must_use]
pub fn hash_for_correlation(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let result = hasher.finalize();
    hex::encode(result.get(..4).unwrap_or_default())
}

/// Error categories for metrics labels (bounded cardinality)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad or unknown credentials, malformed headers
    Authentication,
    /// Key decoding and cipher failures
    Cryptographic,
    /// Filter lifecycle and configuration failures
    Configuration,
    Internal,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Authentication => "authentication",
            ErrorCategory::Cryptographic => "cryptographic",
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Internal => "internal",
        }
    }
}

impl From<&AaaError> for ErrorCategory {
    fn from(err: &AaaError) -> Self {
        match err {
            AaaError::MissingCredentials
            | AaaError::InvalidCredentials
            | AaaError::BadCredentialFormat
            | AaaError::InvalidToken(_) => ErrorCategory::Authentication,
            AaaError::Decoding(_) | AaaError::Crypto(_) => ErrorCategory::Cryptographic,
            AaaError::FilterInit { .. } | AaaError::Filter(_) | AaaError::Configuration(_) => {
                ErrorCategory::Configuration
            }
            AaaError::Identity(_) | AaaError::Internal => ErrorCategory::Internal,
        }
    }
}
