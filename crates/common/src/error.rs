//! Common error types for AAA components.

use thiserror::Error;

/// Errors raised while building identity values.
///
/// Builders fail at `build()` time so that no `Claim` or `Authentication`
/// can exist in a partially valid state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// `user_id`, `user` or `roles` missing, or a role is the empty string
    #[error("The Claim is missing one or more of the required fields.")]
    MissingRequiredFields,

    /// An `AuthenticationBuilder` was built without a claim
    #[error("The Authentication is missing its Claim.")]
    MissingClaim,

    /// Expiration must be zero (non-expiring) or a positive timestamp
    #[error("Expiration must be non-negative, got {0}")]
    NegativeExpiration(i64),
}

/// Result type alias using `IdentityError`
pub type Result<T> = std::result::Result<T, IdentityError>;
