//! Credential authenticators: turn a username/password/domain triple into a
//! [`Claim`].
//!
//! Validators hold an `Arc<dyn CredentialAuth>`; the store behind it is an
//! external concern. [`InMemoryCredentialStore`] is the bundled default and
//! [`CachedCredentialAuth`] adds a claim cache in front of any authenticator.

mod claim_cache;
mod in_memory;

pub use claim_cache::{CachedCredentialAuth, DEFAULT_CLAIM_CACHE_CAPACITY, DEFAULT_CLAIM_CACHE_TTL};
pub use in_memory::InMemoryCredentialStore;

use crate::errors::AaaError;
use common::identity::{Claim, PasswordCredentials};
use std::sync::Arc;

/// Authenticates password credentials against a user store.
pub trait CredentialAuth: Send + Sync {
    /// Return the claim for valid credentials.
    ///
    /// Unknown users and wrong passwords both yield
    /// `AaaError::InvalidCredentials`.
    fn authenticate(&self, credentials: &PasswordCredentials) -> Result<Claim, AaaError>;
}

impl<T: CredentialAuth + ?Sized> CredentialAuth for Arc<T> {
    fn authenticate(&self, credentials: &PasswordCredentials) -> Result<Claim, AaaError> {
        (**self).authenticate(credentials)
    }
}
