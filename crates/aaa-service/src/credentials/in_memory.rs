use super::CredentialAuth;
use crate::crypto::{hash_password, verify_password};
use crate::errors::AaaError;
use crate::observability::hash_for_correlation;
use common::identity::{Claim, ClaimBuilder, PasswordCredentials};
use common::secret::ExposeSecret;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
struct StoredUser {
    user_id: String,
    password_hash: String,
    roles: Vec<String>,
}

/// User store kept in memory with bcrypt-hashed passwords.
///
/// Users are scoped by domain: the same username may exist in several
/// domains with different passwords and roles. The user id is
/// `<username>@<domain>`.
#[derive(Debug)]
pub struct InMemoryCredentialStore {
    bcrypt_cost: u32,
    users: RwLock<HashMap<(String, String), StoredUser>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new(bcrypt_cost: u32) -> Self {
        Self {
            bcrypt_cost,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace a user. Returns the user id.
    #[instrument(skip_all)]
    pub fn add_user<I, S>(
        &self,
        username: &str,
        password: &str,
        domain: &str,
        roles: I,
    ) -> Result<String, AaaError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let username = username.trim();
        let domain = domain.trim();
        let user_id = format!("{username}@{domain}");

        // Reject users that could never produce a valid claim
        let claim = ClaimBuilder::new()
            .with_user_id(&user_id)
            .with_user(username)
            .with_domain(domain)
            .add_roles(roles)
            .build()?;

        let password_hash = hash_password(password, self.bcrypt_cost)?;

        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                (username.to_string(), domain.to_string()),
                StoredUser {
                    user_id: user_id.clone(),
                    password_hash,
                    roles: claim.roles().to_vec(),
                },
            );

        info!(target: "aaa.credentials", user = %hash_for_correlation(&user_id), "User added");
        Ok(user_id)
    }

    /// Remove a user. Returns whether it existed.
    pub fn remove_user(&self, username: &str, domain: &str) -> bool {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(username.to_string(), domain.to_string()))
            .is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialAuth for InMemoryCredentialStore {
    #[instrument(skip_all)]
    fn authenticate(&self, credentials: &PasswordCredentials) -> Result<Claim, AaaError> {
        let stored = self
            .users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(
                credentials.username().to_string(),
                credentials.domain().to_string(),
            ))
            .cloned();

        let Some(stored) = stored else {
            debug!(target: "aaa.credentials", "Unknown user");
            return Err(AaaError::InvalidCredentials);
        };

        if !verify_password(credentials.password().expose_secret(), &stored.password_hash)? {
            debug!(target: "aaa.credentials", user = %hash_for_correlation(&stored.user_id), "Password mismatch");
            return Err(AaaError::InvalidCredentials);
        }

        Ok(ClaimBuilder::new()
            .with_user_id(&stored.user_id)
            .with_user(credentials.username())
            .with_domain(credentials.domain())
            .add_roles(&stored.roles)
            .build()?)
    }
}
