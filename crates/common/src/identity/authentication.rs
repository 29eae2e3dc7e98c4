use super::claim::Claim;
use crate::error::IdentityError;
use serde::Serialize;

/// A claim with an expiration, attached to an authenticated request.
///
/// `expiration` is Unix seconds; `0` means the authentication never expires.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Authentication {
    #[serde(flatten)]
    claim: Claim,
    expiration: i64,
}

impl Authentication {
    #[must_use]
    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    #[must_use]
    pub fn expiration(&self) -> i64 {
        self.expiration
    }

    /// Whether the authentication has lapsed at `now` (Unix seconds).
    ///
    /// Non-expiring authentications (`expiration == 0`) are never expired.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expiration != 0 && now >= self.expiration
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        self.claim.client_id()
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        self.claim.user_id()
    }

    #[must_use]
    pub fn user(&self) -> &str {
        self.claim.user()
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        self.claim.domain()
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        self.claim.roles()
    }
}

/// Builder for [`Authentication`].
///
/// `Default` yields a builder without a claim, which `build()` rejects.
#[derive(Debug, Clone, Default)]
pub struct AuthenticationBuilder {
    claim: Option<Claim>,
    expiration: i64,
}

impl AuthenticationBuilder {
    /// Start from a claim with a non-expiring lifetime.
    #[must_use]
    pub fn new(claim: Claim) -> Self {
        Self {
            claim: Some(claim),
            expiration: 0,
        }
    }

    #[must_use]
    pub fn with_claim(mut self, claim: Claim) -> Self {
        self.claim = Some(claim);
        self
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: i64) -> Self {
        self.expiration = expiration;
        self
    }

    /// Build the authentication.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::MissingClaim` when no claim was supplied and
    /// `IdentityError::NegativeExpiration` for an expiration below zero.
    pub fn build(self) -> Result<Authentication, IdentityError> {
        let claim = self.claim.ok_or(IdentityError::MissingClaim)?;

        if self.expiration < 0 {
            return Err(IdentityError::NegativeExpiration(self.expiration));
        }

        Ok(Authentication {
            claim,
            expiration: self.expiration,
        })
    }
}

impl From<&Authentication> for AuthenticationBuilder {
    fn from(auth: &Authentication) -> Self {
        Self {
            claim: Some(auth.claim.clone()),
            expiration: auth.expiration,
        }
    }
}
