use crate::error::IdentityError;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A validated identity fact.
///
/// `user_id`, `user` and at least one non-empty role are guaranteed present.
/// `domain` and `client_id` may be empty (empty domain means unscoped).
///
/// Roles keep their insertion order but compare as a set, so two claims
/// listing the same roles in different orders are equal and hash alike.
#[derive(Clone, Serialize)]
pub struct Claim {
    client_id: String,
    user_id: String,
    user: String,
    domain: String,
    roles: Vec<String>,
}

impl Claim {
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Display name of the authenticated user
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Tenant scope, empty when unscoped
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Roles in insertion order, without duplicates
    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl PartialEq for Claim {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id
            && self.user_id == other.user_id
            && self.user == other.user
            && self.domain == other.domain
            && self.roles.len() == other.roles.len()
            && self.roles.iter().all(|r| other.has_role(r))
    }
}

impl Eq for Claim {}

impl Hash for Claim {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.client_id.hash(state);
        self.user_id.hash(state);
        self.user.hash(state);
        self.domain.hash(state);
        let mut sorted: Vec<&String> = self.roles.iter().collect();
        sorted.sort();
        sorted.hash(state);
    }
}

/// Custom Debug implementation that redacts the `user_id` field.
///
/// `user_id` is an opaque account identifier and should not be exposed in
/// logs or debug output.
impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claim")
            .field("client_id", &self.client_id)
            .field("user_id", &"[REDACTED]")
            .field("user", &self.user)
            .field("domain", &self.domain)
            .field("roles", &self.roles)
            .finish()
    }
}

/// Builder for [`Claim`].
///
/// Every value is trimmed. Fields never set stay empty, which `build()`
/// rejects for `user_id`, `user` and the role set.
#[derive(Debug, Clone, Default)]
pub struct ClaimBuilder {
    client_id: String,
    user_id: String,
    user: String,
    domain: String,
    roles: Vec<String>,
}

impl ClaimBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_client_id(mut self, client_id: impl AsRef<str>) -> Self {
        self.client_id = client_id.as_ref().trim().to_string();
        self
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: impl AsRef<str>) -> Self {
        self.user_id = user_id.as_ref().trim().to_string();
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: impl AsRef<str>) -> Self {
        self.user = user.as_ref().trim().to_string();
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl AsRef<str>) -> Self {
        self.domain = domain.as_ref().trim().to_string();
        self
    }

    /// Add a single role. Adding a role twice keeps its first position.
    #[must_use]
    pub fn add_role(mut self, role: impl AsRef<str>) -> Self {
        let role = role.as_ref().trim();
        if !self.roles.iter().any(|r| r == role) {
            self.roles.push(role.to_string());
        }
        self
    }

    #[must_use]
    pub fn add_roles<I, S>(self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles.into_iter().fold(self, Self::add_role)
    }

    /// Build the claim.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::MissingRequiredFields` if `user_id` or `user`
    /// is empty, no role was added, or any role is the empty string.
    pub fn build(self) -> Result<Claim, IdentityError> {
        if self.user_id.is_empty()
            || self.user.is_empty()
            || self.roles.is_empty()
            || self.roles.iter().any(String::is_empty)
        {
            return Err(IdentityError::MissingRequiredFields);
        }

        Ok(Claim {
            client_id: self.client_id,
            user_id: self.user_id,
            user: self.user,
            domain: self.domain,
            roles: self.roles,
        })
    }
}

impl From<&Claim> for ClaimBuilder {
    fn from(claim: &Claim) -> Self {
        Self {
            client_id: claim.client_id.clone(),
            user_id: claim.user_id.clone(),
            user: claim.user.clone(),
            domain: claim.domain.clone(),
            roles: claim.roles.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(claim: &Claim) -> u64 {
        let mut hasher = DefaultHasher::new();
        claim.hash(&mut hasher);
        hasher.finish()
    }

    fn bob() -> ClaimBuilder {
        ClaimBuilder::new()
            .with_user("Bob")
            .with_user_id("1234")
            .with_domain("sdn")
            .add_role("admin")
            .add_role("guest")
    }

    #[test]
    fn test_build_trims_values() {
        let claim = ClaimBuilder::new()
            .with_user("  Bob ")
            .with_user_id(" 1234")
            .with_domain(" sdn ")
            .with_client_id(" dlux ")
            .add_role(" admin ")
            .build()
            .unwrap();

        assert_eq!(claim.user(), "Bob");
        assert_eq!(claim.user_id(), "1234");
        assert_eq!(claim.domain(), "sdn");
        assert_eq!(claim.client_id(), "dlux");
        assert_eq!(claim.roles(), ["admin".to_string()]);
    }

    #[test]
    fn test_rejects_missing_user() {
        let result = ClaimBuilder::new()
            .with_user_id("1234")
            .add_role("admin")
            .build();
        assert_eq!(result.unwrap_err(), IdentityError::MissingRequiredFields);
    }

    #[test]
    fn test_rejects_blank_user() {
        let result = ClaimBuilder::new()
            .with_user("   ")
            .with_user_id("1234")
            .add_role("admin")
            .build();
        assert_eq!(result.unwrap_err(), IdentityError::MissingRequiredFields);
    }

    #[test]
    fn test_rejects_missing_user_id() {
        let result = ClaimBuilder::new().with_user("Bob").add_role("admin").build();
        assert_eq!(result.unwrap_err(), IdentityError::MissingRequiredFields);
    }

    #[test]
    fn test_rejects_empty_role_set() {
        let result = ClaimBuilder::new()
            .with_user("Bob")
            .with_user_id("1234")
            .build();
        assert_eq!(result.unwrap_err(), IdentityError::MissingRequiredFields);
    }

    #[test]
    fn test_rejects_empty_role() {
        let result = bob().add_role("").build();
        assert_eq!(result.unwrap_err(), IdentityError::MissingRequiredFields);

        let result = bob().add_roles(["user", "  "]).build();
        assert_eq!(result.unwrap_err(), IdentityError::MissingRequiredFields);
    }

    #[test]
    fn test_empty_domain_and_client_id_allowed() {
        let claim = ClaimBuilder::new()
            .with_user("Bob")
            .with_user_id("1234")
            .add_role("user")
            .build()
            .unwrap();

        assert_eq!(claim.domain(), "");
        assert_eq!(claim.client_id(), "");
    }

    #[test]
    fn test_roles_keep_insertion_order_without_duplicates() {
        let claim = bob().add_roles(["user", "admin", "auditor"]).build().unwrap();
        assert_eq!(claim.roles(), ["admin", "guest", "user", "auditor"]);
        assert!(claim.has_role("auditor"));
        assert!(!claim.has_role("operator"));
    }

    #[test]
    fn test_equal_builders_produce_equal_claims() {
        let a = bob().build().unwrap();
        let b = bob().build().unwrap();

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_role_order_does_not_affect_equality() {
        let a = ClaimBuilder::new()
            .with_user("Bob")
            .with_user_id("1234")
            .add_roles(["admin", "guest"])
            .build()
            .unwrap();
        let b = ClaimBuilder::new()
            .with_user("Bob")
            .with_user_id("1234")
            .add_roles(["guest", "admin"])
            .build()
            .unwrap();

        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_any_field_change_breaks_equality() {
        let base = bob().build().unwrap();

        let changed = [
            ClaimBuilder::from(&base).with_user("Alice").build().unwrap(),
            ClaimBuilder::from(&base).with_user_id("5678").build().unwrap(),
            ClaimBuilder::from(&base).with_domain("other").build().unwrap(),
            ClaimBuilder::from(&base).with_client_id("dlux").build().unwrap(),
            ClaimBuilder::from(&base).add_role("operator").build().unwrap(),
        ];

        for claim in &changed {
            assert_ne!(&base, claim);
        }
    }

    #[test]
    fn test_copy_builder_round_trips() {
        let original = bob().with_client_id("dlux").build().unwrap();
        let copy = ClaimBuilder::from(&original).build().unwrap();
        assert_eq!(original, copy);
    }

    #[test]
    fn test_debug_redacts_user_id() {
        let claim = bob().build().unwrap();
        let debug = format!("{claim:?}");

        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("1234"));
        assert!(debug.contains("Bob"));
    }
}
