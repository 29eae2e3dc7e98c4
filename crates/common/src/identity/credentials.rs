use crate::secret::{ExposeSecret, SecretString};

/// Username/password pair presented for authentication.
///
/// The password is held as a [`SecretString`] so the struct can be logged
/// with `{:?}`. An empty `domain` means the default domain applies.
#[derive(Debug, Clone)]
pub struct PasswordCredentials {
    username: String,
    password: SecretString,
    domain: String,
}

impl PasswordCredentials {
    #[must_use]
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            domain: domain.into(),
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &SecretString {
        &self.password
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }
}

/// Same username, domain and password.
impl PartialEq for PasswordCredentials {
    fn eq(&self, other: &Self) -> bool {
        self.username == other.username
            && self.domain == other.domain
            && self.password.expose_secret() == other.password.expose_secret()
    }
}

impl Eq for PasswordCredentials {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let creds = PasswordCredentials::new("admin", "secret", "sdn");
        assert_eq!(creds.username(), "admin");
        assert_eq!(creds.password().expose_secret(), "secret");
        assert_eq!(creds.domain(), "sdn");
    }

    #[test]
    fn test_debug_hides_password() {
        let creds = PasswordCredentials::new("admin", "hunter2", "sdn");
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_equality_compares_password() {
        let a = PasswordCredentials::new("admin", "one", "sdn");
        let b = PasswordCredentials::new("admin", "one", "sdn");
        let c = PasswordCredentials::new("admin", "two", "sdn");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
