use super::headers::{split_credential_fields, BASIC_PREFIX, DEFAULT_DOMAIN};
use super::TokenAuth;
use crate::credentials::CredentialAuth;
use crate::errors::AaaError;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose, Engine as _};
use common::identity::{Authentication, AuthenticationBuilder, PasswordCredentials};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Validates `Authorization: Basic base64(user:password[:domain])`.
///
/// Credentials without a domain are checked against [`DEFAULT_DOMAIN`].
pub struct HttpBasicAuth {
    credential_auth: Arc<dyn CredentialAuth>,
}

impl HttpBasicAuth {
    #[must_use]
    pub fn new(credential_auth: Arc<dyn CredentialAuth>) -> Self {
        Self { credential_auth }
    }
}

/// Decode the Base64 part of a Basic header into credentials.
///
/// # Errors
///
/// `AaaError::BadCredentialFormat` when the payload is not Base64, not
/// UTF-8, or does not hold two or three `:`-separated fields.
pub fn parse_basic_credentials(encoded: &str) -> Result<PasswordCredentials, AaaError> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| AaaError::BadCredentialFormat)?;
    let decoded = String::from_utf8(bytes).map_err(|_| AaaError::BadCredentialFormat)?;

    match split_credential_fields(&decoded).as_slice() {
        [user, password] => Ok(PasswordCredentials::new(*user, *password, DEFAULT_DOMAIN)),
        [user, password, domain] => Ok(PasswordCredentials::new(*user, *password, *domain)),
        _ => Err(AaaError::BadCredentialFormat),
    }
}

impl TokenAuth for HttpBasicAuth {
    #[instrument(skip_all)]
    fn validate(&self, headers: &HeaderMap) -> Result<Option<Authentication>, AaaError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let Some(encoded) = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix(BASIC_PREFIX))
        else {
            debug!(target: "aaa.validators.basic", "Authorization header is not Basic");
            return Ok(None);
        };

        let credentials = parse_basic_credentials(encoded)?;
        let claim = self.credential_auth.authenticate(&credentials)?;
        Ok(Some(AuthenticationBuilder::new(claim).build()?))
    }

    fn name(&self) -> &str {
        "basic"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::validators::headers::basic_header;
    use axum::http::HeaderValue;
    use common::identity::{Claim, ClaimBuilder};
    use common::secret::ExposeSecret;
    use std::sync::Mutex;

    /// Accepts admin/admin in domain sdn and records what it was asked.
    #[derive(Default)]
    struct StubAuth {
        seen: Mutex<Vec<(String, String, String)>>,
    }

    impl CredentialAuth for StubAuth {
        fn authenticate(&self, credentials: &PasswordCredentials) -> Result<Claim, AaaError> {
            self.seen.lock().unwrap().push((
                credentials.username().to_string(),
                credentials.password().expose_secret().to_string(),
                credentials.domain().to_string(),
            ));
            if credentials.username() == "admin"
                && credentials.password().expose_secret() == "admin"
                && credentials.domain() == "sdn"
            {
                Ok(ClaimBuilder::new()
                    .with_user("admin")
                    .with_user_id("123")
                    .add_role("admin")
                    .build()?)
            } else {
                Err(AaaError::InvalidCredentials)
            }
        }
    }

    fn validator() -> (Arc<StubAuth>, HttpBasicAuth) {
        let stub = Arc::new(StubAuth::default());
        (stub.clone(), HttpBasicAuth::new(stub))
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    fn basic(raw: &str) -> HeaderMap {
        headers_with(&format!("Basic {}", general_purpose::STANDARD.encode(raw)))
    }

    #[test]
    fn test_validate_ok() {
        let (_, auth) = validator();
        let result = auth.validate(&basic("admin:admin:sdn")).unwrap().unwrap();

        assert_eq!(result.user(), "admin");
        assert_eq!(result.roles(), ["admin"]);
        assert_eq!(result.expiration(), 0);
    }

    #[test]
    fn test_missing_domain_defaults_to_sdn() {
        let (stub, auth) = validator();
        auth.validate(&basic("admin:admin")).unwrap().unwrap();

        let seen = stub.seen.lock().unwrap();
        assert_eq!(
            seen.as_slice(),
            [("admin".to_string(), "admin".to_string(), "sdn".to_string())]
        );
    }

    #[test]
    fn test_helper_header_validates() {
        let (_, auth) = validator();
        let header = basic_header("admin", "admin", "sdn");
        assert!(auth.validate(&headers_with(&header)).unwrap().is_some());
    }

    #[test]
    fn test_bad_password() {
        let (_, auth) = validator();
        assert!(matches!(
            auth.validate(&basic("admin:bozo:sdn")),
            Err(AaaError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.validate(&basic("admin:bozo")),
            Err(AaaError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_bad_format() {
        let (stub, auth) = validator();
        for raw in ["admin", "admin$admin", "a:b:c:d", "admin::", ""] {
            let err = auth.validate(&basic(raw)).unwrap_err();
            assert!(matches!(err, AaaError::BadCredentialFormat), "{raw}");
            assert_eq!(
                err.to_string(),
                "Login Attempt in Bad Format. Please provide user:password in Base64 format."
            );
        }
        assert!(stub.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_undecodable_payload() {
        let (_, auth) = validator();
        assert!(matches!(
            auth.validate(&headers_with("Basic !!!not-base64!!!")),
            Err(AaaError::BadCredentialFormat)
        ));

        let not_utf8 = general_purpose::STANDARD.encode([0xff, 0xfe, b':', b'x']);
        assert!(matches!(
            auth.validate(&headers_with(&format!("Basic {not_utf8}"))),
            Err(AaaError::BadCredentialFormat)
        ));
    }

    #[test]
    fn test_other_schemes_are_skipped() {
        let (_, auth) = validator();
        assert!(auth.validate(&HeaderMap::new()).unwrap().is_none());
        assert!(auth.validate(&headers_with("Bearer abc")).unwrap().is_none());
        // Prefix match is case-sensitive
        let lower = format!("basic {}", general_purpose::STANDARD.encode("admin:admin"));
        assert!(auth.validate(&headers_with(&lower)).unwrap().is_none());
    }
}
