//! Cryptographic primitives: credential hashing, secure randomness, the
//! secrets-at-rest encryption service and the key codecs.

pub mod encryption;
pub mod private_keys;
pub mod ssh_keys;

pub use encryption::{EncryptionConfig, EncryptionService, ENCRYPTED_TAG};
pub use private_keys::{decode_private_key, load_private_key, PrivateKey};
pub use ssh_keys::{decode_public_key, encode_public_key, SshPublicKey};

use crate::config::{MAX_BCRYPT_COST, MIN_BCRYPT_COST};
use crate::errors::AaaError;
use common::secret::SecretString;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::instrument;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Hash a password with bcrypt
#[instrument(skip_all)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, AaaError> {
    if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
        return Err(AaaError::Crypto(format!(
            "Invalid bcrypt cost: {cost} (must be {MIN_BCRYPT_COST}-{MAX_BCRYPT_COST})"
        )));
    }

    bcrypt::hash(password, cost)
        .map_err(|e| AaaError::Crypto(format!("Password hashing failed: {e}")))
}

/// Verify a password against a bcrypt hash
#[instrument(skip_all)]
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AaaError> {
    bcrypt::verify(password, hash)
        .map_err(|e| AaaError::Crypto(format!("Password verification failed: {e}")))
}

/// Generate cryptographically secure random bytes
pub fn generate_random_bytes(len: usize) -> Result<Vec<u8>, AaaError> {
    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|e| AaaError::Crypto(format!("Random bytes generation failed: {e}")))?;
    Ok(bytes)
}

/// Generate a random alphanumeric password of `len` characters.
#[instrument(skip_all)]
pub fn generate_random_password(len: usize) -> Result<SecretString, AaaError> {
    // Rejection sampling keeps the distribution uniform over 62 symbols
    let limit = u8::try_from(ALPHANUMERIC.len() * 4).unwrap_or(u8::MAX);
    let mut password = String::with_capacity(len);

    while password.len() < len {
        for byte in generate_random_bytes(len)? {
            if byte >= limit {
                continue;
            }
            if let Some(&c) = ALPHANUMERIC.get(usize::from(byte) % ALPHANUMERIC.len()) {
                password.push(char::from(c));
            }
            if password.len() == len {
                break;
            }
        }
    }

    Ok(SecretString::from(password))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("admin", MIN_BCRYPT_COST).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("admin", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn test_hash_password_rejects_cost_out_of_range() {
        let err = hash_password("admin", MIN_BCRYPT_COST - 1).unwrap_err();
        assert!(matches!(err, AaaError::Crypto(msg) if msg.starts_with("Invalid bcrypt cost")));

        let err = hash_password("admin", MAX_BCRYPT_COST + 1).unwrap_err();
        assert!(matches!(err, AaaError::Crypto(_)));
    }

    #[test]
    fn test_verify_password_malformed_hash() {
        let result = verify_password("admin", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(AaaError::Crypto(_))));
    }

    #[test]
    fn test_generate_random_bytes() {
        let a = generate_random_bytes(16).unwrap();
        let b = generate_random_bytes(16).unwrap();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generate_random_password() {
        let password = generate_random_password(12).unwrap();
        let value = password.expose_secret();
        assert_eq!(value.len(), 12);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(generate_random_password(0).unwrap().expose_secret(), "");
    }
}
