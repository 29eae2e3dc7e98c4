//! Password-derived symmetric encryption for secrets at rest.
//!
//! A key is derived once with PBKDF2 and used for AES-CBC with PKCS#7
//! padding. Encrypted strings carry the `Encrypted:` tag followed by the
//! Base64 ciphertext, so callers can store a mix of encrypted and plain
//! values and decrypt unconditionally.
//!
//! The service fails open: when the key cannot be derived it logs a warning
//! and returns inputs unchanged, and a value that fails to decrypt is
//! returned as given.
//!
//! The salt doubles as the CBC IV, so equal plaintexts produce equal
//! ciphertexts under one configuration. Stored values depend on this.

use super::generate_random_bytes;
use super::generate_random_password;
use crate::config::DEFAULT_ENCRYPT_ITERATIONS;
use crate::errors::AaaError;
use crate::observability::metrics::record_encryption_operation;
use aes::{Aes128, Aes192, Aes256};
use base64::{engine::general_purpose, Engine as _};
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, InvalidLength, KeyIvInit};
use common::secret::{ExposeSecret, SecretBox, SecretString};
use ring::pbkdf2;
use std::fmt;
use std::num::NonZeroU32;
use tracing::{error, instrument, warn};

/// Prefix marking a value produced by [`EncryptionService::encrypt`]
pub const ENCRYPTED_TAG: &str = "Encrypted:";

pub const DEFAULT_KEY_DERIVATION: &str = "PBKDF2WithHmacSHA1";
pub const DEFAULT_CIPHER_TRANSFORM: &str = "AES/CBC/PKCS5Padding";
pub const DEFAULT_KEY_LENGTH_BITS: usize = 128;

/// Length of generated passphrases
pub const DEFAULT_PASSWORD_LENGTH: usize = 12;

/// Salt length; the salt is also the AES block-sized IV
pub const SALT_LEN: usize = 16;

/// Settings for [`EncryptionService`].
#[derive(Debug, Clone)]
pub struct EncryptionConfig {
    pub password: SecretString,
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub key_length_bits: usize,
    /// PBKDF2 variant: `PBKDF2WithHmacSHA1`, `PBKDF2WithHmacSHA256` or `PBKDF2WithHmacSHA512`
    pub key_derivation: String,
    /// Only `AES/CBC/PKCS5Padding` (and its `PKCS7Padding` alias) is supported
    pub cipher_transform: String,
}

impl EncryptionConfig {
    /// Config with default derivation and cipher settings.
    #[must_use]
    pub fn new(password: SecretString, salt: Vec<u8>) -> Self {
        Self {
            password,
            salt,
            iterations: DEFAULT_ENCRYPT_ITERATIONS,
            key_length_bits: DEFAULT_KEY_LENGTH_BITS,
            key_derivation: DEFAULT_KEY_DERIVATION.to_string(),
            cipher_transform: DEFAULT_CIPHER_TRANSFORM.to_string(),
        }
    }

    /// Config with a random alphanumeric passphrase and a random salt.
    ///
    /// Values encrypted under a generated config can only be decrypted by
    /// the same process unless the passphrase and salt are persisted.
    pub fn generated(password_length: usize) -> Result<Self, AaaError> {
        let password = generate_random_password(password_length)?;
        let salt = generate_random_bytes(SALT_LEN)?;
        Ok(Self::new(password, salt))
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_key_length_bits(mut self, bits: usize) -> Self {
        self.key_length_bits = bits;
        self
    }

    #[must_use]
    pub fn with_key_derivation(mut self, name: impl Into<String>) -> Self {
        self.key_derivation = name.into();
        self
    }

    #[must_use]
    pub fn with_cipher_transform(mut self, transform: impl Into<String>) -> Self {
        self.cipher_transform = transform.into();
        self
    }
}

struct CipherKey {
    key: SecretBox<Vec<u8>>,
    iv: Vec<u8>,
}

/// Symmetric encryption service for stored secrets.
pub struct EncryptionService {
    key: Option<CipherKey>,
}

impl fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionService")
            .field("enabled", &self.key.is_some())
            .finish()
    }
}

impl EncryptionService {
    /// Derive the key from `config`.
    ///
    /// Unsupported settings leave the service without a key (pass-through).
    #[instrument(skip_all)]
    pub fn new(config: &EncryptionConfig) -> Self {
        match derive_key(config) {
            Ok(key) => Self { key: Some(key) },
            Err(e) => {
                warn!(target: "aaa.crypto", error = %e, "Failed to initialize secret key, values will be stored unencrypted");
                Self { key: None }
            }
        }
    }

    /// Whether a key is available; `false` means every call is pass-through.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Encrypt `data` into `Encrypted:<base64>`, or return it unchanged
    /// when the service has no key.
    #[instrument(skip_all)]
    pub fn encrypt(&self, data: &str) -> String {
        let Some(key) = &self.key else {
            record_encryption_operation("encrypt", "passthrough");
            return data.to_string();
        };

        match cbc_encrypt(key, data.as_bytes()) {
            Ok(ciphertext) => {
                record_encryption_operation("encrypt", "success");
                format!("{ENCRYPTED_TAG}{}", general_purpose::STANDARD.encode(ciphertext))
            }
            Err(e) => {
                error!(target: "aaa.crypto", error = %e, "Failed to encrypt data");
                record_encryption_operation("encrypt", "error");
                data.to_string()
            }
        }
    }

    /// Decrypt a tagged value.
    ///
    /// Untagged or empty input, a missing key, and any decoding or padding
    /// failure return `data` unchanged.
    #[instrument(skip_all)]
    pub fn decrypt(&self, data: &str) -> String {
        let (Some(key), Some(encoded)) = (&self.key, data.strip_prefix(ENCRYPTED_TAG)) else {
            record_encryption_operation("decrypt", "passthrough");
            return data.to_string();
        };

        let result = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AaaError::Crypto(format!("Invalid Base64 ciphertext: {e}")))
            .and_then(|ciphertext| cbc_decrypt(key, &ciphertext))
            .and_then(|plaintext| {
                String::from_utf8(plaintext)
                    .map_err(|e| AaaError::Crypto(format!("Plaintext is not UTF-8: {e}")))
            });

        match result {
            Ok(plaintext) => {
                record_encryption_operation("decrypt", "success");
                plaintext
            }
            Err(e) => {
                error!(target: "aaa.crypto", error = %e, "Failed to decrypt encoded data");
                record_encryption_operation("decrypt", "error");
                data.to_string()
            }
        }
    }

    /// Encrypt raw bytes (no tag, no Base64). Pass-through without a key.
    #[instrument(skip_all)]
    pub fn encrypt_bytes(&self, data: &[u8]) -> Vec<u8> {
        let Some(key) = &self.key else {
            return data.to_vec();
        };

        cbc_encrypt(key, data).unwrap_or_else(|e| {
            error!(target: "aaa.crypto", error = %e, "Failed to encrypt data");
            data.to_vec()
        })
    }

    /// Decrypt raw bytes. Empty input, a missing key or a failure return
    /// `data` unchanged.
    #[instrument(skip_all)]
    pub fn decrypt_bytes(&self, data: &[u8]) -> Vec<u8> {
        let Some(key) = self.key.as_ref().filter(|_| !data.is_empty()) else {
            return data.to_vec();
        };

        cbc_decrypt(key, data).unwrap_or_else(|e| {
            error!(target: "aaa.crypto", error = %e, "Failed to decrypt encoded data");
            data.to_vec()
        })
    }
}

fn derive_key(config: &EncryptionConfig) -> Result<CipherKey, AaaError> {
    let algorithm = match config.key_derivation.as_str() {
        "PBKDF2WithHmacSHA1" => pbkdf2::PBKDF2_HMAC_SHA1,
        "PBKDF2WithHmacSHA256" => pbkdf2::PBKDF2_HMAC_SHA256,
        "PBKDF2WithHmacSHA512" => pbkdf2::PBKDF2_HMAC_SHA512,
        other => {
            return Err(AaaError::Crypto(format!(
                "Unsupported key derivation: {other}"
            )))
        }
    };

    let transform = config.cipher_transform.to_ascii_uppercase();
    if transform != "AES/CBC/PKCS5PADDING" && transform != "AES/CBC/PKCS7PADDING" {
        return Err(AaaError::Crypto(format!(
            "Unsupported cipher transform: {}",
            config.cipher_transform
        )));
    }

    if !matches!(config.key_length_bits, 128 | 192 | 256) {
        return Err(AaaError::Crypto(format!(
            "Unsupported key length: {} bits",
            config.key_length_bits
        )));
    }

    if config.salt.len() != SALT_LEN {
        return Err(AaaError::Crypto(format!(
            "Salt must be {SALT_LEN} bytes, got {}",
            config.salt.len()
        )));
    }

    let iterations = NonZeroU32::new(config.iterations)
        .ok_or_else(|| AaaError::Crypto("Iteration count must be positive".to_string()))?;

    let mut key = vec![0u8; config.key_length_bits / 8];
    pbkdf2::derive(
        algorithm,
        iterations,
        &config.salt,
        config.password.expose_secret().as_bytes(),
        &mut key,
    );

    Ok(CipherKey {
        key: SecretBox::new(Box::new(key)),
        iv: config.salt.clone(),
    })
}

fn invalid_length(e: InvalidLength) -> AaaError {
    AaaError::Crypto(format!("Invalid key or IV length: {e}"))
}

fn cbc_encrypt(key: &CipherKey, data: &[u8]) -> Result<Vec<u8>, AaaError> {
    let (k, iv) = (key.key.expose_secret().as_slice(), key.iv.as_slice());
    let ciphertext = match k.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(k, iv)
            .map_err(invalid_length)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(k, iv)
            .map_err(invalid_length)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(k, iv)
            .map_err(invalid_length)?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        n => return Err(AaaError::Crypto(format!("Unsupported key size: {n} bytes"))),
    };
    Ok(ciphertext)
}

fn cbc_decrypt(key: &CipherKey, data: &[u8]) -> Result<Vec<u8>, AaaError> {
    let (k, iv) = (key.key.expose_secret().as_slice(), key.iv.as_slice());
    let plaintext = match k.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(k, iv)
            .map_err(invalid_length)?
            .decrypt_padded_vec_mut::<Pkcs7>(data),
        24 => cbc::Decryptor::<Aes192>::new_from_slices(k, iv)
            .map_err(invalid_length)?
            .decrypt_padded_vec_mut::<Pkcs7>(data),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(k, iv)
            .map_err(invalid_length)?
            .decrypt_padded_vec_mut::<Pkcs7>(data),
        n => return Err(AaaError::Crypto(format!("Unsupported key size: {n} bytes"))),
    };
    plaintext.map_err(|e| AaaError::Crypto(format!("Bad padding: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const PASSWORD: &str = "V1S1ED4OMeEh";
    const SALT_B64: &str = "TdtWeHbch/7xP52/rp3Usw==";

    fn config() -> EncryptionConfig {
        EncryptionConfig::new(
            SecretString::from(PASSWORD),
            general_purpose::STANDARD.decode(SALT_B64).unwrap(),
        )
    }

    fn service() -> EncryptionService {
        EncryptionService::new(&config())
    }

    #[test]
    fn test_known_answer() {
        assert_eq!(service().encrypt("admin"), "Encrypted:HBfU1gKHExw89lMB3juq1g==");
    }

    #[test]
    fn test_round_trip() {
        let svc = service();
        let long = "x".repeat(100);
        for plain in ["admin", "", "pässwörd with spaces", long.as_str()] {
            let encrypted = svc.encrypt(plain);
            assert!(encrypted.starts_with(ENCRYPTED_TAG));
            assert_ne!(encrypted, plain);
            assert_eq!(svc.decrypt(&encrypted), plain);
        }
    }

    #[test]
    fn test_deterministic_under_one_config() {
        let svc = service();
        assert_eq!(svc.encrypt("admin"), svc.encrypt("admin"));
    }

    #[test]
    fn test_untagged_and_empty_pass_through() {
        let svc = service();
        assert_eq!(svc.decrypt("admin"), "admin");
        assert_eq!(svc.decrypt(""), "");
    }

    #[test]
    fn test_corrupt_ciphertext_returns_input() {
        let svc = service();

        let bad_base64 = "Encrypted:!!not base64!!";
        assert_eq!(svc.decrypt(bad_base64), bad_base64);

        // Valid Base64, but not a whole number of blocks
        let truncated = "Encrypted:AAAA";
        assert_eq!(svc.decrypt(truncated), truncated);
    }

    #[test]
    fn test_wrong_key_does_not_yield_plaintext() {
        let encrypted = service().encrypt("admin");
        let other = EncryptionService::new(&EncryptionConfig::new(
            SecretString::from("another-pass"),
            general_purpose::STANDARD.decode(SALT_B64).unwrap(),
        ));
        assert_ne!(other.decrypt(&encrypted), "admin");
    }

    #[test]
    fn test_unsupported_settings_fail_open() {
        let configs = [
            config().with_key_derivation("PBKDF2WithHmacMD5"),
            config().with_cipher_transform("DES/ECB/NoPadding"),
            config().with_key_length_bits(100),
            config().with_iterations(0),
            EncryptionConfig::new(SecretString::from(PASSWORD), vec![1, 2, 3]),
        ];

        for config in &configs {
            let svc = EncryptionService::new(config);
            assert!(!svc.is_enabled());
            assert_eq!(svc.encrypt("admin"), "admin");
            let tagged = "Encrypted:HBfU1gKHExw89lMB3juq1g==";
            assert_eq!(svc.decrypt(tagged), tagged);
            assert_eq!(svc.encrypt_bytes(b"admin"), b"admin");
        }
    }

    #[test]
    fn test_longer_keys_round_trip() {
        for (bits, kdf) in [(192, "PBKDF2WithHmacSHA256"), (256, "PBKDF2WithHmacSHA512")] {
            let svc = EncryptionService::new(
                &config()
                    .with_iterations(1000)
                    .with_key_length_bits(bits)
                    .with_key_derivation(kdf),
            );
            assert!(svc.is_enabled());
            let encrypted = svc.encrypt("admin");
            assert_eq!(svc.decrypt(&encrypted), "admin");
        }
    }

    #[test]
    fn test_bytes_round_trip() {
        let svc = service();
        let data = [0u8, 1, 2, 250, 255];

        let encrypted = svc.encrypt_bytes(&data);
        assert_eq!(encrypted.len() % 16, 0);
        assert_eq!(svc.decrypt_bytes(&encrypted), data);
        assert!(svc.decrypt_bytes(&[]).is_empty());
    }

    #[test]
    fn test_generated_config() {
        let config = EncryptionConfig::generated(DEFAULT_PASSWORD_LENGTH).unwrap();
        assert_eq!(config.password.expose_secret().len(), DEFAULT_PASSWORD_LENGTH);
        assert_eq!(config.salt.len(), SALT_LEN);

        let svc = EncryptionService::new(&config.with_iterations(1000));
        assert!(svc.is_enabled());
        assert_eq!(svc.decrypt(&svc.encrypt("admin")), "admin");
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", service());
        assert_eq!(debug, "EncryptionService { enabled: true }");
    }
}
