//! PEM private key decoding.
//!
//! Recognized PEM labels:
//! - `PRIVATE KEY`: unencrypted PKCS#8 holding an RSA, DSA or P-256 key
//! - `ENCRYPTED PRIVATE KEY`: PKCS#8 with PBES2, opened with a passphrase
//! - `RSA PRIVATE KEY`: PKCS#1
//! - `EC PRIVATE KEY`: SEC1, P-256 only
//!
//! Legacy OpenSSL encryption (`Proc-Type` / `DEK-Info` headers) is not
//! supported; convert such keys with `openssl pkcs8 -topk8` first.

use super::ssh_keys::{SshPublicKey, KEY_TYPE_DSA, KEY_TYPE_ECDSA_P256, KEY_TYPE_RSA};
use crate::errors::AaaError;
use pkcs8::{
    DecodePrivateKey, EncryptedPrivateKeyInfo, ObjectIdentifier, PrivateKeyInfo, SecretDocument,
};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::RsaPrivateKey;
use std::path::Path;
use tracing::{debug, instrument};

const LABEL_PKCS8: &str = "PRIVATE KEY";
const LABEL_PKCS8_ENCRYPTED: &str = "ENCRYPTED PRIVATE KEY";
const LABEL_PKCS1_RSA: &str = "RSA PRIVATE KEY";
const LABEL_SEC1_EC: &str = "EC PRIVATE KEY";

/// id-dsa (RFC 3279 §2.3.2)
const DSA_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10040.4.1");

/// A decoded private key. Its public half is available through
/// [`PrivateKey::public_key`].
pub enum PrivateKey {
    Rsa(RsaPrivateKey),
    Dsa(dsa::SigningKey),
    Ecdsa(p256::SecretKey),
}

impl PrivateKey {
    /// SSH algorithm name of the key pair
    #[must_use]
    pub fn key_type(&self) -> &'static str {
        match self {
            PrivateKey::Rsa(_) => KEY_TYPE_RSA,
            PrivateKey::Dsa(_) => KEY_TYPE_DSA,
            PrivateKey::Ecdsa(_) => KEY_TYPE_ECDSA_P256,
        }
    }

    #[must_use]
    pub fn public_key(&self) -> SshPublicKey {
        match self {
            PrivateKey::Rsa(key) => SshPublicKey::Rsa(key.to_public_key()),
            PrivateKey::Dsa(key) => SshPublicKey::Dsa(key.verifying_key().clone()),
            PrivateKey::Ecdsa(key) => SshPublicKey::Ecdsa(key.public_key()),
        }
    }
}

// Never print key material
impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PrivateKey").field(&self.key_type()).finish()
    }
}

/// Decode a PEM private key.
///
/// `passphrase` is required for `ENCRYPTED PRIVATE KEY` documents and
/// ignored otherwise.
///
/// # Errors
///
/// Returns `AaaError::Decoding` for malformed PEM, an unsupported label or
/// algorithm, a missing or wrong passphrase, or an invalid key.
#[instrument(skip_all)]
pub fn decode_private_key(pem: &str, passphrase: Option<&str>) -> Result<PrivateKey, AaaError> {
    let (label, document) = SecretDocument::from_pem(pem.trim())
        .map_err(|e| AaaError::Decoding(format!("Invalid PEM private key: {e}")))?;

    let key = match label {
        LABEL_PKCS8 => decode_pkcs8(document.as_bytes())?,
        LABEL_PKCS8_ENCRYPTED => {
            let passphrase = passphrase.ok_or_else(|| {
                AaaError::Decoding("Encrypted private key requires a passphrase".to_string())
            })?;
            let encrypted = EncryptedPrivateKeyInfo::try_from(document.as_bytes())
                .map_err(|e| AaaError::Decoding(format!("Invalid encrypted private key: {e}")))?;
            let decrypted = encrypted.decrypt(passphrase).map_err(|_| {
                AaaError::Decoding(
                    "Unable to decrypt private key: wrong passphrase or unsupported cipher"
                        .to_string(),
                )
            })?;
            decode_pkcs8(decrypted.as_bytes())?
        }
        LABEL_PKCS1_RSA => RsaPrivateKey::from_pkcs1_der(document.as_bytes())
            .map(PrivateKey::Rsa)
            .map_err(|e| AaaError::Decoding(format!("Invalid RSA private key: {e}")))?,
        LABEL_SEC1_EC => p256::SecretKey::from_sec1_der(document.as_bytes())
            .map(PrivateKey::Ecdsa)
            .map_err(|_| AaaError::Decoding("Invalid EC private key for nistp256".to_string()))?,
        other => {
            return Err(AaaError::Decoding(format!(
                "Unsupported PEM label {other}"
            )));
        }
    };

    debug!(target: "aaa.crypto", key_type = key.key_type(), "Private key decoded");
    Ok(key)
}

/// Read and decode a PEM private key file.
///
/// # Errors
///
/// Unreadable files map to `AaaError::Decoding` as well.
pub fn load_private_key(path: &Path, passphrase: Option<&str>) -> Result<PrivateKey, AaaError> {
    let pem = std::fs::read_to_string(path).map_err(|e| {
        AaaError::Decoding(format!("Failed to read {}: {e}", path.display()))
    })?;
    decode_private_key(&pem, passphrase)
}

fn decode_pkcs8(der: &[u8]) -> Result<PrivateKey, AaaError> {
    let oid = PrivateKeyInfo::try_from(der)
        .map_err(|e| AaaError::Decoding(format!("Invalid PKCS#8 private key: {e}")))?
        .algorithm
        .oid;

    if oid == rsa::pkcs1::ALGORITHM_OID {
        RsaPrivateKey::from_pkcs8_der(der)
            .map(PrivateKey::Rsa)
            .map_err(|e| AaaError::Decoding(format!("Invalid RSA private key: {e}")))
    } else if oid == p256::elliptic_curve::ALGORITHM_OID {
        p256::SecretKey::from_pkcs8_der(der)
            .map(PrivateKey::Ecdsa)
            .map_err(|e| AaaError::Decoding(format!("Invalid EC private key: {e}")))
    } else if oid == DSA_OID {
        dsa::SigningKey::from_pkcs8_der(der)
            .map(PrivateKey::Dsa)
            .map_err(|e| AaaError::Decoding(format!("Invalid DSA private key: {e}")))
    } else {
        Err(AaaError::Decoding(format!(
            "Unsupported private key algorithm {oid}"
        )))
    }
}
