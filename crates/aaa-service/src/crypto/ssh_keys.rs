//! SSH wire-format public key codec (RFC 4253 §6.6, RFC 5656 §3.1).
//!
//! A key blob is a sequence of length-prefixed fields: the algorithm name
//! followed by algorithm-specific values. Big integers are `mpint`s:
//! big-endian two's complement, with a leading zero byte when the high bit
//! of a positive value is set.
//!
//! Supported families:
//! - `ssh-rsa`: `e`, `n`
//! - `ssh-dss`: `p`, `q`, `g`, `y`
//! - `ecdsa-sha2-nistp256`: curve name `nistp256`, 65-byte uncompressed point
//!
//! RSA moduli up to [`RSA_MAX_MODULUS_BITS`] are accepted.

use crate::errors::AaaError;
use base64::{engine::general_purpose, Engine as _};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use tracing::instrument;

pub const KEY_TYPE_RSA: &str = "ssh-rsa";
pub const KEY_TYPE_DSA: &str = "ssh-dss";
pub const KEY_TYPE_ECDSA_P256: &str = "ecdsa-sha2-nistp256";

/// Largest RSA modulus `ssh-keygen` will produce
pub const RSA_MAX_MODULUS_BITS: usize = 16384;

const ECDSA_CURVE_NAME: &str = "nistp256";

/// Uncompressed SEC1 point: 0x04 || X (32 bytes) || Y (32 bytes)
const ECDSA_POINT_LEN: usize = 65;

/// Whole `ecdsa-sha2-nistp256` blob; the point occupies the final 65 bytes
const ECDSA_BLOB_LEN: usize = 104;

/// A public key in one of the supported SSH families.
#[derive(Debug, Clone, PartialEq)]
pub enum SshPublicKey {
    Rsa(RsaPublicKey),
    Dsa(dsa::VerifyingKey),
    Ecdsa(p256::PublicKey),
}

impl SshPublicKey {
    /// SSH algorithm name for this key
    #[must_use]
    pub fn key_type(&self) -> &'static str {
        match self {
            SshPublicKey::Rsa(_) => KEY_TYPE_RSA,
            SshPublicKey::Dsa(_) => KEY_TYPE_DSA,
            SshPublicKey::Ecdsa(_) => KEY_TYPE_ECDSA_P256,
        }
    }

    /// Render as an `authorized_keys` line: `<type> <base64> [comment]`.
    #[must_use]
    pub fn to_openssh_line(&self, comment: Option<&str>) -> String {
        let encoded = encode_public_key(self);
        match comment.filter(|c| !c.is_empty()) {
            Some(comment) => format!("{} {encoded} {comment}", self.key_type()),
            None => format!("{} {encoded}", self.key_type()),
        }
    }
}

/// Decode a public key.
///
/// Accepts bare Base64 of the key blob or an `authorized_keys` style line
/// (`<type> <base64> [comment]`). When the line names a type it must match
/// the type inside the blob.
#[instrument(skip_all)]
pub fn decode_public_key(line: &str) -> Result<SshPublicKey, AaaError> {
    let mut parts = line.split_whitespace();
    let first = parts
        .next()
        .ok_or_else(|| AaaError::Decoding("No Base64 part to decode".to_string()))?;

    // Algorithm names contain '-', which the standard Base64 alphabet lacks
    let (declared_type, encoded) = if first.contains('-') {
        let encoded = parts.next().ok_or_else(|| {
            AaaError::Decoding(format!("No Base64 part to decode for key type {first}"))
        })?;
        (Some(first), encoded)
    } else {
        (None, first)
    };

    let blob = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| AaaError::Decoding(format!("Invalid Base64 key data: {e}")))?;
    if blob.is_empty() {
        return Err(AaaError::Decoding("No Base64 part to decode".to_string()));
    }

    let mut reader = WireReader::new(&blob);
    let key_type = reader.read_str()?;

    if let Some(declared) = declared_type {
        if declared != key_type {
            return Err(AaaError::Decoding(format!(
                "Key type mismatch: line declares {declared}, key data contains {key_type}"
            )));
        }
    }

    let key = match key_type {
        KEY_TYPE_RSA => {
            let e = reader.read_mpint()?;
            let n = reader.read_mpint()?;
            let key = RsaPublicKey::new_with_max_size(n, e, RSA_MAX_MODULUS_BITS)
                .map_err(|e| AaaError::Decoding(format!("Invalid RSA public key: {e}")))?;
            SshPublicKey::Rsa(key)
        }
        KEY_TYPE_DSA => {
            let p = reader.read_mpint()?;
            let q = reader.read_mpint()?;
            let g = reader.read_mpint()?;
            let y = reader.read_mpint()?;
            let components = dsa::Components::from_components(p, q, g)
                .map_err(|_| AaaError::Decoding("Invalid DSA domain parameters".to_string()))?;
            let key = dsa::VerifyingKey::from_components(components, y)
                .map_err(|_| AaaError::Decoding("Invalid DSA public key".to_string()))?;
            SshPublicKey::Dsa(key)
        }
        KEY_TYPE_ECDSA_P256 => {
            if blob.len() != ECDSA_BLOB_LEN {
                return Err(AaaError::Decoding(format!(
                    "Invalid {KEY_TYPE_ECDSA_P256} key length: {} (expected {ECDSA_BLOB_LEN})",
                    blob.len()
                )));
            }
            let curve = reader.read_str()?;
            if curve != ECDSA_CURVE_NAME {
                return Err(AaaError::Decoding(format!("Unsupported curve {curve}")));
            }
            let point = reader.read_field()?;
            if point.len() != ECDSA_POINT_LEN {
                return Err(AaaError::Decoding(format!(
                    "Invalid EC point length: {} (expected {ECDSA_POINT_LEN})",
                    point.len()
                )));
            }
            let key = p256::PublicKey::from_sec1_bytes(point)
                .map_err(|_| AaaError::Decoding("Invalid EC point for nistp256".to_string()))?;
            SshPublicKey::Ecdsa(key)
        }
        other => {
            return Err(AaaError::Decoding(format!("Unknown decode key type {other}")));
        }
    };

    if !reader.is_empty() {
        return Err(AaaError::Decoding(format!(
            "Trailing data after {key_type} key"
        )));
    }

    Ok(key)
}

/// Encode a public key as Base64 of its SSH wire blob.
#[must_use]
pub fn encode_public_key(key: &SshPublicKey) -> String {
    let mut writer = WireWriter::default();
    writer.write_field(key.key_type().as_bytes());

    match key {
        SshPublicKey::Rsa(rsa) => {
            writer.write_mpint(rsa.e());
            writer.write_mpint(rsa.n());
        }
        SshPublicKey::Dsa(dsa) => {
            let components = dsa.components();
            writer.write_mpint(components.p());
            writer.write_mpint(components.q());
            writer.write_mpint(components.g());
            writer.write_mpint(dsa.y());
        }
        SshPublicKey::Ecdsa(ec) => {
            writer.write_field(ECDSA_CURVE_NAME.as_bytes());
            writer.write_field(ec.to_encoded_point(false).as_bytes());
        }
    }

    general_purpose::STANDARD.encode(writer.buf)
}

struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AaaError> {
        if self.buf.len() < len {
            return Err(AaaError::Decoding(format!(
                "Truncated key data: need {len} bytes, {} left",
                self.buf.len()
            )));
        }
        let (head, rest) = self.buf.split_at(len);
        self.buf = rest;
        Ok(head)
    }

    fn read_u32(&mut self) -> Result<u32, AaaError> {
        let bytes = self.take(4)?;
        let mut be = [0u8; 4];
        be.copy_from_slice(bytes);
        Ok(u32::from_be_bytes(be))
    }

    fn read_field(&mut self) -> Result<&'a [u8], AaaError> {
        let len = usize::try_from(self.read_u32()?)
            .map_err(|_| AaaError::Decoding("Field length overflow".to_string()))?;
        self.take(len)
    }

    fn read_str(&mut self) -> Result<&'a str, AaaError> {
        std::str::from_utf8(self.read_field()?)
            .map_err(|_| AaaError::Decoding("Key type is not valid UTF-8".to_string()))
    }

    fn read_mpint(&mut self) -> Result<BigUint, AaaError> {
        let bytes = self.read_field()?;
        if bytes.first().is_some_and(|b| b & 0x80 != 0) {
            return Err(AaaError::Decoding(
                "Negative integer in public key".to_string(),
            ));
        }
        Ok(BigUint::from_bytes_be(bytes))
    }
}

#[derive(Default)]
struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    fn write_field(&mut self, bytes: &[u8]) {
        // Key fields are far below 4 GiB
        let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_be_bytes());
        self.buf.extend_from_slice(bytes);
    }

    fn write_mpint(&mut self, value: &BigUint) {
        let raw = value.to_bytes_be();
        let digits: &[u8] = match raw.iter().position(|&b| b != 0) {
            Some(start) => raw.get(start..).unwrap_or_default(),
            None => &[],
        };

        if digits.first().is_some_and(|b| b & 0x80 != 0) {
            let mut padded = Vec::with_capacity(digits.len() + 1);
            padded.push(0);
            padded.extend_from_slice(digits);
            self.write_field(&padded);
        } else {
            self.write_field(digits);
        }
    }
}
