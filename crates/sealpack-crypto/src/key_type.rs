//! Key type descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use sealpack_proto::v1::AlgIdV1;

use crate::error::CryptoError;

/// RSA modulus sizes the engine generates and accepts.
pub const SUPPORTED_RSA_BITS: [usize; 4] = [2048, 3072, 4096, 8192];

/// Asymmetric key type bound to every key the engine hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyType {
    /// X25519 key agreement only.
    Curve25519,
    /// Ed25519 signatures; also decrypts through its X25519 form.
    #[default]
    Ed25519,
    /// NIST P-256 (ECDSA + ECDH).
    Secp256r1,
    Rsa { bits: usize },
}

impl KeyType {
    pub const RSA_2048: KeyType = KeyType::Rsa { bits: 2048 };
    pub const RSA_3072: KeyType = KeyType::Rsa { bits: 3072 };
    pub const RSA_4096: KeyType = KeyType::Rsa { bits: 4096 };
    pub const RSA_8192: KeyType = KeyType::Rsa { bits: 8192 };

    /// Build an RSA key type, rejecting lengths the engine does not support.
    pub fn rsa(bits: usize) -> Result<Self, CryptoError> {
        if !SUPPORTED_RSA_BITS.contains(&bits) {
            return Err(CryptoError::UnsupportedRsaLength { bits });
        }
        Ok(KeyType::Rsa { bits })
    }

    /// Algorithm tag written into envelope recipient entries.
    pub fn alg_id(self) -> AlgIdV1 {
        match self {
            KeyType::Curve25519 => AlgIdV1::Curve25519,
            KeyType::Ed25519 => AlgIdV1::Ed25519,
            KeyType::Secp256r1 => AlgIdV1::Secp256r1,
            KeyType::Rsa { .. } => AlgIdV1::Rsa,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Curve25519 => f.write_str("curve25519"),
            KeyType::Ed25519 => f.write_str("ed25519"),
            KeyType::Secp256r1 => f.write_str("secp256r1"),
            KeyType::Rsa { bits } => write!(f, "rsa-{}", bits),
        }
    }
}

impl FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "curve25519" | "x25519" => Ok(KeyType::Curve25519),
            "ed25519" => Ok(KeyType::Ed25519),
            "secp256r1" | "p256" => Ok(KeyType::Secp256r1),
            other => {
                let bits = other
                    .strip_prefix("rsa-")
                    .and_then(|b| b.parse::<usize>().ok())
                    .ok_or_else(|| format!("unknown key type: {}", s))?;
                KeyType::rsa(bits).map_err(|e| e.to_string())
            }
        }
    }
}

impl TryFrom<String> for KeyType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyType> for String {
    fn from(value: KeyType) -> Self {
        value.to_string()
    }
}
