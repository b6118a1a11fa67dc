//! Validation helpers for message-info headers.
//!
//! Decoding a header with `prost` only proves it is well-formed protobuf.
//! These checks add the structural rules the engine relies on before it
//! trusts any field: version, field sizes, known algorithms and unique
//! custom-parameter keys.

use std::collections::HashSet;

use crate::v1::*;

/// Validation error types for message-info headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Header version is not understood by this implementation
    UnsupportedVersion { version: u32 },
    /// Field has invalid size (expected, actual)
    InvalidSize { field: &'static str, expected: usize, actual: usize },
    /// Field size is out of allowed range
    SizeOutOfRange { field: &'static str, min: usize, max: usize, actual: usize },
    /// Required field is empty or missing
    EmptyField { field: &'static str },
    /// Enumeration value is unknown or unspecified
    UnknownAlgorithm { field: &'static str, value: i32 },
    /// Custom parameter key appears more than once
    DuplicateParam { key: Vec<u8> },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedVersion { version } => {
                write!(f, "unsupported message info version {}", version)
            }
            Self::InvalidSize { field, expected, actual } => {
                write!(f, "field '{}' has invalid size: expected {}, got {}", field, expected, actual)
            }
            Self::SizeOutOfRange { field, min, max, actual } => {
                write!(f, "field '{}' size {} is out of range [{}, {}]", field, actual, min, max)
            }
            Self::EmptyField { field } => {
                write!(f, "required field '{}' is empty", field)
            }
            Self::UnknownAlgorithm { field, value } => {
                write!(f, "field '{}' holds unknown algorithm {}", field, value)
            }
            Self::DuplicateParam { key } => {
                write!(f, "custom parameter {:?} appears more than once", String::from_utf8_lossy(key))
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Constants for field sizes.
pub mod sizes {
    /// Shortest identifier (first 8 bytes of SHA-512).
    pub const MIN_RECIPIENT_ID_SIZE: usize = 8;
    /// Longest identifier (full SHA-256).
    pub const MAX_RECIPIENT_ID_SIZE: usize = 32;
    /// ChaCha20-Poly1305 nonce.
    pub const DATA_NONCE_SIZE: usize = 12;
    /// X25519 ephemeral public key.
    pub const X25519_PUB_SIZE: usize = 32;
    /// Uncompressed SEC1 P-256 point.
    pub const P256_UNCOMPRESSED_POINT_SIZE: usize = 65;
}

fn validate_exact_size(field: &'static str, data: &[u8], expected: usize) -> ValidationResult<()> {
    if data.len() != expected {
        return Err(ValidationError::InvalidSize {
            field,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn validate_not_empty(field: &'static str, data: &[u8]) -> ValidationResult<()> {
    if data.is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

fn validate_size_range(field: &'static str, data: &[u8], min: usize, max: usize) -> ValidationResult<()> {
    if data.len() < min || data.len() > max {
        return Err(ValidationError::SizeOutOfRange {
            field,
            min,
            max,
            actual: data.len(),
        });
    }
    Ok(())
}

/// Trait for validating protocol messages.
pub trait Validate {
    /// Validate the message fields.
    fn validate(&self) -> ValidationResult<()>;
}

impl Validate for KeyRecipientV1 {
    fn validate(&self) -> ValidationResult<()> {
        validate_size_range(
            "recipient_id",
            &self.recipient_id,
            sizes::MIN_RECIPIENT_ID_SIZE,
            sizes::MAX_RECIPIENT_ID_SIZE,
        )?;
        let alg = AlgIdV1::try_from(self.key_alg).map_err(|_| ValidationError::UnknownAlgorithm {
            field: "key_alg",
            value: self.key_alg,
        })?;
        match alg {
            AlgIdV1::Unspecified => {
                return Err(ValidationError::UnknownAlgorithm {
                    field: "key_alg",
                    value: self.key_alg,
                })
            }
            AlgIdV1::Curve25519 | AlgIdV1::Ed25519 => {
                validate_exact_size("encapsulated_key", &self.encapsulated_key, sizes::X25519_PUB_SIZE)?
            }
            AlgIdV1::Secp256r1 => validate_exact_size(
                "encapsulated_key",
                &self.encapsulated_key,
                sizes::P256_UNCOMPRESSED_POINT_SIZE,
            )?,
            // RSA transports the key directly, nothing is encapsulated
            AlgIdV1::Rsa => validate_exact_size("encapsulated_key", &self.encapsulated_key, 0)?,
        }
        validate_not_empty("wrapped_key", &self.wrapped_key)
    }
}

impl Validate for DataCipherV1 {
    fn validate(&self) -> ValidationResult<()> {
        match DataCipherAlgV1::try_from(self.alg) {
            Ok(DataCipherAlgV1::ChaCha20Poly1305) => {}
            _ => {
                return Err(ValidationError::UnknownAlgorithm {
                    field: "data_cipher.alg",
                    value: self.alg,
                })
            }
        }
        validate_exact_size("data_cipher.nonce", &self.nonce, sizes::DATA_NONCE_SIZE)
    }
}

impl Validate for MessageInfoV1 {
    fn validate(&self) -> ValidationResult<()> {
        if self.version != MESSAGE_INFO_VERSION {
            return Err(ValidationError::UnsupportedVersion { version: self.version });
        }
        if self.recipients.is_empty() {
            return Err(ValidationError::EmptyField { field: "recipients" });
        }
        for recipient in &self.recipients {
            recipient.validate()?;
        }
        match self.data_cipher {
            Some(ref cipher) => cipher.validate()?,
            None => return Err(ValidationError::EmptyField { field: "data_cipher" }),
        }

        let mut seen = HashSet::with_capacity(self.custom_params.len());
        for param in &self.custom_params {
            validate_not_empty("custom_params.key", &param.key)?;
            if !seen.insert(param.key.as_slice()) {
                return Err(ValidationError::DuplicateParam { key: param.key.clone() });
            }
        }
        Ok(())
    }
}
