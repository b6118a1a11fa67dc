//! Error taxonomy of the envelope engine.

use thiserror::Error;

/// Errors returned by every engine operation.
///
/// All variants are terminal for the call that produced them; nothing is
/// retried internally.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid seed size: expected {min}..={max} bytes, got {got}")]
    InvalidSeedSize { min: usize, max: usize, got: usize },

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("key data is empty")]
    EmptyKeyData,

    #[error("wrong password for protected private key")]
    WrongPassword,

    #[error("unsupported RSA key length: {bits} bits")]
    UnsupportedRsaLength { bits: usize },

    #[error("key of type {key_type} doesn't support signing")]
    KeyDoesNotSupportSigning { key_type: String },

    #[error("at least one recipient is required")]
    NoRecipients,

    #[error("recipient not found in envelope")]
    RecipientNotFound,

    #[error("envelope authentication failed")]
    AuthenticationFailed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("malformed signature")]
    MalformedSignature,

    #[error("signer not found")]
    SignerNotFound,

    #[error("signature not found")]
    SignatureNotFound,

    #[error("signature not verified")]
    SignatureNotVerified,

    #[error("encryption failed")]
    Encryption,

    #[error("secure random generator failed")]
    Random,

    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    pub(crate) fn malformed_key(err: impl std::fmt::Display) -> Self {
        CryptoError::MalformedKey(err.to_string())
    }

    pub(crate) fn malformed_envelope(err: impl std::fmt::Display) -> Self {
        CryptoError::MalformedEnvelope(err.to_string())
    }
}
