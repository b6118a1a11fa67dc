#![forbid(unsafe_code)]

//! Envelope cryptography for Curve25519, Ed25519, NIST P-256 and RSA keys.
//!
//! Everything goes through [`CryptoEngine`]: key generation and PKCS#8/SPKI
//! import and export, multi-recipient envelopes (buffered or streamed),
//! detached signatures and the sign-then-encrypt composite.

pub mod config;
pub mod error;
pub mod hash;
pub mod identity;
pub mod key_type;
pub mod keys;
pub mod utils;

pub mod aead;
pub mod envelope;
pub mod key_codec;
pub mod rng;
pub mod signer;
pub mod transcript;

pub mod engine;
pub mod signcrypt;
pub mod streams;

mod recipient;

#[cfg(test)]
mod proptests;

pub use config::{ConfigError, CryptoConfig, FingerprintMode};
pub use engine::CryptoEngine;
pub use envelope::{peek_recipients, CustomParams, EnvelopeDecryptor, EnvelopeEncryptor};
pub use error::CryptoError;
pub use hash::HashAlgorithm;
pub use identity::Identifier;
pub use key_type::KeyType;
pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use signcrypt::{SignerKeys, SIGNATURE_PARAM, SIGNER_ID_PARAM};
