//! Public key identifiers.
//!
//! Every key the engine produces carries an identifier computed from the
//! canonical SPKI DER of its public half. Identifiers address recipients in
//! the envelope header and name the signer in the composite protocol.

use std::fmt;

use crate::config::FingerprintMode;
use crate::hash::{sha256, sha512};
use crate::utils::constant_time_compare;

/// Length of an identifier in the default fingerprint mode.
pub const TRUNCATED_ID_LEN: usize = 8;

/// Stable fingerprint of a public key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identifier(Vec<u8>);

impl Identifier {
    /// Derive the identifier of a public key from its DER export.
    pub fn compute(public_der: &[u8], mode: FingerprintMode) -> Self {
        match mode {
            FingerprintMode::Sha512Truncated => {
                Identifier(sha512(public_der)[..TRUNCATED_ID_LEN].to_vec())
            }
            FingerprintMode::Sha256 => Identifier(sha256(public_der).to_vec()),
        }
    }

    /// Raw identifier bytes, as stored in an envelope.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex, same as `Display`.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Compare against raw identifier bytes taken from an envelope.
    pub fn matches(&self, other: &[u8]) -> bool {
        constant_time_compare(&self.0, other)
    }
}

impl AsRef<[u8]> for Identifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self.to_hex())
    }
}
