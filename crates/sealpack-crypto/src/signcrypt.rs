//! Sign-then-encrypt.
//!
//! The sender signs the plaintext and stores the signature and its own
//! identifier as custom parameters of the envelope. Both travel inside the
//! authenticated header, so neither can be swapped without breaking the tag.

use tracing::{debug, warn};

use crate::engine::CryptoEngine;
use crate::envelope::CustomParams;
use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};

/// Custom parameter holding the DER signature of the plaintext.
pub const SIGNATURE_PARAM: &[u8] = b"SEALPACK-DATA-SIGNATURE";
/// Custom parameter holding the signer's identifier.
pub const SIGNER_ID_PARAM: &[u8] = b"SEALPACK-DATA-SIGNER-ID";

/// Public keys a composite envelope may have been signed with.
#[derive(Debug, Clone, Copy)]
pub enum SignerKeys<'a> {
    /// The expected signer. Used directly, without an identifier lookup.
    Single(&'a PublicKey),
    /// Picked by the signer identifier found in the envelope.
    Candidates(&'a [PublicKey]),
}

impl<'a> From<&'a PublicKey> for SignerKeys<'a> {
    fn from(key: &'a PublicKey) -> Self {
        SignerKeys::Single(key)
    }
}

impl<'a> From<&'a [PublicKey]> for SignerKeys<'a> {
    fn from(keys: &'a [PublicKey]) -> Self {
        SignerKeys::Candidates(keys)
    }
}

impl<'a> From<&'a Vec<PublicKey>> for SignerKeys<'a> {
    fn from(keys: &'a Vec<PublicKey>) -> Self {
        SignerKeys::Candidates(keys)
    }
}

impl<'a, const N: usize> From<&'a [PublicKey; N]> for SignerKeys<'a> {
    fn from(keys: &'a [PublicKey; N]) -> Self {
        SignerKeys::Candidates(keys)
    }
}

impl<'a> SignerKeys<'a> {
    fn select(self, params: &CustomParams) -> Result<&'a PublicKey, CryptoError> {
        match self {
            SignerKeys::Single(key) => Ok(key),
            SignerKeys::Candidates(keys) => {
                let id = params.get(SIGNER_ID_PARAM).ok_or(CryptoError::SignerNotFound)?;
                keys.iter()
                    .find(|k| k.identifier().matches(id))
                    .ok_or(CryptoError::SignerNotFound)
            }
        }
    }
}

impl CryptoEngine {
    /// Sign `data` with `signer`, then encrypt it for `recipients`.
    pub fn sign_then_encrypt(
        &self,
        data: &[u8],
        signer: &PrivateKey,
        recipients: &[PublicKey],
    ) -> Result<Vec<u8>, CryptoError> {
        let signature = self.sign(data, signer)?;
        let mut params = CustomParams::new();
        params.insert(SIGNATURE_PARAM, signature);
        params.insert(SIGNER_ID_PARAM, signer.identifier().as_bytes());
        let envelope = self.encrypt_with_params(data, recipients, params)?;
        debug!(signer = %signer.identifier(), recipients = recipients.len(), "signed and encrypted");
        Ok(envelope)
    }

    /// Decrypt `envelope` and check the embedded signature.
    ///
    /// No plaintext is returned unless the signature verifies.
    pub fn decrypt_then_verify<'a>(
        &self,
        envelope: &[u8],
        recipient: &PrivateKey,
        signers: impl Into<SignerKeys<'a>>,
    ) -> Result<Vec<u8>, CryptoError> {
        let (mut plain, params) = self.open_envelope(envelope, recipient)?;
        let signer = signers.into().select(&params)?;
        debug!(signer = %signer.identifier(), "signer selected");
        let signature = params.get(SIGNATURE_PARAM).ok_or(CryptoError::SignatureNotFound)?;
        if !self.verify(&plain, signature, signer)? {
            warn!(signer = %signer.identifier(), "embedded signature does not verify");
            return Err(CryptoError::SignatureNotVerified);
        }
        Ok(std::mem::take(&mut *plain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_type::KeyType;
    use crate::keys::KeyPair;

    struct Parties {
        engine: CryptoEngine,
        alice: KeyPair,
        bob: KeyPair,
    }

    fn parties() -> Parties {
        let engine = CryptoEngine::default();
        let alice = engine.generate_key_pair().unwrap();
        let bob = engine.generate_key_pair().unwrap();
        Parties { engine, alice, bob }
    }

    #[test]
    fn test_round_trip_single_signer() {
        let p = parties();
        let env = p
            .engine
            .sign_then_encrypt(b"payload", &p.alice.private_key, &[p.bob.public_key.clone()])
            .unwrap();
        let plain = p
            .engine
            .decrypt_then_verify(&env, &p.bob.private_key, &p.alice.public_key)
            .unwrap();
        assert_eq!(plain, b"payload");
    }

    #[test]
    fn test_candidate_lookup() {
        let p = parties();
        let carol = p.engine.generate_key_pair().unwrap();
        let env = p
            .engine
            .sign_then_encrypt(b"payload", &p.alice.private_key, &[p.bob.public_key.clone()])
            .unwrap();

        let candidates = vec![carol.public_key.clone(), p.alice.public_key.clone()];
        let plain = p.engine.decrypt_then_verify(&env, &p.bob.private_key, &candidates).unwrap();
        assert_eq!(plain, b"payload");

        let strangers = [carol.public_key.clone()];
        assert!(matches!(
            p.engine.decrypt_then_verify(&env, &p.bob.private_key, &strangers),
            Err(CryptoError::SignerNotFound)
        ));
        let none: &[PublicKey] = &[];
        assert!(matches!(
            p.engine.decrypt_then_verify(&env, &p.bob.private_key, none),
            Err(CryptoError::SignerNotFound)
        ));
    }

    #[test]
    fn test_wrong_single_signer_fails_verification() {
        let p = parties();
        let env = p
            .engine
            .sign_then_encrypt(b"payload", &p.alice.private_key, &[p.bob.public_key.clone()])
            .unwrap();
        assert!(matches!(
            p.engine.decrypt_then_verify(&env, &p.bob.private_key, &p.bob.public_key),
            Err(CryptoError::SignatureNotVerified)
        ));
    }

    #[test]
    fn test_plain_envelope_has_no_signature() {
        let p = parties();
        let env = p.engine.encrypt(b"payload", &[p.bob.public_key.clone()]).unwrap();
        assert!(matches!(
            p.engine.decrypt_then_verify(&env, &p.bob.private_key, &p.alice.public_key),
            Err(CryptoError::SignatureNotFound)
        ));
        let candidates = [p.alice.public_key.clone()];
        assert!(matches!(
            p.engine.decrypt_then_verify(&env, &p.bob.private_key, &candidates),
            Err(CryptoError::SignerNotFound)
        ));
    }

    #[test]
    fn test_forged_signature_param() {
        let p = parties();
        let mut params = CustomParams::new();
        params.insert(SIGNATURE_PARAM, p.engine.sign(b"something else", &p.alice.private_key).unwrap());
        params.insert(SIGNER_ID_PARAM, p.alice.identifier().as_bytes());
        let env = p
            .engine
            .encrypt_with_params(b"payload", &[p.bob.public_key.clone()], params)
            .unwrap();
        assert!(matches!(
            p.engine.decrypt_then_verify(&env, &p.bob.private_key, &p.alice.public_key),
            Err(CryptoError::SignatureNotVerified)
        ));
    }

    #[test]
    fn test_garbage_signature_param() {
        let p = parties();
        let mut params = CustomParams::new();
        params.insert(SIGNATURE_PARAM, b"junk".to_vec());
        params.insert(SIGNER_ID_PARAM, p.alice.identifier().as_bytes());
        let env = p
            .engine
            .encrypt_with_params(b"payload", &[p.bob.public_key.clone()], params)
            .unwrap();
        assert!(matches!(
            p.engine.decrypt_then_verify(&env, &p.bob.private_key, &p.alice.public_key),
            Err(CryptoError::MalformedSignature)
        ));
    }

    #[test]
    fn test_encryption_only_signer_is_rejected() {
        let p = parties();
        let x = p.engine.generate_key_pair_of(KeyType::Curve25519).unwrap();
        assert!(matches!(
            p.engine.sign_then_encrypt(b"payload", &x.private_key, &[p.bob.public_key.clone()]),
            Err(CryptoError::KeyDoesNotSupportSigning { .. })
        ));
    }

    #[test]
    fn test_params_visible_to_plain_decrypt() {
        let p = parties();
        let env = p
            .engine
            .sign_then_encrypt(b"payload", &p.alice.private_key, &[p.bob.public_key.clone()])
            .unwrap();
        let (plain, params) = p.engine.decrypt_with_params(&env, &p.bob.private_key).unwrap();
        assert_eq!(plain, b"payload");
        assert_eq!(params.get(SIGNER_ID_PARAM), Some(p.alice.identifier().as_bytes()));
        assert!(params.get(SIGNATURE_PARAM).is_some());
    }
}
