//! The engine: the single entry point for key management, envelopes and
//! signatures.

use rand_core::OsRng;
use tracing::debug;
use zeroize::Zeroizing;

use crate::config::{ConfigError, CryptoConfig};
use crate::envelope::{CustomParams, EnvelopeDecryptor, EnvelopeEncryptor};
use crate::error::CryptoError;
use crate::hash::{compute_hash, HashAlgorithm};
use crate::identity::Identifier;
use crate::key_codec;
use crate::key_type::KeyType;
use crate::keys::{KeyPair, PrivateKey, PrivateMaterial, PublicKey};
use crate::rng;
use crate::signer::{self, ParsedSignature};

/// Envelope cryptography engine.
///
/// Configuration is fixed at construction. The engine keeps no mutable
/// state, so one instance can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct CryptoEngine {
    config: CryptoConfig,
}

impl CryptoEngine {
    /// Validate `config` and build an engine from it.
    pub fn new(config: CryptoConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    /// Generate a key pair of the configured default type.
    pub fn generate_key_pair(&self) -> Result<KeyPair, CryptoError> {
        self.generate_key_pair_of(self.config.default_key_type)
    }

    pub fn generate_key_pair_of(&self, key_type: KeyType) -> Result<KeyPair, CryptoError> {
        let material = PrivateMaterial::generate(key_type, &mut OsRng)?;
        let pair = KeyPair::from_material(material, self.config.fingerprint_mode)?;
        debug!(key_type = %key_type, identifier = %pair.identifier(), "generated key pair");
        Ok(pair)
    }

    /// Deterministic generation: the same seed and key type always give the
    /// same key pair.
    pub fn generate_key_pair_from_seed(
        &self,
        key_type: KeyType,
        seed: &[u8],
    ) -> Result<KeyPair, CryptoError> {
        let mut drbg = rng::seeded_rng(seed)?;
        let material = PrivateMaterial::generate(key_type, &mut drbg)?;
        let pair = KeyPair::from_material(material, self.config.fingerprint_mode)?;
        debug!(key_type = %key_type, identifier = %pair.identifier(), "generated key pair from seed");
        Ok(pair)
    }

    /// Import a PKCS#8 private key (DER or PEM, optionally encrypted).
    pub fn import_private_key(
        &self,
        data: &[u8],
        password: Option<&[u8]>,
    ) -> Result<KeyPair, CryptoError> {
        let material = key_codec::decode_private(data, password)?;
        let pair = KeyPair::from_material(material, self.config.fingerprint_mode)?;
        debug!(key_type = %pair.key_type(), identifier = %pair.identifier(), "imported private key");
        Ok(pair)
    }

    /// Import a SubjectPublicKeyInfo public key (DER or PEM).
    pub fn import_public_key(&self, data: &[u8]) -> Result<PublicKey, CryptoError> {
        let material = key_codec::decode_public(data)?;
        let key = PublicKey::from_material(material, self.config.fingerprint_mode)?;
        debug!(key_type = %key.key_type(), identifier = %key.identifier(), "imported public key");
        Ok(key)
    }

    /// Unencrypted PKCS#8 DER.
    pub fn export_private_key(&self, key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
        let mut der = key_codec::encode_private(key.material())?;
        Ok(std::mem::take(&mut *der))
    }

    /// PKCS#8 DER protected with PBES2 under `password`.
    pub fn export_private_key_with_password(
        &self,
        key: &PrivateKey,
        password: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        key_codec::encode_private_encrypted(key.material(), password)
    }

    /// SubjectPublicKeyInfo DER.
    pub fn export_public_key(&self, key: &PublicKey) -> Vec<u8> {
        key.as_der().to_vec()
    }

    pub fn extract_public_key(&self, key: &PrivateKey) -> PublicKey {
        key.public_key().clone()
    }

    /// Identifier of `key` under this engine's fingerprint mode.
    pub fn identifier_of(&self, key: &PublicKey) -> Identifier {
        Identifier::compute(key.as_der(), self.config.fingerprint_mode)
    }

    /// Encrypt `data` into a single envelope readable by every recipient.
    pub fn encrypt(&self, data: &[u8], recipients: &[PublicKey]) -> Result<Vec<u8>, CryptoError> {
        self.encrypt_with_params(data, recipients, CustomParams::new())
    }

    /// Encrypt with custom parameters attached to the header.
    pub fn encrypt_with_params(
        &self,
        data: &[u8],
        recipients: &[PublicKey],
        params: CustomParams,
    ) -> Result<Vec<u8>, CryptoError> {
        self.encryptor(recipients, params).start(&mut OsRng)?.seal(data)
    }

    pub(crate) fn encryptor(
        &self,
        recipients: &[PublicKey],
        params: CustomParams,
    ) -> EnvelopeEncryptor {
        let mut enc = EnvelopeEncryptor::new();
        enc.add_recipients(recipients);
        *enc.custom_params_mut() = params;
        enc
    }

    /// Decrypt an envelope with one of its recipients' private keys.
    pub fn decrypt(&self, envelope: &[u8], key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
        let (mut plain, _) = self.open_envelope(envelope, key)?;
        Ok(std::mem::take(&mut *plain))
    }

    /// Decrypt and also return the custom parameters of the header.
    pub fn decrypt_with_params(
        &self,
        envelope: &[u8],
        key: &PrivateKey,
    ) -> Result<(Vec<u8>, CustomParams), CryptoError> {
        let (mut plain, params) = self.open_envelope(envelope, key)?;
        Ok((std::mem::take(&mut *plain), params))
    }

    // Plaintext is wiped if the tag does not verify.
    pub(crate) fn open_envelope(
        &self,
        envelope: &[u8],
        key: &PrivateKey,
    ) -> Result<(Zeroizing<Vec<u8>>, CustomParams), CryptoError> {
        let mut dec = EnvelopeDecryptor::new(key);
        let mut plain = Zeroizing::new(Vec::with_capacity(envelope.len()));
        dec.update(envelope, &mut plain)?;
        let params = dec.finish()?;
        Ok((plain, params))
    }

    /// Sign `data` with the configured signature hash.
    pub fn sign(&self, data: &[u8], key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
        let hash = self.config.signature_hash;
        signer::sign_digest(key, hash, &compute_hash(data, hash))
    }

    /// `Ok(false)` for a well-formed signature that does not match.
    pub fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        key: &PublicKey,
    ) -> Result<bool, CryptoError> {
        let parsed = ParsedSignature::from_der(signature)?;
        signer::verify_digest(key, &parsed, &compute_hash(data, parsed.hash))
    }

    pub fn compute_hash(&self, data: &[u8], algorithm: HashAlgorithm) -> Vec<u8> {
        compute_hash(data, algorithm)
    }

    /// `len` bytes from the OS generator.
    pub fn random_bytes(&self, len: usize) -> Result<Vec<u8>, CryptoError> {
        rng::random_bytes(len)
    }
}
