//! Key handles.
//!
//! `PrivateKey` and `PublicKey` wrap the native key of their algorithm and
//! bind it to a [`KeyType`] and an [`Identifier`]. Handles are only created
//! by generation, import or extraction, so the identifier is always derived
//! from the key material it sits next to.

use std::fmt;

use ed25519_dalek::{SigningKey, VerifyingKey};
use rand_core::CryptoRngCore;
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use crate::config::FingerprintMode;
use crate::error::CryptoError;
use crate::identity::Identifier;
use crate::key_codec;
use crate::key_type::{KeyType, SUPPORTED_RSA_BITS};

/// Native private key of one of the supported algorithms.
#[derive(Clone)]
pub(crate) enum PrivateMaterial {
    Curve25519(StaticSecret),
    Ed25519(SigningKey),
    Secp256r1(p256::SecretKey),
    Rsa(Box<RsaPrivateKey>),
}

#[derive(Clone)]
pub(crate) enum PublicMaterial {
    Curve25519(X25519PublicKey),
    Ed25519(VerifyingKey),
    Secp256r1(p256::PublicKey),
    Rsa(Box<RsaPublicKey>),
}

impl PrivateMaterial {
    pub(crate) fn generate<R: CryptoRngCore>(
        key_type: KeyType,
        rng: &mut R,
    ) -> Result<Self, CryptoError> {
        let material = match key_type {
            KeyType::Curve25519 => PrivateMaterial::Curve25519(StaticSecret::random_from_rng(rng)),
            KeyType::Ed25519 => PrivateMaterial::Ed25519(SigningKey::generate(rng)),
            KeyType::Secp256r1 => PrivateMaterial::Secp256r1(p256::SecretKey::random(rng)),
            KeyType::Rsa { bits } => {
                KeyType::rsa(bits)?;
                let key = RsaPrivateKey::new(rng, bits).map_err(CryptoError::malformed_key)?;
                PrivateMaterial::Rsa(Box::new(key))
            }
        };
        Ok(material)
    }

    pub(crate) fn public(&self) -> PublicMaterial {
        match self {
            PrivateMaterial::Curve25519(secret) => {
                PublicMaterial::Curve25519(X25519PublicKey::from(secret))
            }
            PrivateMaterial::Ed25519(key) => PublicMaterial::Ed25519(key.verifying_key()),
            PrivateMaterial::Secp256r1(key) => PublicMaterial::Secp256r1(key.public_key()),
            PrivateMaterial::Rsa(key) => PublicMaterial::Rsa(Box::new(key.to_public_key())),
        }
    }
}

impl PublicMaterial {
    pub(crate) fn key_type(&self) -> Result<KeyType, CryptoError> {
        match self {
            PublicMaterial::Curve25519(_) => Ok(KeyType::Curve25519),
            PublicMaterial::Ed25519(_) => Ok(KeyType::Ed25519),
            PublicMaterial::Secp256r1(_) => Ok(KeyType::Secp256r1),
            PublicMaterial::Rsa(key) => rsa_key_type(key.size()),
        }
    }
}

fn rsa_key_type(modulus_bytes: usize) -> Result<KeyType, CryptoError> {
    let bits = modulus_bytes * 8;
    if SUPPORTED_RSA_BITS.contains(&bits) {
        Ok(KeyType::Rsa { bits })
    } else {
        Err(CryptoError::UnsupportedRsaLength { bits })
    }
}

/// Public half of a key pair.
#[derive(Clone)]
pub struct PublicKey {
    material: PublicMaterial,
    key_type: KeyType,
    identifier: Identifier,
    der: Vec<u8>,
}

impl PublicKey {
    pub(crate) fn from_material(
        material: PublicMaterial,
        mode: FingerprintMode,
    ) -> Result<Self, CryptoError> {
        let key_type = material.key_type()?;
        let der = key_codec::encode_public(&material)?;
        let identifier = Identifier::compute(&der, mode);
        Ok(Self { material, key_type, identifier, der })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Canonical SPKI DER of the key.
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub(crate) fn material(&self) -> &PublicMaterial {
        &self.material
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("key_type", &self.key_type)
            .field("identifier", &self.identifier)
            .finish()
    }
}

/// Private half of a key pair. Carries its own public key so the
/// identifier can never drift from the material.
#[derive(Clone)]
pub struct PrivateKey {
    material: PrivateMaterial,
    public: PublicKey,
}

impl PrivateKey {
    pub fn key_type(&self) -> KeyType {
        self.public.key_type
    }

    pub fn identifier(&self) -> &Identifier {
        &self.public.identifier
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn material(&self) -> &PrivateMaterial {
        &self.material
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.key_type() == other.key_type() && self.identifier() == other.identifier()
    }
}

impl Eq for PrivateKey {}

// Never print key material.
impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("key_type", &self.key_type())
            .field("identifier", self.identifier())
            .finish_non_exhaustive()
    }
}

/// A private key and the public key sharing its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub private_key: PrivateKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    pub(crate) fn from_material(
        material: PrivateMaterial,
        mode: FingerprintMode,
    ) -> Result<Self, CryptoError> {
        let public = PublicKey::from_material(material.public(), mode)?;
        Ok(KeyPair {
            public_key: public.clone(),
            private_key: PrivateKey { material, public },
        })
    }

    pub fn identifier(&self) -> &Identifier {
        self.public_key.identifier()
    }

    pub fn key_type(&self) -> KeyType {
        self.public_key.key_type()
    }
}
