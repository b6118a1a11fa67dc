//! Detached signatures over message digests.
//!
//! A signature is the DER structure
//! `SEQUENCE { AlgorithmIdentifier { hashOid, NULL }, OCTET STRING raw }`,
//! where `raw` is the algorithm's own signature over the digest. The hash
//! used at signing time travels with the signature, so verification never
//! depends on the verifier's configuration.

use der::asn1::OctetStringRef;
use der::{AnyRef, Decode, Encode, Sequence};
use ed25519_dalek::Signer as _;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rsa::traits::PublicKeyParts;
use rsa::Pkcs1v15Sign;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use spki::AlgorithmIdentifierRef;

use crate::error::CryptoError;
use crate::hash::HashAlgorithm;
use crate::keys::{PrivateKey, PrivateMaterial, PublicKey, PublicMaterial};

pub const ED25519_SIGNATURE_SIZE: usize = 64;

#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SignatureInfo<'a> {
    digest_algorithm: AlgorithmIdentifierRef<'a>,
    signature: OctetStringRef<'a>,
}

/// Signature decoded from its DER envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedSignature {
    pub hash: HashAlgorithm,
    pub raw: Vec<u8>,
}

impl ParsedSignature {
    pub fn from_der(bytes: &[u8]) -> Result<Self, CryptoError> {
        let info = SignatureInfo::from_der(bytes).map_err(|_| CryptoError::MalformedSignature)?;
        if let Some(params) = info.digest_algorithm.parameters {
            if params != AnyRef::NULL {
                return Err(CryptoError::MalformedSignature);
            }
        }
        let hash = HashAlgorithm::from_oid(&info.digest_algorithm.oid)
            .ok_or(CryptoError::MalformedSignature)?;
        Ok(Self {
            hash,
            raw: info.signature.as_bytes().to_vec(),
        })
    }

    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        let info = SignatureInfo {
            digest_algorithm: AlgorithmIdentifierRef {
                oid: self.hash.oid(),
                parameters: Some(AnyRef::NULL),
            },
            signature: OctetStringRef::new(&self.raw).map_err(|_| CryptoError::Encryption)?,
        };
        info.to_der().map_err(|_| CryptoError::Encryption)
    }
}

fn pkcs1v15(hash: HashAlgorithm) -> Pkcs1v15Sign {
    match hash {
        HashAlgorithm::Sha224 => Pkcs1v15Sign::new::<Sha224>(),
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

fn unsupported(key_type: impl ToString) -> CryptoError {
    CryptoError::KeyDoesNotSupportSigning { key_type: key_type.to_string() }
}

/// Sign a digest computed with `hash` and wrap the result in DER.
pub(crate) fn sign_digest(
    key: &PrivateKey,
    hash: HashAlgorithm,
    digest: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let raw = match key.material() {
        PrivateMaterial::Ed25519(sk) => sk.sign(digest).to_bytes().to_vec(),
        PrivateMaterial::Secp256r1(sk) => {
            let signing_key = p256::ecdsa::SigningKey::from(sk);
            let sig: p256::ecdsa::Signature = signing_key
                .sign_prehash(digest)
                .map_err(|_| CryptoError::Encryption)?;
            sig.to_der().as_bytes().to_vec()
        }
        PrivateMaterial::Rsa(sk) => sk
            .sign(pkcs1v15(hash), digest)
            .map_err(|_| CryptoError::Encryption)?,
        PrivateMaterial::Curve25519(_) => return Err(unsupported(key.key_type())),
    };
    ParsedSignature { hash, raw }.to_der()
}

/// Check `signature` over a digest computed with `signature.hash`.
///
/// A well-formed signature that does not match yields `Ok(false)`.
pub(crate) fn verify_digest(
    key: &PublicKey,
    signature: &ParsedSignature,
    digest: &[u8],
) -> Result<bool, CryptoError> {
    let raw = signature.raw.as_slice();
    let valid = match key.material() {
        PublicMaterial::Ed25519(vk) => {
            let bytes: [u8; ED25519_SIGNATURE_SIZE] =
                raw.try_into().map_err(|_| CryptoError::MalformedSignature)?;
            let sig = ed25519_dalek::Signature::from_bytes(&bytes);
            vk.verify_strict(digest, &sig).is_ok()
        }
        PublicMaterial::Secp256r1(pk) => {
            let sig = p256::ecdsa::Signature::from_der(raw)
                .map_err(|_| CryptoError::MalformedSignature)?;
            let verifying_key = p256::ecdsa::VerifyingKey::from(pk);
            verifying_key.verify_prehash(digest, &sig).is_ok()
        }
        PublicMaterial::Rsa(pk) => {
            if raw.len() != pk.size() {
                return Err(CryptoError::MalformedSignature);
            }
            pk.verify(pkcs1v15(signature.hash), digest, raw).is_ok()
        }
        PublicMaterial::Curve25519(_) => return Err(unsupported(key.key_type())),
    };
    Ok(valid)
}
