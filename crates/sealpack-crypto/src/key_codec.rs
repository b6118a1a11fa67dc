//! DER / PEM key serialization.
//!
//! Public keys travel as SubjectPublicKeyInfo, private keys as PKCS#8
//! (optionally PBES2-encrypted). The algorithm is detected from the OID.

use der::asn1::{BitStringRef, ObjectIdentifier, OctetStringRef};
use der::{AnyRef, Decode, Encode};
use ed25519_dalek::{SigningKey, VerifyingKey};
use pkcs8::pkcs5::pbes2;
use pkcs8::{DecodePrivateKey, EncodePrivateKey, EncryptedPrivateKeyInfo, PrivateKeyInfo};
use rsa::{RsaPrivateKey, RsaPublicKey};
use spki::{AlgorithmIdentifierRef, DecodePublicKey, EncodePublicKey, SubjectPublicKeyInfoRef};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::keys::{PrivateMaterial, PublicMaterial};
use crate::rng::fill_random;

pub const ID_X25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.110");
pub const ID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
pub const ID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
pub const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// PBKDF2 iteration count for password-protected exports.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

const PEM_PREFIX: &[u8] = b"-----BEGIN";

pub(crate) fn encode_public(material: &PublicMaterial) -> Result<Vec<u8>, CryptoError> {
    let doc = match material {
        PublicMaterial::Curve25519(pk) => return x25519_spki(pk),
        PublicMaterial::Ed25519(vk) => vk.to_public_key_der(),
        PublicMaterial::Secp256r1(pk) => pk.to_public_key_der(),
        PublicMaterial::Rsa(pk) => pk.to_public_key_der(),
    };
    doc.map(|d| d.as_bytes().to_vec())
        .map_err(CryptoError::malformed_key)
}

fn x25519_spki(pk: &X25519PublicKey) -> Result<Vec<u8>, CryptoError> {
    let spki = SubjectPublicKeyInfoRef {
        algorithm: AlgorithmIdentifierRef { oid: ID_X25519, parameters: None },
        subject_public_key: BitStringRef::from_bytes(pk.as_bytes())
            .map_err(CryptoError::malformed_key)?,
    };
    spki.to_der().map_err(CryptoError::malformed_key)
}

/// Parse a DER or PEM SubjectPublicKeyInfo.
pub(crate) fn decode_public(data: &[u8]) -> Result<PublicMaterial, CryptoError> {
    if data.is_empty() {
        return Err(CryptoError::EmptyKeyData);
    }
    let pem_der;
    let der = if data.starts_with(PEM_PREFIX) {
        let (label, doc) = der::Document::from_pem(pem_str(data)?)
            .map_err(CryptoError::malformed_key)?;
        if label != "PUBLIC KEY" {
            return Err(CryptoError::malformed_key(format!("unexpected PEM label {}", label)));
        }
        pem_der = doc;
        pem_der.as_bytes()
    } else {
        data
    };

    let info = SubjectPublicKeyInfoRef::from_der(der).map_err(CryptoError::malformed_key)?;
    let oid = info.algorithm.oid;
    let material = if oid == ID_X25519 {
        let bytes: [u8; 32] = info
            .subject_public_key
            .as_bytes()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| CryptoError::malformed_key("X25519 public key must be 32 bytes"))?;
        PublicMaterial::Curve25519(X25519PublicKey::from(bytes))
    } else if oid == ID_ED25519 {
        PublicMaterial::Ed25519(
            VerifyingKey::from_public_key_der(der).map_err(CryptoError::malformed_key)?,
        )
    } else if oid == ID_EC_PUBLIC_KEY {
        PublicMaterial::Secp256r1(
            p256::PublicKey::from_public_key_der(der).map_err(CryptoError::malformed_key)?,
        )
    } else if oid == RSA_ENCRYPTION {
        PublicMaterial::Rsa(Box::new(
            RsaPublicKey::from_public_key_der(der).map_err(CryptoError::malformed_key)?,
        ))
    } else {
        return Err(CryptoError::malformed_key(format!("unsupported algorithm {}", oid)));
    };
    Ok(material)
}

/// Unencrypted PKCS#8 DER.
pub(crate) fn encode_private(material: &PrivateMaterial) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let doc = match material {
        PrivateMaterial::Curve25519(secret) => return x25519_pkcs8(secret),
        PrivateMaterial::Ed25519(sk) => sk.to_pkcs8_der(),
        PrivateMaterial::Secp256r1(sk) => sk.to_pkcs8_der(),
        PrivateMaterial::Rsa(sk) => sk.to_pkcs8_der(),
    };
    doc.map(|d| Zeroizing::new(d.as_bytes().to_vec()))
        .map_err(CryptoError::malformed_key)
}

fn x25519_pkcs8(secret: &StaticSecret) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let raw = Zeroizing::new(secret.to_bytes());
    // CurvePrivateKey is itself an OCTET STRING inside privateKey
    let inner = Zeroizing::new(
        OctetStringRef::new(raw.as_slice())
            .and_then(|os| os.to_der())
            .map_err(CryptoError::malformed_key)?,
    );
    let info = PrivateKeyInfo {
        algorithm: AlgorithmIdentifierRef { oid: ID_X25519, parameters: None::<AnyRef<'_>> },
        private_key: inner.as_slice(),
        public_key: None,
    };
    info.to_der().map(Zeroizing::new).map_err(CryptoError::malformed_key)
}

/// PKCS#8 encrypted with PBES2 (PBKDF2-SHA256, AES-256-CBC).
pub(crate) fn encode_private_encrypted(
    material: &PrivateMaterial,
    password: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let plain = encode_private(material)?;
    let info = PrivateKeyInfo::from_der(&plain).map_err(CryptoError::malformed_key)?;

    let mut salt = [0u8; 16];
    let mut iv = [0u8; 16];
    fill_random(&mut salt)?;
    fill_random(&mut iv)?;
    let params = pbes2::Parameters::pbkdf2_sha256_aes256cbc(PBKDF2_ITERATIONS, &salt, &iv)
        .map_err(|_| CryptoError::Encryption)?;

    let doc = info
        .encrypt_with_params(params, password)
        .map_err(|_| CryptoError::Encryption)?;
    Ok(doc.as_bytes().to_vec())
}

/// Parse DER or PEM PKCS#8, decrypting it first when it is protected.
pub(crate) fn decode_private(
    data: &[u8],
    password: Option<&[u8]>,
) -> Result<PrivateMaterial, CryptoError> {
    if data.is_empty() {
        return Err(CryptoError::EmptyKeyData);
    }
    let pem_der;
    let der = if data.starts_with(PEM_PREFIX) {
        let (label, doc) = der::SecretDocument::from_pem(pem_str(data)?)
            .map_err(CryptoError::malformed_key)?;
        if label != "PRIVATE KEY" && label != "ENCRYPTED PRIVATE KEY" {
            return Err(CryptoError::malformed_key(format!("unexpected PEM label {}", label)));
        }
        pem_der = doc;
        pem_der.as_bytes()
    } else {
        data
    };

    if PrivateKeyInfo::from_der(der).is_ok() {
        return decode_plain_private(der);
    }

    let encrypted = EncryptedPrivateKeyInfo::from_der(der).map_err(CryptoError::malformed_key)?;
    let password = password.ok_or(CryptoError::WrongPassword)?;
    let decrypted = encrypted
        .decrypt(password)
        .map_err(|_| CryptoError::WrongPassword)?;
    decode_plain_private(decrypted.as_bytes())
}

fn decode_plain_private(der: &[u8]) -> Result<PrivateMaterial, CryptoError> {
    let info = PrivateKeyInfo::from_der(der).map_err(CryptoError::malformed_key)?;
    let oid = info.algorithm.oid;
    let material = if oid == ID_X25519 {
        let raw = OctetStringRef::from_der(info.private_key).map_err(CryptoError::malformed_key)?;
        let bytes: [u8; 32] = raw
            .as_bytes()
            .try_into()
            .map_err(|_| CryptoError::malformed_key("X25519 private key must be 32 bytes"))?;
        PrivateMaterial::Curve25519(StaticSecret::from(bytes))
    } else if oid == ID_ED25519 {
        PrivateMaterial::Ed25519(
            SigningKey::from_pkcs8_der(der).map_err(CryptoError::malformed_key)?,
        )
    } else if oid == ID_EC_PUBLIC_KEY {
        PrivateMaterial::Secp256r1(
            p256::SecretKey::from_pkcs8_der(der).map_err(CryptoError::malformed_key)?,
        )
    } else if oid == RSA_ENCRYPTION {
        PrivateMaterial::Rsa(Box::new(
            RsaPrivateKey::from_pkcs8_der(der).map_err(CryptoError::malformed_key)?,
        ))
    } else {
        return Err(CryptoError::malformed_key(format!("unsupported algorithm {}", oid)));
    };
    Ok(material)
}

fn pem_str(data: &[u8]) -> Result<&str, CryptoError> {
    std::str::from_utf8(data).map_err(CryptoError::malformed_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_type::KeyType;
    use rand_core::OsRng;

    fn material(kt: KeyType) -> PrivateMaterial {
        PrivateMaterial::generate(kt, &mut OsRng).unwrap()
    }

    #[test]
    fn test_public_der_round_trip() {
        for kt in [KeyType::Curve25519, KeyType::Ed25519, KeyType::Secp256r1] {
            let public = material(kt).public();
            let der = encode_public(&public).unwrap();
            let decoded = decode_public(&der).unwrap();
            assert_eq!(decoded.key_type().unwrap(), kt);
            assert_eq!(encode_public(&decoded).unwrap(), der);
        }
    }

    #[test]
    fn test_x25519_spki_layout() {
        let der = encode_public(&material(KeyType::Curve25519).public()).unwrap();
        // SEQUENCE { SEQUENCE { OID 1.3.101.110 } BIT STRING (33) }
        assert_eq!(der.len(), 44);
        assert_eq!(&der[..12], &hex::decode("302a300506032b656e032100").unwrap()[..]);
    }

    #[test]
    fn test_private_der_round_trip() {
        for kt in [KeyType::Curve25519, KeyType::Ed25519, KeyType::Secp256r1] {
            let original = material(kt);
            let der = encode_private(&original).unwrap();
            let decoded = decode_private(&der, None).unwrap();
            assert_eq!(
                encode_public(&decoded.public()).unwrap(),
                encode_public(&original.public()).unwrap()
            );
        }
    }

    #[test]
    fn test_pem_input_accepted() {
        let original = material(KeyType::Ed25519);
        let der = encode_private(&original).unwrap();
        let pem = der::pem::encode_string("PRIVATE KEY", der::pem::LineEnding::LF, &der).unwrap();
        let decoded = decode_private(pem.as_bytes(), None).unwrap();
        assert_eq!(
            encode_public(&decoded.public()).unwrap(),
            encode_public(&original.public()).unwrap()
        );

        let public_der = encode_public(&original.public()).unwrap();
        let pem = der::pem::encode_string("PUBLIC KEY", der::pem::LineEnding::LF, &public_der)
            .unwrap();
        assert!(decode_public(pem.as_bytes()).is_ok());
    }

    #[test]
    fn test_encrypted_private_key() {
        let original = material(KeyType::Secp256r1);
        let der = encode_private_encrypted(&original, b"correct horse").unwrap();

        let decoded = decode_private(&der, Some(b"correct horse")).unwrap();
        assert_eq!(
            encode_public(&decoded.public()).unwrap(),
            encode_public(&original.public()).unwrap()
        );

        assert!(matches!(
            decode_private(&der, Some(b"battery staple")),
            Err(CryptoError::WrongPassword)
        ));
        assert!(matches!(decode_private(&der, None), Err(CryptoError::WrongPassword)));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(decode_public(&[]), Err(CryptoError::EmptyKeyData)));
        assert!(matches!(decode_private(&[], None), Err(CryptoError::EmptyKeyData)));
        assert!(matches!(
            decode_public(b"\x30\x03\x02\x01\x00"),
            Err(CryptoError::MalformedKey(_))
        ));
        assert!(matches!(
            decode_private(b"definitely not a key", None),
            Err(CryptoError::MalformedKey(_))
        ));
        assert!(matches!(
            decode_public(b"-----BEGIN CERTIFICATE-----\n-----END CERTIFICATE-----\n"),
            Err(CryptoError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_unknown_algorithm_oid() {
        // SEQUENCE { SEQUENCE { OID 1.2.3.4 } BIT STRING (33) }
        let mut spki = hex::decode("302a300506032a0304032100").unwrap();
        spki.extend_from_slice(&[0u8; 32]);
        assert!(matches!(decode_public(&spki), Err(CryptoError::MalformedKey(_))));

        // SEQUENCE { INTEGER 0, SEQUENCE { OID 1.2.3.4 }, OCTET STRING { OCTET STRING (32) } }
        let mut pkcs8 = hex::decode("302e020100300506032a030404220420").unwrap();
        pkcs8.extend_from_slice(&[0u8; 32]);
        assert!(matches!(decode_private(&pkcs8, None), Err(CryptoError::MalformedKey(_))));
    }
}
