//! Per-recipient wrapping of the envelope content key.
//!
//! Elliptic-curve recipients get an ECIES-style wrap: an ephemeral key
//! agreement, HKDF-SHA256 over the shared secret, and ChaCha20-Poly1305
//! over the content key. RSA recipients get RSA-OAEP-SHA256.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use hkdf::Hkdf;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::CryptoRngCore;
use rsa::Oaep;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroizing;

use sealpack_proto::v1::KeyRecipientV1;

use crate::aead::KEY_SIZE;
use crate::error::CryptoError;
use crate::hash::sha512;
use crate::keys::{PrivateKey, PrivateMaterial, PublicKey, PublicMaterial};
use crate::transcript::{tags, Transcript};

pub type ContentKey = Zeroizing<[u8; KEY_SIZE]>;

/// Ed25519 keys receive through their Montgomery form.
fn x25519_public(material: &PublicMaterial) -> Option<X25519PublicKey> {
    match material {
        PublicMaterial::Curve25519(pk) => Some(*pk),
        PublicMaterial::Ed25519(vk) => Some(X25519PublicKey::from(vk.to_montgomery().to_bytes())),
        _ => None,
    }
}

fn x25519_secret(material: &PrivateMaterial) -> Option<StaticSecret> {
    match material {
        PrivateMaterial::Curve25519(secret) => Some(secret.clone()),
        PrivateMaterial::Ed25519(sk) => {
            // Same scalar Ed25519 derives from its seed; X25519 clamps it on use
            let expanded = Zeroizing::new(sha512(&sk.to_bytes()));
            let mut scalar = Zeroizing::new([0u8; 32]);
            scalar.copy_from_slice(&expanded[..32]);
            Some(StaticSecret::from(*scalar))
        }
        _ => None,
    }
}

fn kdf_key_nonce(
    shared_secret: &[u8],
    salt: &[u8],
) -> Result<(Zeroizing<[u8; 32]>, [u8; 12]), CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), shared_secret);

    let mut key = Zeroizing::new([0u8; 32]);
    hk.expand(b"sealpack_wrap_v1_key", key.as_mut_slice())
        .map_err(|_| CryptoError::Encryption)?;

    let mut nonce = [0u8; 12];
    hk.expand(b"sealpack_wrap_v1_nonce", &mut nonce)
        .map_err(|_| CryptoError::Encryption)?;

    Ok((key, nonce))
}

fn wrap_aad(recipient_id: &[u8], key_alg: i32, encapsulated_key: &[u8]) -> Vec<u8> {
    let mut t = Transcript::new("sealpack_wrap_aad_v1");
    t.append_bytes(tags::ID, recipient_id);
    t.append_u64(tags::ALG, key_alg as u64);
    t.append_bytes(tags::KEY, encapsulated_key);
    t.as_bytes().to_vec()
}

fn seal_content_key(
    shared_secret: &[u8],
    salt: &[u8],
    aad: &[u8],
    content_key: &[u8; KEY_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    let (key, nonce) = kdf_key_nonce(shared_secret, salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    cipher
        .encrypt(Nonce::from_slice(&nonce), Payload { msg: content_key, aad })
        .map_err(|_| CryptoError::Encryption)
}

fn open_content_key(
    shared_secret: &[u8],
    salt: &[u8],
    aad: &[u8],
    wrapped: &[u8],
) -> Result<ContentKey, CryptoError> {
    let (key, nonce) = kdf_key_nonce(shared_secret, salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    let plain = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&nonce), Payload { msg: wrapped, aad })
            .map_err(|_| CryptoError::AuthenticationFailed)?,
    );
    content_key_from(&plain)
}

fn content_key_from(bytes: &[u8]) -> Result<ContentKey, CryptoError> {
    if bytes.len() != KEY_SIZE {
        return Err(CryptoError::AuthenticationFailed);
    }
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(bytes);
    Ok(key)
}

/// Wrap `content_key` for one recipient.
pub(crate) fn wrap_for<R: CryptoRngCore>(
    recipient: &PublicKey,
    content_key: &[u8; KEY_SIZE],
    rng: &mut R,
) -> Result<KeyRecipientV1, CryptoError> {
    let recipient_id = recipient.identifier().as_bytes().to_vec();
    let key_alg = recipient.key_type().alg_id() as i32;

    let (encapsulated_key, wrapped_key) = match recipient.material() {
        PublicMaterial::Rsa(pk) => {
            let wrapped = pk
                .encrypt(rng, Oaep::new::<Sha256>(), content_key)
                .map_err(|_| CryptoError::Encryption)?;
            (Vec::new(), wrapped)
        }
        PublicMaterial::Secp256r1(pk) => {
            let eph = p256::ecdh::EphemeralSecret::random(rng);
            let eph_point = eph.public_key().to_encoded_point(false).as_bytes().to_vec();
            let shared = eph.diffie_hellman(pk);

            let salt = [eph_point.as_slice(), pk.to_encoded_point(false).as_bytes()].concat();
            let aad = wrap_aad(&recipient_id, key_alg, &eph_point);
            let wrapped =
                seal_content_key(shared.raw_secret_bytes(), &salt, &aad, content_key)?;
            (eph_point, wrapped)
        }
        material => {
            let recipient_pub = x25519_public(material).ok_or(CryptoError::Encryption)?;
            let eph = EphemeralSecret::random_from_rng(rng);
            let eph_pub = X25519PublicKey::from(&eph);
            let shared = eph.diffie_hellman(&recipient_pub);
            if !shared.was_contributory() {
                return Err(CryptoError::Encryption);
            }

            let salt = [eph_pub.as_bytes().as_slice(), recipient_pub.as_bytes()].concat();
            let aad = wrap_aad(&recipient_id, key_alg, eph_pub.as_bytes());
            let wrapped = seal_content_key(shared.as_bytes(), &salt, &aad, content_key)?;
            (eph_pub.as_bytes().to_vec(), wrapped)
        }
    };

    Ok(KeyRecipientV1 {
        recipient_id,
        key_alg,
        encapsulated_key,
        wrapped_key,
    })
}

/// Recover the content key from the entry addressed to `key`.
pub(crate) fn unwrap_for(
    key: &PrivateKey,
    entry: &KeyRecipientV1,
) -> Result<ContentKey, CryptoError> {
    if entry.key_alg != key.key_type().alg_id() as i32 {
        return Err(CryptoError::AuthenticationFailed);
    }
    let aad = wrap_aad(&entry.recipient_id, entry.key_alg, &entry.encapsulated_key);

    match key.material() {
        PrivateMaterial::Rsa(sk) => {
            let plain = Zeroizing::new(
                sk.decrypt(Oaep::new::<Sha256>(), &entry.wrapped_key)
                    .map_err(|_| CryptoError::AuthenticationFailed)?,
            );
            content_key_from(&plain)
        }
        PrivateMaterial::Secp256r1(sk) => {
            let eph = p256::PublicKey::from_sec1_bytes(&entry.encapsulated_key)
                .map_err(|_| CryptoError::AuthenticationFailed)?;
            let shared = p256::ecdh::diffie_hellman(sk.to_nonzero_scalar(), eph.as_affine());

            let own_point = sk.public_key().to_encoded_point(false);
            let salt = [entry.encapsulated_key.as_slice(), own_point.as_bytes()].concat();
            open_content_key(shared.raw_secret_bytes(), &salt, &aad, &entry.wrapped_key)
        }
        material => {
            let secret = x25519_secret(material).ok_or(CryptoError::AuthenticationFailed)?;
            let eph_bytes: [u8; 32] = entry
                .encapsulated_key
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::AuthenticationFailed)?;
            let eph_pub = X25519PublicKey::from(eph_bytes);
            let shared = secret.diffie_hellman(&eph_pub);
            if !shared.was_contributory() {
                return Err(CryptoError::AuthenticationFailed);
            }

            let own_pub = X25519PublicKey::from(&secret);
            let salt = [eph_bytes.as_slice(), own_pub.as_bytes()].concat();
            open_content_key(shared.as_bytes(), &salt, &aad, &entry.wrapped_key)
        }
    }
}
