//! Incremental ChaCha20-Poly1305 (RFC 8439) for envelope bodies.
//!
//! The body is sealed chunk by chunk with a single tag at the end, so the
//! output is identical to a one-shot `chacha20poly1305` seal over the whole
//! body no matter how the input was split.

use chacha20::cipher::{KeyIvInit, StreamCipher, StreamCipherSeek};
use chacha20::ChaCha20;
use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::{Block, Poly1305};
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::utils::constant_time_compare;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

const BLOCK_SIZE: usize = 16;

struct BodyCipher {
    cipher: ChaCha20,
    mac: Poly1305,
    // ciphertext not yet fed to the MAC because it does not fill a block
    pending: [u8; BLOCK_SIZE],
    pending_len: usize,
    aad_len: u64,
    ct_len: u64,
}

impl BodyCipher {
    fn new(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], aad: &[u8]) -> Self {
        let mut cipher = ChaCha20::new(
            chacha20::Key::from_slice(key),
            chacha20::Nonce::from_slice(nonce),
        );

        // Block 0 of the keystream is the one-time Poly1305 key
        let mut mac_key = poly1305::Key::default();
        cipher.apply_keystream(&mut mac_key);
        let mut mac = Poly1305::new(&mac_key);
        mac_key.zeroize();
        cipher.seek(64u64);

        mac.update_padded(aad);

        Self {
            cipher,
            mac,
            pending: [0u8; BLOCK_SIZE],
            pending_len: 0,
            aad_len: aad.len() as u64,
            ct_len: 0,
        }
    }

    fn keystream(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.cipher
            .try_apply_keystream(buf)
            .map_err(|_| CryptoError::Encryption)
    }

    fn absorb(&mut self, mut ct: &[u8]) {
        self.ct_len += ct.len() as u64;

        if self.pending_len > 0 {
            let take = (BLOCK_SIZE - self.pending_len).min(ct.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&ct[..take]);
            self.pending_len += take;
            ct = &ct[take..];
            if self.pending_len < BLOCK_SIZE {
                return;
            }
            let block = Block::clone_from_slice(&self.pending);
            self.mac.update(&[block]);
            self.pending_len = 0;
        }

        let mut blocks = ct.chunks_exact(BLOCK_SIZE);
        for chunk in &mut blocks {
            self.mac.update(&[Block::clone_from_slice(chunk)]);
        }
        let rest = blocks.remainder();
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
    }

    fn tag(mut self) -> [u8; TAG_SIZE] {
        self.mac.update_padded(&self.pending[..self.pending_len]);

        let mut lengths = Block::default();
        lengths[..8].copy_from_slice(&self.aad_len.to_le_bytes());
        lengths[8..].copy_from_slice(&self.ct_len.to_le_bytes());
        self.mac.update(&[lengths]);

        let out = self.mac.finalize();
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(&out);
        tag
    }
}

/// Encrypting half of the body cipher.
pub struct Sealer(BodyCipher);

impl Sealer {
    pub fn new(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], aad: &[u8]) -> Self {
        Sealer(BodyCipher::new(key, nonce, aad))
    }

    /// Encrypt the next piece of the body in place.
    pub fn seal_in_place(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.0.keystream(buf)?;
        self.0.absorb(buf);
        Ok(())
    }

    /// Tag over the header and every sealed piece.
    pub fn finish(self) -> [u8; TAG_SIZE] {
        self.0.tag()
    }
}

/// Decrypting half of the body cipher.
pub struct Opener(BodyCipher);

impl Opener {
    pub fn new(key: &[u8; KEY_SIZE], nonce: &[u8; NONCE_SIZE], aad: &[u8]) -> Self {
        Opener(BodyCipher::new(key, nonce, aad))
    }

    /// Decrypt the next piece of the body in place.
    pub fn open_in_place(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.0.absorb(buf);
        self.0.keystream(buf)
    }

    /// Compare `tag` against the one computed over everything opened.
    pub fn verify(self, tag: &[u8]) -> Result<(), CryptoError> {
        let expected = self.0.tag();
        if constant_time_compare(&expected, tag) {
            Ok(())
        } else {
            Err(CryptoError::AuthenticationFailed)
        }
    }
}
