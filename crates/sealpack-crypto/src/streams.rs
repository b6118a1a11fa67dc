//! Reader/writer variants of the engine operations.
//!
//! Input is consumed in pieces of at most `chunk_size` bytes until a read
//! returns zero. Short reads are normal and simply produce a short piece.
//! The output of every operation equals its buffered counterpart.

use std::io::{self, Read, Write};

use rand_core::OsRng;
use tracing::debug;
use zeroize::Zeroizing;

use crate::engine::CryptoEngine;
use crate::envelope::{CustomParams, EnvelopeDecryptor};
use crate::error::CryptoError;
use crate::hash::Hasher;
use crate::keys::{PrivateKey, PublicKey};
use crate::signer::{self, ParsedSignature};

/// Feed `reader` to `f` piece by piece. Returns the number of bytes read.
pub(crate) fn for_each_chunk<R, F>(
    reader: &mut R,
    chunk_size: usize,
    mut f: F,
) -> Result<u64, CryptoError>
where
    R: Read + ?Sized,
    F: FnMut(&mut [u8]) -> Result<(), CryptoError>,
{
    let mut buf = Zeroizing::new(vec![0u8; chunk_size.max(1)]);
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        f(&mut buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}

impl CryptoEngine {
    /// Encrypt everything `reader` yields into `writer`.
    pub fn encrypt_stream<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        recipients: &[PublicKey],
    ) -> Result<(), CryptoError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut session = self.encryptor(recipients, CustomParams::new()).start(&mut OsRng)?;
        writer.write_all(session.header())?;
        let total = for_each_chunk(reader, self.config().chunk_size, |chunk| {
            session.seal_in_place(chunk)?;
            writer.write_all(chunk)?;
            Ok(())
        })?;
        writer.write_all(&session.finish())?;
        writer.flush()?;
        debug!(bytes = total, recipients = recipients.len(), "stream encrypted");
        Ok(())
    }

    /// Decrypt an envelope read from `reader` into `writer`.
    ///
    /// Plaintext reaches `writer` before the tag is checked. When this
    /// returns an error, whatever was written must be discarded.
    pub fn decrypt_stream<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        key: &PrivateKey,
    ) -> Result<(), CryptoError>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut dec = EnvelopeDecryptor::new(key);
        let mut plain = Zeroizing::new(Vec::with_capacity(self.config().chunk_size));
        let total = for_each_chunk(reader, self.config().chunk_size, |chunk| {
            plain.clear();
            dec.update(chunk, &mut plain)?;
            writer.write_all(&plain)?;
            Ok(())
        })?;
        dec.finish()?;
        writer.flush()?;
        debug!(bytes = total, identifier = %key.identifier(), "stream decrypted");
        Ok(())
    }

    /// Stream counterpart of [`CryptoEngine::sign`].
    pub fn sign_stream<R>(&self, reader: &mut R, key: &PrivateKey) -> Result<Vec<u8>, CryptoError>
    where
        R: Read + ?Sized,
    {
        let hash = self.config().signature_hash;
        let mut hasher = Hasher::new(hash);
        for_each_chunk(reader, self.config().chunk_size, |chunk| {
            hasher.update(chunk);
            Ok(())
        })?;
        signer::sign_digest(key, hash, &hasher.finalize())
    }

    /// Stream counterpart of [`CryptoEngine::verify`].
    pub fn verify_stream<R>(
        &self,
        reader: &mut R,
        signature: &[u8],
        key: &PublicKey,
    ) -> Result<bool, CryptoError>
    where
        R: Read + ?Sized,
    {
        let parsed = ParsedSignature::from_der(signature)?;
        let mut hasher = Hasher::new(parsed.hash);
        for_each_chunk(reader, self.config().chunk_size, |chunk| {
            hasher.update(chunk);
            Ok(())
        })?;
        signer::verify_digest(key, &parsed, &hasher.finalize())
    }
}
