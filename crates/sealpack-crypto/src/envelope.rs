//! Multi-recipient envelopes.
//!
//! Wire layout:
//!
//! ```text
//! [u32 BE header length][MessageInfoV1][ciphertext][16-byte tag]
//! ```
//!
//! A random content key seals the body with ChaCha20-Poly1305 and is wrapped
//! once per recipient inside the header. The whole framed header is the
//! associated data of the body, so recipients and custom parameters are
//! authenticated together with the ciphertext.
//!
//! Encryption and decryption are incremental. The buffered helpers drive the
//! same sessions as the streaming ones, which keeps both paths byte-identical.

use prost::Message;
use rand_core::CryptoRngCore;
use tracing::{debug, trace};

use sealpack_proto::v1::{
    CustomParamV1, DataCipherAlgV1, DataCipherV1, MessageInfoV1, MESSAGE_INFO_VERSION,
};
use sealpack_proto::validation::Validate;

use crate::aead::{Opener, Sealer, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};
use crate::recipient::{unwrap_for, wrap_for};

const LENGTH_PREFIX_SIZE: usize = 4;

/// Upper bound on the encoded message-info header.
pub const MAX_HEADER_SIZE: usize = 1024 * 1024;

/// Ordered byte-string metadata carried inside the envelope header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomParams {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl CustomParams {
    /// An empty parameter block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, replacing an existing entry in place.
    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Value stored under `key`, if any.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn to_proto(&self) -> Vec<CustomParamV1> {
        self.entries
            .iter()
            .map(|(k, v)| CustomParamV1::from((k.as_slice(), v.as_slice())))
            .collect()
    }

    fn from_proto(params: Vec<CustomParamV1>) -> Self {
        Self { entries: params.into_iter().map(Into::into).collect() }
    }
}

/// Collects recipients and custom parameters before encryption starts.
///
/// `start` consumes the builder, so nothing can be added to the header once
/// the body is being produced.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeEncryptor {
    recipients: Vec<PublicKey>,
    custom_params: CustomParams,
}

impl EnvelopeEncryptor {
    /// No recipients and no custom parameters yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a recipient. Keys already present (same identifier) are skipped.
    pub fn add_recipient(&mut self, key: &PublicKey) -> &mut Self {
        if !self.recipients.iter().any(|r| r.identifier() == key.identifier()) {
            self.recipients.push(key.clone());
        }
        self
    }

    pub fn add_recipients<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a PublicKey>,
    ) -> &mut Self {
        for key in keys {
            self.add_recipient(key);
        }
        self
    }

    pub fn custom_params_mut(&mut self) -> &mut CustomParams {
        &mut self.custom_params
    }

    /// Generate the content key, wrap it for every recipient and build the
    /// header.
    pub fn start<R: CryptoRngCore>(self, rng: &mut R) -> Result<EncryptionSession, CryptoError> {
        if self.recipients.is_empty() {
            return Err(CryptoError::NoRecipients);
        }

        let mut content_key = zeroize::Zeroizing::new([0u8; KEY_SIZE]);
        rng.try_fill_bytes(content_key.as_mut_slice())
            .map_err(|_| CryptoError::Random)?;
        let mut nonce = [0u8; NONCE_SIZE];
        rng.try_fill_bytes(&mut nonce).map_err(|_| CryptoError::Random)?;

        let recipients = self
            .recipients
            .iter()
            .map(|r| wrap_for(r, &content_key, &mut *rng))
            .collect::<Result<Vec<_>, _>>()?;

        let info = MessageInfoV1 {
            version: MESSAGE_INFO_VERSION,
            recipients,
            data_cipher: Some(DataCipherV1 {
                alg: DataCipherAlgV1::ChaCha20Poly1305 as i32,
                nonce: nonce.to_vec(),
            }),
            custom_params: self.custom_params.to_proto(),
        };
        info.validate().map_err(CryptoError::malformed_envelope)?;
        let header = frame_header(&info)?;

        debug!(
            recipients = self.recipients.len(),
            custom_params = self.custom_params.len(),
            header_len = header.len(),
            "envelope encryption started"
        );

        Ok(EncryptionSession {
            sealer: Sealer::new(&content_key, &nonce, &header),
            header,
        })
    }
}

fn frame_header(info: &MessageInfoV1) -> Result<Vec<u8>, CryptoError> {
    let encoded = info.encode_to_vec();
    if encoded.len() > MAX_HEADER_SIZE {
        return Err(CryptoError::malformed_envelope("header exceeds size limit"));
    }
    let mut framed = Vec::with_capacity(LENGTH_PREFIX_SIZE + encoded.len());
    framed.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
    framed.extend_from_slice(&encoded);
    Ok(framed)
}

/// An envelope being produced: header first, then body pieces, then the tag.
pub struct EncryptionSession {
    header: Vec<u8>,
    sealer: Sealer,
}

impl EncryptionSession {
    /// Framed header; must be written before any body bytes.
    pub fn header(&self) -> &[u8] {
        &self.header
    }

    /// Encrypt the next piece of plaintext in place.
    pub fn seal_in_place(&mut self, buf: &mut [u8]) -> Result<(), CryptoError> {
        self.sealer.seal_in_place(buf)
    }

    /// Authentication tag closing the envelope.
    pub fn finish(self) -> [u8; TAG_SIZE] {
        self.sealer.finish()
    }

    /// Seal a whole buffer into a complete envelope.
    pub fn seal(mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut out = Vec::with_capacity(self.header.len() + plaintext.len() + TAG_SIZE);
        out.extend_from_slice(&self.header);
        let body_start = out.len();
        out.extend_from_slice(plaintext);
        self.seal_in_place(&mut out[body_start..])?;
        out.extend_from_slice(&self.finish());
        Ok(out)
    }
}

enum DecryptState {
    Header(Vec<u8>),
    Body {
        opener: Opener,
        custom_params: CustomParams,
        // last bytes seen; may be the tag
        tail: Vec<u8>,
    },
}

/// Incremental envelope decryption.
///
/// Plaintext is emitted as soon as it is available; it is only trustworthy
/// once [`EnvelopeDecryptor::finish`] has verified the tag.
pub struct EnvelopeDecryptor<'k> {
    key: &'k PrivateKey,
    state: DecryptState,
}

impl<'k> EnvelopeDecryptor<'k> {
    /// Start decrypting an envelope addressed to `key`.
    pub fn new(key: &'k PrivateKey) -> Self {
        Self {
            key,
            state: DecryptState::Header(Vec::new()),
        }
    }

    /// Feed the next piece of the envelope, appending any plaintext to `out`.
    pub fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CryptoError> {
        match &mut self.state {
            DecryptState::Header(buf) => {
                buf.extend_from_slice(input);
                let Some(end) = header_end(buf)? else {
                    return Ok(());
                };
                let (mut opener, custom_params) = open_header(self.key, &buf[..end])?;
                let buf = std::mem::take(buf);
                let mut tail = Vec::with_capacity(TAG_SIZE);
                feed_body(&mut opener, &mut tail, &buf[end..], out)?;
                self.state = DecryptState::Body { opener, custom_params, tail };
                Ok(())
            }
            DecryptState::Body { opener, tail, .. } => feed_body(opener, tail, input, out),
        }
    }

    /// Custom parameters of the envelope, once the header has been read.
    pub fn custom_params(&self) -> Option<&CustomParams> {
        match &self.state {
            DecryptState::Header(_) => None,
            DecryptState::Body { custom_params, .. } => Some(custom_params),
        }
    }

    /// Verify the tag. Input that ended early fails authentication.
    pub fn finish(self) -> Result<CustomParams, CryptoError> {
        match self.state {
            DecryptState::Header(_) => Err(CryptoError::AuthenticationFailed),
            DecryptState::Body { opener, custom_params, tail } => {
                if tail.len() != TAG_SIZE {
                    return Err(CryptoError::AuthenticationFailed);
                }
                opener.verify(&tail)?;
                trace!("envelope tag verified");
                Ok(custom_params)
            }
        }
    }
}

/// Decrypt everything but the last `TAG_SIZE` bytes seen so far, which stay
/// in `tail` until the next call or [`EnvelopeDecryptor::finish`].
fn feed_body(
    opener: &mut Opener,
    tail: &mut Vec<u8>,
    input: &[u8],
    out: &mut Vec<u8>,
) -> Result<(), CryptoError> {
    let total = tail.len() + input.len();
    if total <= TAG_SIZE {
        tail.extend_from_slice(input);
        return Ok(());
    }
    let n = total - TAG_SIZE;
    let from_tail = n.min(tail.len());
    let start = out.len();
    out.extend_from_slice(&tail[..from_tail]);
    out.extend_from_slice(&input[..n - from_tail]);
    tail.drain(..from_tail);
    tail.extend_from_slice(&input[n - from_tail..]);
    opener.open_in_place(&mut out[start..])
}

/// Length of the framed header once enough bytes are buffered.
fn header_end(buf: &[u8]) -> Result<Option<usize>, CryptoError> {
    let Some(prefix) = buf.get(..LENGTH_PREFIX_SIZE) else {
        return Ok(None);
    };
    let mut len_bytes = [0u8; LENGTH_PREFIX_SIZE];
    len_bytes.copy_from_slice(prefix);
    let header_len = u32::from_be_bytes(len_bytes) as usize;
    if header_len > MAX_HEADER_SIZE {
        return Err(CryptoError::malformed_envelope("header exceeds size limit"));
    }
    let end = LENGTH_PREFIX_SIZE + header_len;
    Ok((buf.len() >= end).then_some(end))
}

fn open_header(
    key: &PrivateKey,
    framed: &[u8],
) -> Result<(Opener, CustomParams), CryptoError> {
    let info = MessageInfoV1::decode(&framed[LENGTH_PREFIX_SIZE..])
        .map_err(CryptoError::malformed_envelope)?;
    info.validate().map_err(CryptoError::malformed_envelope)?;

    let data_cipher = info
        .data_cipher
        .as_ref()
        .ok_or_else(|| CryptoError::malformed_envelope("missing data cipher"))?;
    let nonce: [u8; NONCE_SIZE] = data_cipher
        .nonce
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::malformed_envelope("bad data nonce"))?;

    let entry = info
        .recipients
        .iter()
        .find(|r| key.identifier().matches(&r.recipient_id))
        .ok_or(CryptoError::RecipientNotFound)?;
    let content_key = unwrap_for(key, entry)?;

    debug!(
        recipient = %key.identifier(),
        recipients = info.recipients.len(),
        custom_params = info.custom_params.len(),
        "envelope header accepted"
    );

    Ok((
        Opener::new(&content_key, &nonce, framed),
        CustomParams::from_proto(info.custom_params),
    ))
}

/// Recipient identifiers listed in an envelope header, without decrypting.
pub fn peek_recipients(envelope: &[u8]) -> Result<Vec<Vec<u8>>, CryptoError> {
    let end = header_end(envelope)?
        .ok_or_else(|| CryptoError::malformed_envelope("truncated header"))?;
    let info = MessageInfoV1::decode(&envelope[LENGTH_PREFIX_SIZE..end])
        .map_err(CryptoError::malformed_envelope)?;
    info.validate().map_err(CryptoError::malformed_envelope)?;
    Ok(info.recipients.into_iter().map(|r| r.recipient_id).collect())
}
