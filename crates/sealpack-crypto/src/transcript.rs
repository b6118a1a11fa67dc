//! Tagged, length-prefixed byte transcripts.
//!
//! Used to build associated data for key wrapping so that each wrapped
//! content key is bound to the recipient entry it belongs to.

use bytes::{BufMut, BytesMut};

pub mod tags {
    pub const DOMAIN: u32 = 0;
    pub const KEY: u32 = 2;
    pub const ALG: u32 = 3;
    pub const ID: u32 = 6;
}

/// Appends (tag, len, bytes) tuples so the same logical data always
/// serializes the same way.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    buf: BytesMut,
}

impl Transcript {
    pub fn new(domain: &'static str) -> Self {
        let mut t = Self { buf: BytesMut::with_capacity(128) };
        t.append_bytes(tags::DOMAIN, domain.as_bytes());
        t
    }

    pub fn append_bytes(&mut self, tag: u32, data: &[u8]) -> &mut Self {
        self.buf.put_u32(tag);
        self.buf.put_u32(data.len() as u32);
        self.buf.extend_from_slice(data);
        self
    }

    pub fn append_u64(&mut self, tag: u32, v: u64) -> &mut Self {
        self.buf.put_u32(tag);
        self.buf.put_u32(8);
        self.buf.put_u64(v);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }
}
