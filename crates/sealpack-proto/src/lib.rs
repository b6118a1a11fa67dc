#![forbid(unsafe_code)]

//! Wire format of the sealpack envelope header ("message info").
//!
//! The message info is the self-describing prefix of every envelope. It lists
//! the recipients together with their wrapped content keys, the parameters of
//! the body cipher and an optional block of custom parameters. Byte framing
//! around it is owned by `sealpack-crypto`.

pub mod conversions;
pub mod validation;

#[cfg(test)]
mod proptests;

pub mod v1 {
    //! Version 1 of the message-info schema, generated from
    //! `sealpack_v1.proto`.

    include!(concat!(env!("OUT_DIR"), "/sealpack.v1.rs"));

    /// Current message-info schema version.
    pub const MESSAGE_INFO_VERSION: u32 = 1;
}
