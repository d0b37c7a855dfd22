//! Field Stream Engine.
//!
//! Protocol messages and capture records are described once, as a
//! [`Streamable`] implementation that walks the message's fields in wire order.
//! The same method runs for encoding and decoding; the [`FieldStream`] it is
//! handed knows which direction it is going.
//!
//! ## Example
//!
//! ```rust
//! use arenacap::codec::{self, FieldStream, Streamable};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Ping {
//!     sequence: u32,
//!     note: String,
//! }
//!
//! impl Streamable for Ping {
//!     fn stream(&mut self, s: &mut FieldStream<'_>) -> arenacap::Result<()> {
//!         s.number(&mut self.sequence)?;
//!         s.text(&mut self.note)
//!     }
//! }
//!
//! let mut ping = Ping { sequence: 7, note: "hello".into() };
//! let bytes = codec::encode(&mut ping)?;
//! let decoded: Ping = codec::decode(&bytes)?;
//! assert_eq!(decoded, ping);
//! # Ok::<(), arenacap::CaptureError>(())
//! ```
//!
//! ## Decode Targets
//!
//! Primitives overwrite fields in place, so a message that fails halfway
//! through [`FieldStream`] decoding is left partially populated. [`decode`]
//! and [`decode_into`] always decode into a fresh value and only hand it
//! over once every field succeeded.

mod stream;

pub use stream::{
    Compression, Endian, FieldStream, Number, SUBDOCUMENT_COMPRESSION_LEVEL, StreamMode,
};

use crate::{CaptureError, Result};

/// A message with a single symmetric stream operation.
///
/// Implementations call [`FieldStream`] primitives in the message's fixed
/// field order and return the first failure unchanged.
pub trait Streamable {
    fn stream(&mut self, stream: &mut FieldStream<'_>) -> Result<()>;
}

/// Encode a message into a new buffer.
///
/// Takes `&mut` because encoding runs the same stream operation as decoding;
/// the message is not modified.
pub fn encode<M: Streamable + ?Sized>(message: &mut M) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    encode_into(message, &mut out)?;
    Ok(out)
}

/// Encode a message into `out`, replacing its contents and reusing its capacity.
pub fn encode_into<M: Streamable + ?Sized>(message: &mut M, out: &mut Vec<u8>) -> Result<()> {
    let mut stream = FieldStream::encoder_with(std::mem::take(out));
    message.stream(&mut stream)?;
    *out = stream.into_bytes();
    Ok(())
}

/// Decode a message that occupies all of `bytes`.
pub fn decode<M: Streamable + Default>(bytes: &[u8]) -> Result<M> {
    let (message, consumed) = decode_prefix(bytes)?;
    if consumed != bytes.len() {
        return Err(CaptureError::wire(
            "message",
            consumed,
            format!("{} trailing bytes after message", bytes.len() - consumed),
        ));
    }
    Ok(message)
}

/// Decode a message from the front of `bytes`, returning it with the number of
/// bytes consumed.
pub fn decode_prefix<M: Streamable + Default>(bytes: &[u8]) -> Result<(M, usize)> {
    let mut message = M::default();
    let mut stream = FieldStream::decoder(bytes);
    message.stream(&mut stream)?;
    Ok((message, stream.position()))
}

/// Decode into an existing target, which is only replaced when decoding
/// succeeds.
pub fn decode_into<M: Streamable + Default>(bytes: &[u8], target: &mut M) -> Result<()> {
    *target = decode(bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        id: Uuid,
        name: String,
        scores: Vec<u64>,
        level: u8,
    }

    impl Streamable for Sample {
        fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
            s.guid(&mut self.id)?;
            s.text(&mut self.name)?;
            s.vec::<u32, _>(&mut self.scores)?;
            s.byte(&mut self.level)
        }
    }

    fn sample() -> Sample {
        Sample { id: Uuid::from_u128(0xfeed), name: "orange".into(), scores: vec![1, 2, 3], level: 9 }
    }

    #[test]
    fn one_method_drives_both_directions() {
        let mut original = sample();
        let bytes = encode(&mut original).unwrap();
        assert_eq!(bytes.len(), 16 + 7 + 4 + 24 + 1);
        let decoded: Sample = decode(&bytes).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_into_leaves_target_untouched_on_failure() {
        let mut original = sample();
        let bytes = encode(&mut original).unwrap();

        let mut target = Sample { name: "keep".into(), ..Sample::default() };
        let truncated = &bytes[..bytes.len() - 5];
        assert!(decode_into(truncated, &mut target).is_err());
        assert_eq!(target.name, "keep");

        decode_into(&bytes, &mut target).unwrap();
        assert_eq!(target, original);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut original = sample();
        let mut bytes = encode(&mut original).unwrap();
        bytes.push(0);
        assert!(decode::<Sample>(&bytes).is_err());

        let (decoded, consumed) = decode_prefix::<Sample>(&bytes).unwrap();
        assert_eq!(decoded, original);
        assert_eq!(consumed, bytes.len() - 1);
    }

    #[test]
    fn encode_into_reuses_buffer() {
        let mut buffer = Vec::with_capacity(256);
        encode_into(&mut sample(), &mut buffer).unwrap();
        let first = buffer.clone();
        encode_into(&mut sample(), &mut buffer).unwrap();
        assert_eq!(buffer, first);
        assert!(buffer.capacity() >= 256);
    }
}
