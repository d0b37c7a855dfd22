//! Unsigned base-128 length prefixes.
//!
//! Seven payload bits per byte, least significant group first, high bit set
//! on every byte except the last. A `u64` needs at most ten bytes; anything
//! longer is treated as corruption.

use std::io::{ErrorKind, Read, Write};

use crate::{CaptureError, Result};

/// Longest valid encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Append the encoding of `value` to `out`.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    while value >= 0x80 {
        out.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

/// Number of bytes [`encode_varint`] emits for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

pub fn write_varint<W: Write + ?Sized>(writer: &mut W, value: u64) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    encode_varint(value, &mut buf);
    writer.write_all(&buf)
}

/// Decode a varint from the front of `bytes`.
///
/// Returns `Ok(None)` when `bytes` ends before the terminating byte, and
/// `(value, consumed)` otherwise.
pub fn decode_varint(bytes: &[u8]) -> Result<Option<(u64, usize)>> {
    let mut value = 0u64;
    for (i, &byte) in bytes.iter().enumerate() {
        value = accumulate(value, byte, i)?;
        if byte & 0x80 == 0 {
            return Ok(Some((value, i + 1)));
        }
    }
    Ok(None)
}

/// Read a varint from a byte stream.
///
/// End of input before the first byte returns `Ok(None)`; end of input after
/// it is a truncated prefix.
pub fn read_varint<R: Read + ?Sized>(reader: &mut R) -> Result<Option<u64>> {
    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let mut byte = [0u8; 1];
        loop {
            match reader.read(&mut byte) {
                Ok(0) if i == 0 => return Ok(None),
                Ok(0) => {
                    return Err(CaptureError::wire(
                        "length prefix",
                        i,
                        "end of input inside length prefix",
                    ));
                }
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(CaptureError::io("length prefix read", e)),
            }
        }
        value = accumulate(value, byte[0], i)?;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
    }
    Err(CaptureError::wire(
        "length prefix",
        MAX_VARINT_LEN,
        format!("no terminating byte within {} bytes", MAX_VARINT_LEN),
    ))
}

#[inline]
fn accumulate(value: u64, byte: u8, index: usize) -> Result<u64> {
    if index >= MAX_VARINT_LEN {
        return Err(CaptureError::wire(
            "length prefix",
            index,
            format!("no terminating byte within {} bytes", MAX_VARINT_LEN),
        ));
    }
    // The tenth byte may only carry the single remaining bit of a u64.
    if index == MAX_VARINT_LEN - 1 && byte > 1 {
        return Err(CaptureError::wire("length prefix", index, "value overflows u64"));
    }
    Ok(value | (u64::from(byte & 0x7f) << (7 * index)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    #[test]
    fn boundary_lengths_round_trip() {
        for (value, width) in [(0u64, 1usize), (127, 1), (128, 2), (16383, 2), (16384, 3)] {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            assert_eq!(buf.len(), width, "width of {value}");
            assert_eq!(varint_len(value), width);

            let mut cursor = Cursor::new(buf.clone());
            assert_eq!(read_varint(&mut cursor).unwrap(), Some(value));
            assert_eq!(decode_varint(&buf).unwrap(), Some((value, width)));
        }
    }

    #[test]
    fn known_encodings() {
        let mut buf = Vec::new();
        encode_varint(300, &mut buf);
        assert_eq!(buf, [0xac, 0x02]);

        buf.clear();
        encode_varint(u64::MAX, &mut buf);
        assert_eq!(buf.len(), MAX_VARINT_LEN);
        assert_eq!(*buf.last().unwrap(), 0x01);
    }

    #[test]
    fn empty_input_is_clean_end() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert_eq!(read_varint(&mut cursor).unwrap(), None);
        assert_eq!(decode_varint(&[]).unwrap(), None);
    }

    #[test]
    fn truncated_prefix_is_an_error() {
        let mut cursor = Cursor::new(vec![0x80, 0x80]);
        assert!(read_varint(&mut cursor).is_err());
        assert_eq!(decode_varint(&[0x80, 0x80]).unwrap(), None);
    }

    #[test]
    fn overlong_prefix_is_rejected() {
        let bytes = vec![0xff; 11];
        assert!(read_varint(&mut Cursor::new(bytes.clone())).is_err());
        assert!(decode_varint(&bytes).is_err());

        let mut overflow = vec![0xff; 9];
        overflow.push(0x02);
        assert!(read_varint(&mut Cursor::new(overflow)).is_err());
    }

    proptest! {
        #[test]
        fn any_value_round_trips(value in any::<u64>()) {
            let mut buf = Vec::new();
            encode_varint(value, &mut buf);
            prop_assert_eq!(buf.len(), varint_len(value));
            prop_assert_eq!(read_varint(&mut Cursor::new(buf)).unwrap(), Some(value));
        }
    }
}
