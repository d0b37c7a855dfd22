//! Symmetric field stream and its primitives.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::Streamable;
use crate::{CaptureError, Result};

/// zstd level used for compressed sub-documents.
pub const SUBDOCUMENT_COMPRESSION_LEVEL: i32 = 1;

/// Direction of a stream session, fixed when the stream is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Encode,
    Decode,
}

/// Byte order of a fixed-width number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Compression applied to a single structured-text sub-document.
///
/// The mode is part of the wire layout of the message that declares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zstd,
}

/// Fixed-width numeric types the stream can carry.
pub trait Number: Copy + Default {
    /// Encoded width in bytes.
    const WIDTH: usize;
    /// Type name used in error context.
    const NAME: &'static str;

    fn put(self, endian: Endian, out: &mut Vec<u8>);
    fn take(bytes: &[u8], endian: Endian) -> Self;
}

macro_rules! impl_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Number for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();
                const NAME: &'static str = stringify!($ty);

                #[inline]
                fn put(self, endian: Endian, out: &mut Vec<u8>) {
                    match endian {
                        Endian::Little => out.extend_from_slice(&self.to_le_bytes()),
                        Endian::Big => out.extend_from_slice(&self.to_be_bytes()),
                    }
                }

                #[inline]
                fn take(bytes: &[u8], endian: Endian) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..Self::WIDTH]);
                    match endian {
                        Endian::Little => <$ty>::from_le_bytes(buf),
                        Endian::Big => <$ty>::from_be_bytes(buf),
                    }
                }
            }
        )*
    };
}

impl_number!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// A single encode or decode session over one message.
///
/// Every primitive takes `&mut` to the field it covers. In encode mode the
/// field is read and appended to the output buffer; in decode mode the field is
/// overwritten with the next value from the input. A message's [`Streamable`]
/// implementation is the only description of its layout, so both directions
/// always agree on field order.
#[derive(Debug)]
pub struct FieldStream<'a> {
    mode: StreamMode,
    input: &'a [u8],
    position: usize,
    output: Vec<u8>,
}

impl FieldStream<'static> {
    /// Start an encode session with a fresh buffer.
    pub fn encoder() -> Self {
        Self::encoder_with(Vec::new())
    }

    /// Start an encode session that appends to a reused buffer.
    ///
    /// The buffer is cleared first; its capacity is kept.
    pub fn encoder_with(mut buffer: Vec<u8>) -> Self {
        buffer.clear();
        Self { mode: StreamMode::Encode, input: &[], position: 0, output: buffer }
    }
}

impl<'a> FieldStream<'a> {
    /// Start a decode session over `input`.
    pub fn decoder(input: &'a [u8]) -> Self {
        Self { mode: StreamMode::Decode, input, position: 0, output: Vec::new() }
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    pub fn is_decoding(&self) -> bool {
        self.mode == StreamMode::Decode
    }

    /// Bytes written so far (encode) or consumed so far (decode).
    pub fn position(&self) -> usize {
        match self.mode {
            StreamMode::Encode => self.output.len(),
            StreamMode::Decode => self.position,
        }
    }

    /// Unread input bytes. Always zero while encoding.
    pub fn remaining(&self) -> usize {
        self.input.len() - self.position
    }

    /// Consume the stream and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.output
    }

    fn take_bytes(&mut self, len: usize, context: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(CaptureError::wire(
                context,
                self.position,
                format!("short read: need {} bytes, {} available", len, self.remaining()),
            ));
        }
        let input: &'a [u8] = self.input;
        let bytes = &input[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Little-endian fixed-width number.
    pub fn number<N: Number>(&mut self, value: &mut N) -> Result<()> {
        self.number_with(Endian::Little, value)
    }

    /// Fixed-width number with an explicit byte order.
    pub fn number_with<N: Number>(&mut self, endian: Endian, value: &mut N) -> Result<()> {
        match self.mode {
            StreamMode::Encode => value.put(endian, &mut self.output),
            StreamMode::Decode => {
                let bytes = self.take_bytes(N::WIDTH, N::NAME)?;
                *value = N::take(bytes, endian);
            }
        }
        Ok(())
    }

    pub fn byte(&mut self, value: &mut u8) -> Result<()> {
        self.number(value)
    }

    /// Boolean carried as a single `0`/`1` byte.
    pub fn flag(&mut self, value: &mut bool) -> Result<()> {
        let offset = self.position();
        let mut raw = u8::from(*value);
        self.byte(&mut raw)?;
        if self.is_decoding() {
            *value = match raw {
                0 => false,
                1 => true,
                other => {
                    return Err(CaptureError::wire(
                        "flag",
                        offset,
                        format!("expected 0 or 1, found {}", other),
                    ));
                }
            };
        }
        Ok(())
    }

    /// NUL-terminated UTF-8 text.
    pub fn text(&mut self, value: &mut String) -> Result<()> {
        match self.mode {
            StreamMode::Encode => self.put_text(value),
            StreamMode::Decode => {
                let text = self.take_text()?;
                value.clear();
                value.push_str(text);
                Ok(())
            }
        }
    }

    /// Encode-only form of [`text`](Self::text) for borrowed strings.
    ///
    /// Fails in decode mode, where there is nothing to write the value into.
    pub fn text_ref(&mut self, value: &str) -> Result<()> {
        match self.mode {
            StreamMode::Encode => self.put_text(value),
            StreamMode::Decode => {
                Err(CaptureError::wire("text", self.position, "borrowed text cannot be decoded"))
            }
        }
    }

    /// NUL-terminated text shared behind an `Arc`; same layout as
    /// [`text`](Self::text).
    pub fn shared_str(&mut self, value: &mut Arc<str>) -> Result<()> {
        match self.mode {
            StreamMode::Encode => self.put_text(value),
            StreamMode::Decode => {
                *value = Arc::from(self.take_text()?);
                Ok(())
            }
        }
    }

    fn put_text(&mut self, value: &str) -> Result<()> {
        if value.as_bytes().contains(&0) {
            return Err(CaptureError::wire(
                "text",
                self.output.len(),
                "text contains an interior NUL byte",
            ));
        }
        self.output.extend_from_slice(value.as_bytes());
        self.output.push(0);
        Ok(())
    }

    fn take_text(&mut self) -> Result<&'a str> {
        let start = self.position;
        let input: &'a [u8] = self.input;
        let rest = &input[start..];
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| CaptureError::wire("text", start, "missing NUL terminator"))?;
        let text = std::str::from_utf8(&rest[..end])
            .map_err(|e| CaptureError::wire("text", start + e.valid_up_to(), "invalid UTF-8"))?;
        self.position = start + end + 1;
        Ok(text)
    }

    /// 128-bit identifier in the mixed-endian GUID layout.
    pub fn guid(&mut self, value: &mut Uuid) -> Result<()> {
        match self.mode {
            StreamMode::Encode => self.output.extend_from_slice(&value.to_bytes_le()),
            StreamMode::Decode => {
                let bytes = self.take_bytes(16, "guid")?;
                let mut raw = [0u8; 16];
                raw.copy_from_slice(bytes);
                *value = Uuid::from_bytes_le(raw);
            }
        }
        Ok(())
    }

    /// `len` zero bytes. Decoding skips them without inspection.
    pub fn padding(&mut self, len: usize) -> Result<()> {
        match self.mode {
            StreamMode::Encode => self.output.resize(self.output.len() + len, 0),
            StreamMode::Decode => {
                self.take_bytes(len, "padding")?;
            }
        }
        Ok(())
    }

    /// Absolute time as `i64` seconds and `u32` nanoseconds since the Unix epoch.
    pub fn timestamp(&mut self, value: &mut DateTime<Utc>) -> Result<()> {
        let offset = self.position();
        let mut secs = value.timestamp();
        let mut nanos = value.timestamp_subsec_nanos();
        self.number(&mut secs)?;
        self.number(&mut nanos)?;
        if self.is_decoding() {
            *value = DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
                CaptureError::wire(
                    "timestamp",
                    offset,
                    format!("{}s {}ns is out of range", secs, nanos),
                )
            })?;
        }
        Ok(())
    }

    /// Nested message, delegating to its own stream operation.
    pub fn message<M: Streamable + ?Sized>(&mut self, value: &mut M) -> Result<()> {
        value.stream(self)
    }

    /// Optional nested message behind a presence flag.
    pub fn option<M: Streamable + Default>(&mut self, value: &mut Option<M>) -> Result<()> {
        let mut present = value.is_some();
        self.flag(&mut present)?;
        match (self.mode, present) {
            (StreamMode::Encode, true) => {
                if let Some(inner) = value.as_mut() {
                    self.message(inner)?;
                }
            }
            (StreamMode::Decode, true) => {
                let mut inner = M::default();
                self.message(&mut inner)?;
                *value = Some(inner);
            }
            (StreamMode::Decode, false) => *value = None,
            (StreamMode::Encode, false) => {}
        }
        Ok(())
    }

    /// Length-prefixed opaque sub-document: `u32` byte length, then the bytes,
    /// zstd-compressed when `compression` says so.
    pub fn blob(&mut self, value: &mut Vec<u8>, compression: Compression) -> Result<()> {
        match self.mode {
            StreamMode::Encode => {
                let offset = self.output.len();
                match compression {
                    Compression::None => self.put_blob(value, offset),
                    Compression::Zstd => {
                        let packed = zstd::bulk::compress(value, SUBDOCUMENT_COMPRESSION_LEVEL)
                            .map_err(|e| CaptureError::compression("sub-document encode", e))?;
                        self.put_blob(&packed, offset)
                    }
                }
            }
            StreamMode::Decode => {
                let mut len = 0u32;
                self.number(&mut len)?;
                let bytes = self.take_bytes(len as usize, "sub-document")?;
                value.clear();
                match compression {
                    Compression::None => value.extend_from_slice(bytes),
                    Compression::Zstd => {
                        let unpacked = zstd::stream::decode_all(bytes)
                            .map_err(|e| CaptureError::compression("sub-document decode", e))?;
                        *value = unpacked;
                    }
                }
                Ok(())
            }
        }
    }

    fn put_blob(&mut self, bytes: &[u8], offset: usize) -> Result<()> {
        let mut len = u32::try_from(bytes.len()).map_err(|_| {
            CaptureError::wire(
                "sub-document",
                offset,
                format!("{} bytes exceeds the u32 length prefix", bytes.len()),
            )
        })?;
        self.number(&mut len)?;
        self.output.extend_from_slice(bytes);
        Ok(())
    }

    /// Uncompressed length-prefixed UTF-8 text shared behind an `Arc`.
    ///
    /// Same layout as an uncompressed [`blob`](Self::blob); encoding borrows the
    /// text instead of copying it.
    pub fn shared_text(&mut self, value: &mut Arc<str>) -> Result<()> {
        match self.mode {
            StreamMode::Encode => {
                let offset = self.output.len();
                self.put_blob(value.as_bytes(), offset)
            }
            StreamMode::Decode => {
                let mut len = 0u32;
                self.number(&mut len)?;
                let start = self.position;
                let bytes = self.take_bytes(len as usize, "sub-document")?;
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    CaptureError::wire("sub-document", start + e.valid_up_to(), "invalid UTF-8")
                })?;
                *value = Arc::from(text);
                Ok(())
            }
        }
    }

    /// Structured-text sub-document serialized from and parsed into `value`.
    pub fn json<T>(&mut self, value: &mut T, compression: Compression) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.mode {
            StreamMode::Encode => {
                let mut text = serde_json::to_vec(value)
                    .map_err(|e| CaptureError::json("sub-document encode", e))?;
                self.blob(&mut text, compression)
            }
            StreamMode::Decode => {
                let mut text = Vec::new();
                self.blob(&mut text, compression)?;
                *value = serde_json::from_slice(&text)
                    .map_err(|e| CaptureError::json("sub-document decode", e))?;
                Ok(())
            }
        }
    }

    /// Structured-text sub-document shared behind an `Arc`; same layout as
    /// [`json`](Self::json).
    pub fn shared_json<T>(&mut self, value: &mut Arc<T>, compression: Compression) -> Result<()>
    where
        T: Serialize + DeserializeOwned,
    {
        match self.mode {
            StreamMode::Encode => {
                let mut text = serde_json::to_vec(&**value)
                    .map_err(|e| CaptureError::json("sub-document encode", e))?;
                self.blob(&mut text, compression)
            }
            StreamMode::Decode => {
                let mut text = Vec::new();
                self.blob(&mut text, compression)?;
                let parsed: T = serde_json::from_slice(&text)
                    .map_err(|e| CaptureError::json("sub-document decode", e))?;
                *value = Arc::new(parsed);
                Ok(())
            }
        }
    }

    /// Collection count carried as the fixed-width type `C`.
    ///
    /// Encoding writes `len`; decoding ignores `len` and returns the count read.
    pub fn count<C>(&mut self, len: usize) -> Result<usize>
    where
        C: Number + TryFrom<usize>,
        usize: TryFrom<C>,
    {
        let offset = self.position();
        let mut raw = match self.mode {
            StreamMode::Encode => C::try_from(len).map_err(|_| {
                CaptureError::wire(
                    C::NAME,
                    offset,
                    format!("count {} does not fit the count field", len),
                )
            })?,
            StreamMode::Decode => C::default(),
        };
        self.number(&mut raw)?;
        usize::try_from(raw).map_err(|_| {
            CaptureError::wire(C::NAME, offset, "count does not fit in memory".to_string())
        })
    }

    /// Exactly `count` elements whose count was streamed elsewhere in the message.
    ///
    /// Encoding fails if the collection length disagrees with the count.
    pub fn items<T: Streamable + Default>(&mut self, count: usize, items: &mut Vec<T>) -> Result<()> {
        match self.mode {
            StreamMode::Encode => {
                if items.len() != count {
                    return Err(CaptureError::wire(
                        "collection",
                        self.output.len(),
                        format!("count field says {} but collection holds {}", count, items.len()),
                    ));
                }
                for item in items.iter_mut() {
                    self.message(item)?;
                }
            }
            StreamMode::Decode => {
                items.clear();
                // Every element occupies at least one byte, so a corrupt count
                // cannot force a reservation larger than the input.
                items.reserve(count.min(self.remaining()));
                for _ in 0..count {
                    let mut item = T::default();
                    self.message(&mut item)?;
                    items.push(item);
                }
            }
        }
        Ok(())
    }

    /// Count-prefixed collection, count carried as `C`.
    pub fn vec<C, T>(&mut self, items: &mut Vec<T>) -> Result<()>
    where
        C: Number + TryFrom<usize>,
        usize: TryFrom<C>,
        T: Streamable + Default,
    {
        let count = self.count::<C>(items.len())?;
        self.items(count, items)
    }
}

impl Streamable for u64 {
    fn stream(&mut self, stream: &mut FieldStream<'_>) -> Result<()> {
        stream.number(self)
    }
}

impl Streamable for String {
    fn stream(&mut self, stream: &mut FieldStream<'_>) -> Result<()> {
        stream.text(self)
    }
}

impl Streamable for Uuid {
    fn stream(&mut self, stream: &mut FieldStream<'_>) -> Result<()> {
        stream.guid(self)
    }
}
