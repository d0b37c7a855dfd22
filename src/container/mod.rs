//! Delimited, zstd-compressed capture containers.
//!
//! A container is one zstd stream holding a [`CaptureHeader`] followed by any
//! number of [`Frame`]s. Each record is encoded with the field stream engine
//! and preceded by its length as a base-128 varint.
//!
//! ```text
//! zstd( [varint len][header] ([varint len][frame])* )
//! ```
//!
//! ## Usage Example
//!
//! ```rust
//! use arenacap::container::{ContainerReader, ContainerWriter};
//! use arenacap::{CaptureConfig, CaptureHeader};
//!
//! # fn main() -> arenacap::Result<()> {
//! let config = CaptureConfig::default();
//! let writer = ContainerWriter::new(Vec::new(), &CaptureHeader::new("demo"), &config)?;
//! let bytes = writer.finish()?;
//!
//! let mut reader = ContainerReader::new(bytes.as_slice(), &config)?;
//! assert_eq!(reader.header().capture_id, "demo");
//! assert!(reader.read_frame()?.is_none());
//! # Ok(())
//! # }
//! ```
//!
//! ## Termination
//!
//! Running out of input where the next length prefix would start is the normal
//! end of a container and yields `Ok(None)`. Running out anywhere else is
//! corruption.

mod varint;

pub use varint::{
    MAX_VARINT_LEN, decode_varint, encode_varint, read_varint, varint_len, write_varint,
};

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::codec::{self, Streamable};
use crate::types::{CaptureHeader, Frame};
use crate::{CaptureConfig, CaptureError, Result};

/// Writes a capture container.
///
/// The compressor is finalized by [`finish`](Self::finish). If the writer is
/// dropped without finishing, `Drop` finalizes it and logs any failure, so
/// frames are not silently lost on early returns.
pub struct ContainerWriter<W: Write> {
    encoder: Option<zstd::Encoder<'static, W>>,
    scratch: Vec<u8>,
    frames_written: u64,
}

impl ContainerWriter<BufWriter<File>> {
    /// Create a container file, truncating any existing file.
    pub fn create<P: AsRef<Path>>(
        path: P,
        header: &CaptureHeader,
        config: &CaptureConfig,
    ) -> Result<Self> {
        let file = File::create(&path)
            .map_err(|e| CaptureError::file_error(path.as_ref().to_path_buf(), e))?;
        debug!("Creating container {}", path.as_ref().display());
        Self::new(BufWriter::new(file), header, config)
    }
}

impl<W: Write> ContainerWriter<W> {
    /// Start a container on `sink` and write its header.
    pub fn new(sink: W, header: &CaptureHeader, config: &CaptureConfig) -> Result<Self> {
        let encoder = zstd::Encoder::new(sink, config.compression_level)
            .map_err(|e| CaptureError::compression("encoder init", e))?;
        let mut writer = Self { encoder: Some(encoder), scratch: Vec::new(), frames_written: 0 };
        writer.write_record(&mut header.clone())?;
        debug!("Container header written: capture_id={}", header.capture_id);
        Ok(writer)
    }

    /// Append one frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let index = frame.index;
        self.write_record(&mut frame.clone()).map_err(|e| e.in_frame(index))?;
        self.frames_written += 1;
        trace!("Container frame {} written", index);
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn write_record<M: Streamable>(&mut self, record: &mut M) -> Result<()> {
        codec::encode_into(record, &mut self.scratch)?;
        let encoder = self.encoder.as_mut().ok_or_else(|| {
            CaptureError::io("container write", std::io::Error::other("writer already finished"))
        })?;
        write_varint(encoder, self.scratch.len() as u64)
            .and_then(|()| encoder.write_all(&self.scratch))
            .map_err(|e| CaptureError::compression("container write", e))
    }

    /// Finalize the compressed stream, flush the sink and return it.
    pub fn finish(mut self) -> Result<W> {
        let encoder = self.encoder.take().ok_or_else(|| {
            CaptureError::io("container finish", std::io::Error::other("writer already finished"))
        })?;
        let mut sink =
            encoder.finish().map_err(|e| CaptureError::compression("container finish", e))?;
        sink.flush().map_err(|e| CaptureError::io("container flush", e))?;
        debug!("Container finished after {} frames", self.frames_written);
        Ok(sink)
    }
}

impl<W: Write> Drop for ContainerWriter<W> {
    fn drop(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            match encoder.finish() {
                Ok(mut sink) => {
                    if let Err(e) = sink.flush() {
                        warn!("Failed to flush container on drop: {}", e);
                    }
                }
                Err(e) => warn!("Failed to finalize container on drop: {}", e),
            }
        }
    }
}

/// Reads a capture container sequentially.
pub struct ContainerReader<R: Read> {
    decoder: BufReader<zstd::Decoder<'static, BufReader<R>>>,
    header: CaptureHeader,
    buffer: Vec<u8>,
    max_message_len: usize,
    frames_read: u64,
    finished: bool,
}

impl ContainerReader<File> {
    /// Open a container file and read its header.
    pub fn open<P: AsRef<Path>>(path: P, config: &CaptureConfig) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| CaptureError::file_error(path.as_ref().to_path_buf(), e))?;
        debug!("Opening container {}", path.as_ref().display());
        Self::new(file, config)
    }
}

impl<R: Read> ContainerReader<R> {
    /// Start reading from `source`. The header is read eagerly.
    pub fn new(source: R, config: &CaptureConfig) -> Result<Self> {
        let decoder = zstd::Decoder::new(source)
            .map_err(|e| CaptureError::compression("decoder init", e))?;
        let mut reader = Self {
            decoder: BufReader::new(decoder),
            header: CaptureHeader::default(),
            buffer: Vec::new(),
            max_message_len: config.max_message_len,
            frames_read: 0,
            finished: false,
        };

        if !reader.read_message()? {
            return Err(CaptureError::wire("container header", 0, "container is empty"));
        }
        reader.header = codec::decode(&reader.buffer)?;
        debug!(
            "Container header read: capture_id={}, {} metadata entries",
            reader.header.capture_id,
            reader.header.metadata.len()
        );
        Ok(reader)
    }

    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Read the next frame. `Ok(None)` marks the end of the container.
    pub fn read_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }
        let position = self.frames_read;
        if !self.read_message().map_err(|e| e.in_frame(position))? {
            self.finished = true;
            debug!("Container ended after {} frames", self.frames_read);
            return Ok(None);
        }
        let frame: Frame = codec::decode(&self.buffer).map_err(|e| e.in_frame(position))?;
        self.frames_read += 1;
        trace!("Container frame {} read", frame.index);
        Ok(Some(frame))
    }

    /// Read the next length-prefixed record into the buffer. Returns `false`
    /// at the clean end of the stream.
    fn read_message(&mut self) -> Result<bool> {
        let len = match read_varint(&mut self.decoder) {
            Ok(Some(len)) => len,
            Ok(None) => return Ok(false),
            Err(CaptureError::Io { source, .. }) => {
                return Err(CaptureError::compression("container read", source));
            }
            Err(e) => return Err(e),
        };

        let len = usize::try_from(len).ok().filter(|len| *len <= self.max_message_len).ok_or_else(
            || {
                CaptureError::wire(
                    "container record",
                    0,
                    format!("length {} exceeds limit of {} bytes", len, self.max_message_len),
                )
            },
        )?;

        self.buffer.resize(len, 0);
        self.decoder.read_exact(&mut self.buffer).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                CaptureError::wire("container record", 0, format!("record of {} bytes is truncated", len))
            } else {
                CaptureError::compression("container read", e)
            }
        })?;
        Ok(true)
    }
}

impl<R: Read> Iterator for ContainerReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => None,
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
