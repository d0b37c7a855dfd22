//! Whole-payload transport adapters.
//!
//! The capture core hands transports opaque binary payloads, either encoded
//! protocol messages or encoded frames, and expects the same payloads back in
//! order with their boundaries intact. How a transport frames them is its own
//! business; [`DelimitedTransport`] uses the container's varint prefixes over
//! any byte stream, without compression.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};

use tracing::trace;

use crate::codec::{self, Streamable};
use crate::config::DEFAULT_MAX_MESSAGE_LEN;
use crate::container::{read_varint, write_varint};
use crate::types::Frame;
use crate::{CaptureConfig, CaptureError, Result};

/// Destination for whole payloads.
pub trait PayloadSink {
    fn send_payload(&mut self, payload: &[u8]) -> Result<()>;
}

/// Source of whole payloads. `Ok(None)` means the peer finished cleanly.
pub trait PayloadSource {
    fn recv_payload(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Encode `message` and send it as one payload.
pub fn send_message<S, M>(sink: &mut S, message: &mut M) -> Result<()>
where
    S: PayloadSink + ?Sized,
    M: Streamable + ?Sized,
{
    let payload = codec::encode(message)?;
    sink.send_payload(&payload)
}

/// Receive one payload and decode it as `M`. The payload must be consumed
/// exactly.
pub fn recv_message<S, M>(source: &mut S) -> Result<Option<M>>
where
    S: PayloadSource + ?Sized,
    M: Streamable + Default,
{
    match source.recv_payload()? {
        Some(payload) => codec::decode(&payload).map(Some),
        None => Ok(None),
    }
}

pub fn send_frame<S: PayloadSink + ?Sized>(sink: &mut S, frame: &Frame) -> Result<()> {
    send_message(sink, &mut frame.clone()).map_err(|e| e.in_frame(frame.index))
}

pub fn recv_frame<S: PayloadSource + ?Sized>(source: &mut S) -> Result<Option<Frame>> {
    recv_message(source)
}

/// In-process FIFO of payloads.
#[derive(Debug, Default, Clone)]
pub struct MemoryTransport {
    queue: VecDeque<Vec<u8>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl PayloadSink for MemoryTransport {
    fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        self.queue.push_back(payload.to_vec());
        Ok(())
    }
}

impl PayloadSource for MemoryTransport {
    fn recv_payload(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.queue.pop_front())
    }
}

/// Varint-delimited payloads over a byte stream.
#[derive(Debug)]
pub struct DelimitedTransport<T> {
    inner: T,
    max_message_len: usize,
}

impl<T> DelimitedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner, max_message_len: DEFAULT_MAX_MESSAGE_LEN }
    }

    pub fn with_config(inner: T, config: &CaptureConfig) -> Self {
        Self { inner, max_message_len: config.max_message_len }
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Write> PayloadSink for DelimitedTransport<T> {
    fn send_payload(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > self.max_message_len {
            return Err(CaptureError::wire(
                "outgoing payload",
                0,
                format!("{} bytes exceeds limit of {}", payload.len(), self.max_message_len),
            ));
        }
        write_varint(&mut self.inner, payload.len() as u64)
            .and_then(|()| self.inner.write_all(payload))
            .and_then(|()| self.inner.flush())
            .map_err(|e| CaptureError::io("payload send", e))?;
        trace!("Sent {} byte payload", payload.len());
        Ok(())
    }
}

impl<T: Read> PayloadSource for DelimitedTransport<T> {
    fn recv_payload(&mut self) -> Result<Option<Vec<u8>>> {
        let Some(len) = read_varint(&mut self.inner)? else {
            return Ok(None);
        };
        let len = usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.max_message_len)
            .ok_or_else(|| {
                CaptureError::wire(
                    "payload length",
                    0,
                    format!("length {} exceeds limit of {}", len, self.max_message_len),
                )
            })?;

        let mut payload = vec![0u8; len];
        self.inner.read_exact(&mut payload).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                CaptureError::wire("payload body", 0, format!("stream ended inside {len} byte payload"))
            }
            _ => CaptureError::io("payload receive", e),
        })?;
        trace!("Received {} byte payload", len);
        Ok(Some(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{LobbyMatchmakerStatus, LobbyPlayerSessionsRequest};
    use crate::test_utils::{SessionBuilder, frame_at};
    use crate::types::{PlatformCode, Xpid};
    use std::io::Cursor;

    #[test]
    fn memory_transport_preserves_order_and_boundaries() {
        let mut transport = MemoryTransport::new();
        send_message(&mut transport, &mut LobbyMatchmakerStatus { status_code: 7 }).unwrap();
        send_frame(&mut transport, &frame_at(4, SessionBuilder::new().player(0, "a", 1))).unwrap();
        assert_eq!(transport.len(), 2);

        let status: LobbyMatchmakerStatus = recv_message(&mut transport).unwrap().unwrap();
        assert_eq!(status.status_code, 7);
        let frame = recv_frame(&mut transport).unwrap().unwrap();
        assert_eq!(frame.index, 4);
        assert!(recv_frame(&mut transport).unwrap().is_none());
    }

    #[test]
    fn delimited_transport_handles_empty_and_large_payloads() {
        let mut transport = DelimitedTransport::new(Vec::new());
        for len in [0usize, 127, 128, 16384] {
            transport.send_payload(&vec![0xab; len]).unwrap();
        }

        let mut reader = DelimitedTransport::new(Cursor::new(transport.into_inner()));
        for len in [0usize, 127, 128, 16384] {
            assert_eq!(reader.recv_payload().unwrap().unwrap().len(), len);
        }
        assert!(reader.recv_payload().unwrap().is_none());
    }

    #[test]
    fn delimited_transport_carries_messages() {
        let mut request = LobbyPlayerSessionsRequest {
            xpid: "STM-1".parse().unwrap(),
            players: vec![
                Xpid::new(PlatformCode::OCULUS_ORG, 3963667097037078),
                Xpid::new(PlatformCode::UNKNOWN, u64::MAX),
            ],
            ..LobbyPlayerSessionsRequest::default()
        };
        let mut transport = DelimitedTransport::new(Vec::new());
        send_message(&mut transport, &mut request).unwrap();

        let mut reader = DelimitedTransport::new(Cursor::new(transport.into_inner()));
        let decoded: LobbyPlayerSessionsRequest = recv_message(&mut reader).unwrap().unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn truncated_and_oversize_payloads_are_errors() {
        let mut reader = DelimitedTransport::new(Cursor::new(vec![0x05, 1, 2]));
        assert!(matches!(reader.recv_payload(), Err(CaptureError::Wire { .. })));

        let config = CaptureConfig { max_message_len: 4, ..CaptureConfig::default() };
        let mut reader = DelimitedTransport::with_config(Cursor::new(vec![0x05, 1, 2, 3, 4, 5]), &config);
        assert!(reader.recv_payload().is_err());

        let mut writer = DelimitedTransport::with_config(Vec::new(), &config);
        assert!(writer.send_payload(&[0; 5]).is_err());
    }
}
