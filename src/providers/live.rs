//! Live provider fed by a game API poller

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::Result;
use crate::processor::FrameProcessor;
use crate::provider::Provider;
use crate::types::{CaptureHeader, Frame};

/// Payloads captured by one poll of the game's local API.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub timestamp: DateTime<Utc>,
    pub session: Vec<u8>,
    pub bones: Option<Vec<u8>>,
}

impl RawPayload {
    pub fn new(timestamp: DateTime<Utc>, session: impl Into<Vec<u8>>) -> Self {
        Self { timestamp, session: session.into(), bones: None }
    }

    pub fn with_bones(mut self, bones: impl Into<Vec<u8>>) -> Self {
        self.bones = Some(bones.into());
        self
    }
}

/// Turns polled payloads into frames as they arrive.
///
/// By default payloads that fail to decode are logged and skipped; they do
/// not consume a frame index and do not end the stream. With
/// [`skip_invalid(false)`](Self::skip_invalid) the error is returned instead
/// and the next call moves on to the following payload. The stream ends when
/// every sender is dropped.
pub struct LiveProvider {
    receiver: mpsc::Receiver<RawPayload>,
    processor: FrameProcessor,
    header: CaptureHeader,
    skip_invalid: bool,
    skipped: u64,
}

impl LiveProvider {
    /// Create a provider and the sender its poller feeds.
    pub fn channel(header: CaptureHeader, capacity: usize) -> (mpsc::Sender<RawPayload>, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        info!(capture_id = %header.capture_id, capacity, "Live provider ready");
        let provider =
            Self { receiver, processor: FrameProcessor::new(), header, skip_invalid: true, skipped: 0 };
        (sender, provider)
    }

    /// Whether undecodable payloads are dropped (the default) or returned as errors.
    pub fn skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    /// Payloads dropped because they failed to decode.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

#[async_trait::async_trait]
impl Provider for LiveProvider {
    async fn next_frame(&mut self) -> Result<Option<Arc<Frame>>> {
        loop {
            let Some(payload) = self.receiver.recv().await else {
                debug!(
                    "Live payload channel closed after {} frames ({} skipped)",
                    self.processor.next_index(),
                    self.skipped
                );
                return Ok(None);
            };

            match self.processor.process(&payload.session, payload.bones.as_deref(), payload.timestamp) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) if !self.skip_invalid => return Err(e),
                Err(e) => {
                    self.skipped += 1;
                    warn!("Skipping live payload: {}", e);
                }
            }
        }
    }

    fn header(&self) -> &CaptureHeader {
        &self.header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{SessionBuilder, bones_json, timestamp_at};
    use crate::types::Event;

    #[tokio::test]
    async fn processes_payloads_in_order_and_skips_bad_ones() {
        let (sender, mut provider) = LiveProvider::channel(CaptureHeader::new("live"), 8);
        sender.send(RawPayload::new(timestamp_at(0), SessionBuilder::new().json())).await.unwrap();
        sender.send(RawPayload::new(timestamp_at(1), "{truncated")).await.unwrap();
        sender
            .send(
                RawPayload::new(timestamp_at(2), SessionBuilder::new().player(0, "a", 1).json())
                    .with_bones(bones_json(1, 2)),
            )
            .await
            .unwrap();
        drop(sender);

        let first = provider.next_frame().await.unwrap().unwrap();
        assert_eq!(first.index, 0);

        let second = provider.next_frame().await.unwrap().unwrap();
        assert_eq!(second.index, 1);
        assert_eq!(second.timestamp, timestamp_at(2));
        assert!(second.bones.is_some());
        assert!(matches!(second.events[..], [Event::PlayerJoined { slot: 0, .. }]));

        assert!(provider.next_frame().await.unwrap().is_none());
        assert_eq!(provider.skipped(), 1);
        assert_eq!(provider.header().capture_id, "live");
    }

    #[tokio::test]
    async fn returns_decode_errors_when_not_skipping() {
        let (sender, provider) = LiveProvider::channel(CaptureHeader::new("live"), 8);
        let mut provider = provider.skip_invalid(false);
        sender.send(RawPayload::new(timestamp_at(0), "{truncated")).await.unwrap();
        sender.send(RawPayload::new(timestamp_at(1), SessionBuilder::new().json())).await.unwrap();
        drop(sender);

        assert!(provider.next_frame().await.is_err());

        let frame = provider.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.index, 0);
        assert_eq!(frame.timestamp, timestamp_at(1));

        assert!(provider.next_frame().await.unwrap().is_none());
        assert_eq!(provider.skipped(), 0);
    }
}
