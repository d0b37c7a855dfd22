//! Live connection fed by a game API poller

use std::sync::Arc;

use futures::Stream;
use tokio::sync::mpsc;
use tracing::info;

use super::FrameFeed;
use crate::driver::Driver;
use crate::providers::{LiveProvider, RawPayload};
use crate::types::{CaptureHeader, Event, Frame};

/// Payloads queued before the poller has to wait.
pub const DEFAULT_PAYLOAD_CAPACITY: usize = 256;

/// A live capture: payloads go in through the sender, frames come out of
/// subscriptions.
///
/// Dropping every sender ends the capture once queued payloads are
/// processed. Dropping the connection stops it immediately.
pub struct LiveConnection {
    header: CaptureHeader,
    feed: FrameFeed,
}

impl LiveConnection {
    /// Start a live capture. Must be called from within a tokio runtime.
    pub fn start(header: CaptureHeader) -> (mpsc::Sender<RawPayload>, Self) {
        Self::with_capacity(header, DEFAULT_PAYLOAD_CAPACITY)
    }

    pub fn with_capacity(header: CaptureHeader, capacity: usize) -> (mpsc::Sender<RawPayload>, Self) {
        let (sender, provider) = LiveProvider::channel(header.clone(), capacity);
        info!("Live connection started for {}", header.capture_id);
        let connection = Self { header, feed: FrameFeed::new(Driver::spawn(provider)) };
        (sender, connection)
    }

    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    /// Stream of processed frames.
    ///
    /// The first subscription starts at the first frame; later ones start at
    /// the next frame processed.
    pub fn subscribe(&mut self) -> impl Stream<Item = Arc<Frame>> + Send + use<> {
        self.feed.subscribe()
    }

    /// Detected events, tagged with their frame index.
    pub fn events(&mut self) -> impl Stream<Item = (u64, Event)> + Send + use<> {
        self.feed.events()
    }

    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.feed.current_frame()
    }
}
