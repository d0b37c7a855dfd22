//! Replay connection for capture containers

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use futures::Stream;
use tracing::info;

use super::FrameFeed;
use crate::driver::Driver;
use crate::provider::Provider;
use crate::providers::ReplayProvider;
use crate::types::{CaptureHeader, Event, Frame};
use crate::{CaptureConfig, Result};

/// A container being replayed on a background task.
///
/// Dropping the connection stops the replay and ends every subscription.
pub struct ReplayConnection {
    header: CaptureHeader,
    feed: FrameFeed,
}

impl ReplayConnection {
    /// Open a container file and start replaying it.
    ///
    /// Must be called from within a tokio runtime. Fails if the file cannot
    /// be opened or its header is unreadable.
    pub async fn open<P: AsRef<Path>>(path: P, config: &CaptureConfig) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening capture container: {}", path.display());
        let provider = ReplayProvider::open(path, config)?;
        Ok(Self::start(provider))
    }

    /// Start replaying from an already-opened provider.
    pub fn start<R: Read + Send + 'static>(provider: ReplayProvider<R>) -> Self {
        let header = provider.header().clone();
        info!("Replay connection started for {}", header.capture_id);
        Self { header, feed: FrameFeed::new(Driver::spawn(provider)) }
    }

    pub fn header(&self) -> &CaptureHeader {
        &self.header
    }

    /// Stream of replayed frames.
    ///
    /// The first subscription starts at the first frame; later ones start at
    /// the next frame replayed.
    pub fn subscribe(&mut self) -> impl Stream<Item = Arc<Frame>> + Send + use<> {
        self.feed.subscribe()
    }

    /// Events of replayed frames, tagged with their frame index.
    pub fn events(&mut self) -> impl Stream<Item = (u64, Event)> + Send + use<> {
        self.feed.events()
    }

    /// Most recently replayed frame.
    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.feed.current_frame()
    }
}
