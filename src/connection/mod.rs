//! Connections: a running [`Driver`](crate::driver::Driver) plus the handles
//! needed to subscribe to its frames.

pub mod live;
pub mod replay;

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::driver::DriverChannels;
use crate::types::{Event, Frame};

pub use live::LiveConnection;
pub use replay::ReplayConnection;

/// Subscription side of a driver. Cancels the driver when dropped.
struct FrameFeed {
    /// Handed to the first subscriber so it starts at frame zero.
    first: Option<broadcast::Receiver<Arc<Frame>>>,
    /// Weak, so the driver still closes the channel when it ends.
    subscribers: broadcast::WeakSender<Arc<Frame>>,
    latest: watch::Receiver<Option<Arc<Frame>>>,
    cancel: CancellationToken,
}

impl FrameFeed {
    fn new(channels: DriverChannels) -> Self {
        Self {
            first: Some(channels.frames),
            subscribers: channels.subscribers,
            latest: channels.latest,
            cancel: channels.cancel,
        }
    }

    fn subscribe(&mut self) -> impl Stream<Item = Arc<Frame>> + Send + use<> {
        let receiver = self.first.take().unwrap_or_else(|| match self.subscribers.upgrade() {
            Some(sender) => sender.subscribe(),
            // The driver has ended; hand out a receiver that is already closed.
            None => broadcast::channel(1).1,
        });
        BroadcastStream::new(receiver).filter_map(|item| async move {
            match item {
                Ok(frame) => Some(frame),
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!("Subscriber lagged, {} frames skipped", skipped);
                    None
                }
            }
        })
    }

    fn events(&mut self) -> impl Stream<Item = (u64, Event)> + Send + use<> {
        self.subscribe().flat_map(|frame| {
            let count = frame.events.len();
            futures::stream::iter((0..count).map(move |i| (frame.index, frame.events[i].clone())))
        })
    }

    fn current_frame(&self) -> Option<Arc<Frame>> {
        self.latest.borrow().clone()
    }
}

impl Drop for FrameFeed {
    fn drop(&mut self) {
        debug!("Dropping connection, cancelling driver");
        self.cancel.cancel();
    }
}
