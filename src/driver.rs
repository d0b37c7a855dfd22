//! Driver spawns and manages the frame pump task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::provider::Provider;
use crate::types::Frame;

/// Frames buffered per subscriber before a slow subscriber starts lagging.
pub const FRAME_BUFFER: usize = 1024;

/// Consecutive retryable provider errors tolerated before giving up.
const MAX_ERRORS: u32 = 10;

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Subscribed before the task started, so it sees every frame
    pub frames: broadcast::Receiver<Arc<Frame>>,
    /// Mints receivers for later subscribers while the task is running
    pub subscribers: broadcast::WeakSender<Arc<Frame>>,
    /// Most recent frame, `None` before the first one
    pub latest: watch::Receiver<Option<Arc<Frame>>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Moves frames from a [`Provider`] to subscribers on a background task.
///
/// The task owns the provider. It ends when the provider reports the end of
/// its stream, on a non-retryable error, on cancellation, or when nobody is
/// listening any more. Ending drops the senders, which ends every
/// subscriber's stream once it has drained.
pub struct Driver;

impl Driver {
    pub fn spawn<P>(provider: P) -> DriverChannels
    where
        P: Provider,
    {
        let (frame_tx, frame_rx) = broadcast::channel(FRAME_BUFFER);
        let (latest_tx, latest_rx) = watch::channel(None);
        let cancel = CancellationToken::new();

        let subscribers = frame_tx.downgrade();
        let cancel_task = cancel.clone();
        tokio::spawn(async move {
            Self::frame_pump_task(provider, frame_tx, latest_tx, cancel_task).await;
        });

        DriverChannels { frames: frame_rx, subscribers, latest: latest_rx, cancel }
    }

    async fn frame_pump_task<P>(
        mut provider: P,
        frame_tx: broadcast::Sender<Arc<Frame>>,
        latest_tx: watch::Sender<Option<Arc<Frame>>>,
        cancel: CancellationToken,
    ) where
        P: Provider,
    {
        info!(capture_id = %provider.header().capture_id, "Frame pump started");
        let mut frame_count = 0u64;
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Frame pump cancelled");
                    break;
                }
                result = provider.next_frame() => result,
            };

            match result {
                Ok(Some(frame)) => {
                    frame_count += 1;
                    error_count = 0;
                    trace!("Frame {} with {} events", frame.index, frame.events.len());

                    latest_tx.send_replace(Some(Arc::clone(&frame)));
                    if frame_tx.send(frame).is_err() && latest_tx.is_closed() {
                        debug!("All frame receivers dropped, shutting down");
                        break;
                    }
                }
                Ok(None) => {
                    info!("Provider stream ended after {} frames", frame_count);
                    break;
                }
                Err(e) if e.is_retryable() && error_count + 1 < MAX_ERRORS => {
                    error_count += 1;
                    warn!("Provider error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    // Exponential backoff: 100ms, 200ms, 400ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
                Err(e) => {
                    error!("Provider failed after {} frames: {}", frame_count, e);
                    for suggestion in e.recovery_suggestions() {
                        debug!("Suggestion: {}", suggestion);
                    }
                    break;
                }
            }
        }

        info!("Frame pump ended (forwarded {} frames)", frame_count);
    }
}
