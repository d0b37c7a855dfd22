//! Replay provider for capture containers

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::Stream;
use tokio::time::{Duration, Instant, sleep_until};
use tracing::{debug, info, trace};

use crate::config::{MAX_PLAYBACK_SPEED, MIN_PLAYBACK_SPEED};
use crate::container::ContainerReader;
use crate::provider::Provider;
use crate::types::{CaptureHeader, Frame};
use crate::{CaptureConfig, Result};

/// Replays a container, spacing frames by their recorded timestamps.
///
/// The first frame is released immediately. Each later frame is released
/// when wall time since the first frame, multiplied by the playback speed,
/// reaches its recorded offset. Timestamps that go backwards are released
/// without waiting.
pub struct ReplayProvider<R: Read = File> {
    reader: ContainerReader<R>,

    /// Playback speed multiplier (1.0 = recorded pace)
    speed: f64,

    /// Wall clock and capture clock at the first released frame
    anchor: Option<(Instant, DateTime<Utc>)>,
}

impl ReplayProvider<File> {
    /// Open a container file for replay.
    pub fn open<P: AsRef<Path>>(path: P, config: &CaptureConfig) -> Result<Self> {
        let reader = ContainerReader::open(path, config)?;
        Ok(Self::new(reader, config))
    }
}

impl<R: Read> ReplayProvider<R> {
    pub fn new(reader: ContainerReader<R>, config: &CaptureConfig) -> Self {
        info!(
            capture_id = %reader.header().capture_id,
            speed = config.effective_speed(),
            "Replay provider ready"
        );
        Self { reader, speed: config.effective_speed(), anchor: None }
    }

    /// Set playback speed, clamped to 0.1..=10.
    ///
    /// Pacing restarts from the next frame so earlier frames are not
    /// re-timed.
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED);
        self.anchor = None;
        debug!("Playback speed set to {}x", self.speed);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn frames_read(&self) -> u64 {
        self.reader.frames_read()
    }

    fn release_time(&mut self, timestamp: DateTime<Utc>) -> Option<Instant> {
        let Some((wall, capture)) = self.anchor else {
            self.anchor = Some((Instant::now(), timestamp));
            return None;
        };
        let offset = (timestamp - capture).to_std().ok()?;
        Some(wall + Duration::from_secs_f64(offset.as_secs_f64() / self.speed))
    }
}

impl<R: Read + Send + 'static> ReplayProvider<R> {
    /// Convert into a stream that ends after the last frame or the first
    /// error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Arc<Frame>>> + Send + 'static {
        futures::stream::unfold(Some(self), |state| async move {
            let mut provider = state?;
            match provider.next_frame().await {
                Ok(Some(frame)) => Some((Ok(frame), Some(provider))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}

#[async_trait::async_trait]
impl<R: Read + Send + 'static> Provider for ReplayProvider<R> {
    async fn next_frame(&mut self) -> Result<Option<Arc<Frame>>> {
        let Some(frame) = self.reader.read_frame()? else {
            debug!("Reached end of replay after {} frames", self.reader.frames_read());
            return Ok(None);
        };

        if let Some(deadline) = self.release_time(frame.timestamp) {
            sleep_until(deadline).await;
        }
        trace!("Replaying frame {}", frame.index);
        Ok(Some(Arc::new(frame)))
    }

    fn header(&self) -> &CaptureHeader {
        self.reader.header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerWriter;
    use crate::test_utils::{FRAME_INTERVAL_MS, SessionBuilder, frame_at};
    use futures::StreamExt;

    fn container(frames: u64) -> Vec<u8> {
        let config = CaptureConfig::default();
        let mut writer =
            ContainerWriter::new(Vec::new(), &CaptureHeader::new("replay"), &config).unwrap();
        for index in 0..frames {
            writer.write_frame(&frame_at(index, SessionBuilder::new().blue_points(index as i32))).unwrap();
        }
        writer.finish().unwrap()
    }

    fn provider(frames: u64, speed: f64) -> ReplayProvider<std::io::Cursor<Vec<u8>>> {
        let config = CaptureConfig { playback_speed: speed, ..CaptureConfig::default() };
        let reader = ContainerReader::new(std::io::Cursor::new(container(frames)), &config).unwrap();
        ReplayProvider::new(reader, &config)
    }

    #[tokio::test(start_paused = true)]
    async fn frames_are_paced_by_recorded_timestamps() {
        let mut provider = provider(3, 1.0);
        assert_eq!(provider.header().capture_id, "replay");

        let start = Instant::now();
        for index in 0..3u64 {
            let frame = provider.next_frame().await.unwrap().unwrap();
            assert_eq!(frame.index, index);
            let elapsed = start.elapsed().as_millis() as i64;
            assert!(elapsed >= index as i64 * FRAME_INTERVAL_MS, "frame {index} too early");
        }
        assert!(provider.next_frame().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn speed_scales_and_clamps() {
        let mut provider = provider(2, 2.0);
        let start = Instant::now();
        provider.next_frame().await.unwrap();
        provider.next_frame().await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_micros(8_500));
        assert!(elapsed < Duration::from_millis(FRAME_INTERVAL_MS as u64));

        provider.set_speed(100.0);
        assert_eq!(provider.speed(), MAX_PLAYBACK_SPEED);
        provider.set_speed(0.0);
        assert_eq!(provider.speed(), MIN_PLAYBACK_SPEED);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_yields_every_frame() {
        let frames: Vec<_> = provider(5, 10.0).into_stream().collect().await;
        assert_eq!(frames.len(), 5);
        let indices: Vec<u64> = frames.into_iter().map(|f| f.unwrap().index).collect();
        assert_eq!(indices, [0, 1, 2, 3, 4]);
    }
}
