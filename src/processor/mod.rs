//! Frame assembly: raw payloads in, indexed frames with events out.
//!
//! ```rust
//! use arenacap::FrameProcessor;
//!
//! let mut processor = FrameProcessor::new();
//! let roster = br#"{"teams":[{"players":[{"name":"ace","playerid":0}]}]}"#;
//! let first = processor.process(roster, None, chrono::Utc::now())?;
//! let second = processor.process(roster, None, chrono::Utc::now())?;
//! assert!(first.events.is_empty());
//! assert_eq!((first.index, second.index), (0, 1));
//! // The second frame is the first comparison, so the roster is announced.
//! assert_eq!(second.events.len(), 1);
//! # Ok::<(), arenacap::CaptureError>(())
//! ```

pub mod events;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

pub use events::{EventDetector, RoleClassifier, SlotParityHeuristic};

use crate::Result;
use crate::types::{Bones, Frame, Session, Snapshot};

/// Turns successive payloads into numbered frames.
///
/// Indices start at zero and advance only when a frame is produced; a payload
/// that fails to decode leaves the processor exactly as it was. The first
/// frame has no predecessor and never carries events.
pub struct FrameProcessor {
    detector: EventDetector,
    next_index: u64,
    previous: Option<Arc<Frame>>,
}

impl Default for FrameProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameProcessor {
    pub fn new() -> Self {
        Self::with_detector(EventDetector::new())
    }

    pub fn with_detector(detector: EventDetector) -> Self {
        Self { detector, next_index: 0, previous: None }
    }

    /// Decode `session` (and `bones`, when present) and build the next frame.
    pub fn process(
        &mut self,
        session: &[u8],
        bones: Option<&[u8]>,
        timestamp: DateTime<Utc>,
    ) -> Result<Arc<Frame>> {
        let index = self.next_index;
        let session = Snapshot::<Session>::parse(session, "session").map_err(|e| e.in_frame(index))?;
        let bones = bones
            .map(|raw| Snapshot::<Bones>::parse(raw, "bones"))
            .transpose()
            .map_err(|e| e.in_frame(index))?;
        Ok(self.process_snapshots(session, bones, timestamp))
    }

    /// Build the next frame from payloads that are already decoded.
    pub fn process_snapshots(
        &mut self,
        session: Snapshot<Session>,
        bones: Option<Snapshot<Bones>>,
        timestamp: DateTime<Utc>,
    ) -> Arc<Frame> {
        let index = self.next_index;
        let events = if self.previous.is_some() {
            self.detector.detect(&session.shared_value())
        } else {
            Vec::new()
        };
        if !events.is_empty() {
            debug!("Frame {}: {} events", index, events.len());
        }
        trace!("Frame {} assembled", index);

        let frame = Arc::new(Frame { index, timestamp, session, bones, events: events.into() });
        self.previous = Some(Arc::clone(&frame));
        self.next_index += 1;
        frame
    }

    /// Most recently produced frame.
    pub fn previous_frame(&self) -> Option<&Arc<Frame>> {
        self.previous.as_ref()
    }

    /// Index the next frame will receive.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Start a new capture: indices restart at zero and the detector forgets
    /// its baseline.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.next_index = 0;
        self.previous = None;
    }
}
