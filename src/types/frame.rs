//! Frame records and capture headers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::event::Event;
use super::session::{Bones, Session};
use super::snapshot::Snapshot;
use crate::codec::{FieldStream, Streamable};
use crate::{CaptureError, Result};

/// One timestamped snapshot of arena state plus the events derived from it.
///
/// Frames are immutable once emitted. Payloads and events are shared, so
/// cloning a frame never allocates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Position in the capture, assigned by the frame processor.
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    pub session: Snapshot<Session>,
    pub bones: Option<Snapshot<Bones>>,
    pub events: Arc<[Event]>,
}

impl Streamable for Frame {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.number(&mut self.index)?;
        s.timestamp(&mut self.timestamp)?;
        s.message(&mut self.session)?;
        s.option(&mut self.bones)?;

        let count = s.count::<u32>(self.events.len())?;
        if s.is_decoding() {
            let mut events: Vec<Event> = Vec::new();
            s.items(count, &mut events)?;
            self.events = events.into();
        } else {
            for event in self.events.iter() {
                s.message(&mut event.clone())?;
            }
        }
        Ok(())
    }
}

/// Leading record of a capture container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureHeader {
    pub capture_id: String,
    pub created_at: DateTime<Utc>,
    /// Free-form provenance. Keys are unique; order carries no meaning.
    pub metadata: BTreeMap<String, String>,
}

impl CaptureHeader {
    /// Header stamped with the current time.
    pub fn new(capture_id: impl Into<String>) -> Self {
        Self { capture_id: capture_id.into(), created_at: Utc::now(), metadata: BTreeMap::new() }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

impl Streamable for CaptureHeader {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.text(&mut self.capture_id)?;
        s.timestamp(&mut self.created_at)?;

        let count = s.count::<u32>(self.metadata.len())?;
        if s.is_decoding() {
            self.metadata.clear();
            for _ in 0..count {
                let offset = s.position();
                let mut key = String::new();
                let mut value = String::new();
                s.text(&mut key)?;
                s.text(&mut value)?;
                if self.metadata.contains_key(&key) {
                    return Err(CaptureError::wire(
                        "header metadata",
                        offset,
                        format!("duplicate key '{}'", key),
                    ));
                }
                self.metadata.insert(key, value);
            }
        } else {
            for (key, value) in &self.metadata {
                s.text_ref(key)?;
                s.text_ref(value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::test_utils::SessionBuilder;
    use crate::types::Event;

    #[test]
    fn frame_round_trips_with_and_without_bones() {
        let session = SessionBuilder::new().player(0, "ace", 3).build_snapshot();
        let bones = Snapshot::<Bones>::parse(br#"{"user_bones":[{"bone_t":[1.0],"bone_o":[0.5]}]}"#, "bones")
            .unwrap();

        let mut frame = Frame {
            index: 12,
            timestamp: DateTime::from_timestamp(1_700_000_000, 123_000_000).unwrap(),
            session,
            bones: Some(bones),
            events: Arc::from([Event::PossessionChanged { previous: None, current: Some(0) }]),
        };
        let bytes = codec::encode(&mut frame).unwrap();
        let decoded: Frame = codec::decode(&bytes).unwrap();
        assert_eq!(decoded, frame);

        frame.bones = None;
        let bytes = codec::encode(&mut frame).unwrap();
        let decoded: Frame = codec::decode(&bytes).unwrap();
        assert!(decoded.bones.is_none());
    }

    #[test]
    fn cloned_frames_share_events_and_payloads() {
        let frame = Frame {
            session: SessionBuilder::new().build_snapshot(),
            events: Arc::from([Event::PlayerLeft { slot: 3, name: Arc::from("bolt") }]),
            ..Frame::default()
        };
        let copy = frame.clone();
        assert!(Arc::ptr_eq(&frame.events, &copy.events));

        let event = copy.events[0].clone();
        match (&frame.events[0], &event) {
            (Event::PlayerLeft { name: original, .. }, Event::PlayerLeft { name: cloned, .. }) => {
                assert!(Arc::ptr_eq(original, cloned));
            }
            other => panic!("unexpected events {other:?}"),
        }
    }

    #[test]
    fn header_metadata_round_trips() {
        let mut header = CaptureHeader::new("meta")
            .with_metadata("source", "legacy")
            .with_metadata("converted", "true");
        let bytes = codec::encode(&mut header).unwrap();
        let decoded: CaptureHeader = codec::decode(&bytes).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn header_rejects_duplicate_metadata_keys() {
        let mut header = CaptureHeader::new("dup").with_metadata("source", "legacy");
        let mut bytes = codec::encode(&mut header).unwrap();

        // Rewrite the count to 2 and repeat the single pair.
        let pair = b"source\0legacy\0";
        let count_at = bytes.len() - pair.len() - 4;
        bytes[count_at..count_at + 4].copy_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(pair);

        let err = codec::decode::<CaptureHeader>(&bytes).unwrap_err();
        assert!(err.to_string().contains("Malformed wire data"));
    }
}
