//! Conversion between legacy line captures and containers.
//!
//! Legacy to container is lossless for what legacy files hold: every session
//! payload is kept byte for byte and events are regenerated by a fresh
//! [`FrameProcessor`]. Container to legacy is lossy; events and bones are
//! dropped and timestamps are truncated to milliseconds, so the round trip
//! container → legacy → container does not reproduce the original container.
//!
//! The file forms read and write `.echoreplay` zip archives as well as bare
//! line files, choosing by extension.
//!
//! On failure the destination holds whatever was flushed before the error.
//! Callers needing atomic output should write to a temporary path and rename.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Cursor, Read, Write};
use std::path::Path;

use tracing::{debug, info};
use uuid::Uuid;

use crate::container::{ContainerReader, ContainerWriter};
use crate::legacy::{LegacyReader, LegacyWriter, archive};
use crate::processor::FrameProcessor;
use crate::types::CaptureHeader;
use crate::{CaptureConfig, CaptureError, Result};

/// Outcome of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionSummary {
    pub frames: u64,
    /// Events generated (legacy → container) or discarded (container → legacy).
    pub events: u64,
    /// Header written (legacy → container) or read (container → legacy).
    pub header: CaptureHeader,
}

/// Header for a container produced from a legacy capture.
///
/// Configured metadata is included, but the provenance keys `source`,
/// `source_file` and `converted` always reflect the conversion.
pub fn converted_header(source_name: &str, config: &CaptureConfig) -> CaptureHeader {
    let mut metadata: BTreeMap<String, String> = config.metadata.clone();
    metadata.insert("source".to_string(), "legacy".to_string());
    metadata.insert("source_file".to_string(), source_name.to_string());
    metadata.insert("converted".to_string(), "true".to_string());

    CaptureHeader { metadata, ..CaptureHeader::new(format!("converted-{}", Uuid::new_v4())) }
}

/// Convert a legacy capture read from `source` into a container on `sink`.
pub fn legacy_to_container<R: BufRead, W: Write>(
    source: R,
    sink: W,
    source_name: &str,
    config: &CaptureConfig,
) -> Result<(W, ConversionSummary)> {
    let header = converted_header(source_name, config);
    let mut writer = ContainerWriter::new(sink, &header, config)?;
    let mut processor = FrameProcessor::new();
    let mut events = 0u64;

    for line in LegacyReader::new(source) {
        let line = line?;
        let frame = processor.process_snapshots(line.session, None, line.timestamp);
        events += frame.events.len() as u64;
        writer.write_frame(&frame)?;
    }

    let frames = writer.frames_written();
    let sink = writer.finish()?;
    info!(
        "Converted legacy capture {} to container {}: {} frames, {} events",
        source_name, header.capture_id, frames, events
    );
    Ok((sink, ConversionSummary { frames, events, header }))
}

/// Convert a container read from `source` into legacy lines on `sink`.
pub fn container_to_legacy<R: Read, W: Write>(
    source: R,
    sink: W,
    config: &CaptureConfig,
) -> Result<(W, ConversionSummary)> {
    let mut reader = ContainerReader::new(source, config)?;
    let header = reader.header().clone();
    debug!("Container {} metadata: {:?}", header.capture_id, header.metadata);

    let mut writer = LegacyWriter::new(sink);
    let mut events = 0u64;
    while let Some(frame) = reader.read_frame()? {
        events += frame.events.len() as u64;
        writer.write_line(&frame.timestamp, frame.session.as_bytes())?;
    }

    let frames = writer.lines_written();
    let sink = writer.finish()?;
    info!(
        "Converted container {} to legacy: {} frames, {} events dropped",
        header.capture_id, frames, events
    );
    Ok((sink, ConversionSummary { frames, events, header }))
}

/// File-to-file form of [`legacy_to_container`].
///
/// An input ending in `.echoreplay` is unpacked from its zip archive first.
pub fn legacy_file_to_container<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &CaptureConfig,
) -> Result<ConversionSummary> {
    let input = input.as_ref();
    let source_name =
        input.file_name().map(|name| name.to_string_lossy().into_owned()).unwrap_or_default();
    let source: Box<dyn BufRead> = if archive::is_archive(input) {
        let file = BufReader::new(open_file(input)?);
        Box::new(Cursor::new(archive::read_entry(file, &source_name)?))
    } else {
        Box::new(BufReader::new(open_file(input)?))
    };
    let sink = BufWriter::new(create_file(output.as_ref())?);
    let (_, summary) = legacy_to_container(source, sink, &source_name, config)?;
    Ok(summary)
}

/// File-to-file form of [`container_to_legacy`].
///
/// An output ending in `.echoreplay` is written as a zip archive whose
/// single entry carries the output's file name.
pub fn container_file_to_legacy<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    config: &CaptureConfig,
) -> Result<ConversionSummary> {
    let output = output.as_ref();
    let source = open_file(input.as_ref())?;
    let sink = BufWriter::new(create_file(output)?);

    if archive::is_archive(output) {
        let zip = archive::start_entry(sink, &archive::entry_name(output)?)?;
        let (zip, summary) = container_to_legacy(source, zip, config)?;
        archive::finish(zip)?;
        Ok(summary)
    } else {
        let (_, summary) = container_to_legacy(source, sink, config)?;
        Ok(summary)
    }
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| CaptureError::file_error(path.to_path_buf(), e))
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| CaptureError::file_error(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::legacy_capture;
    use std::io::Cursor;

    #[test]
    fn legacy_round_trip_is_byte_identical() {
        let config = CaptureConfig::default();
        let original = legacy_capture(200);

        let (container, forward) =
            legacy_to_container(Cursor::new(original.as_bytes()), Vec::new(), "match.log", &config)
                .unwrap();
        assert_eq!(forward.frames, 200);
        assert!(forward.events > 0, "scripted match produces events");

        let (legacy, back) = container_to_legacy(container.as_slice(), Vec::new(), &config).unwrap();
        assert_eq!(back.frames, 200);
        assert_eq!(back.events, forward.events);
        assert_eq!(back.header, forward.header);
        assert_eq!(String::from_utf8(legacy).unwrap(), original);
    }

    #[test]
    fn header_records_provenance() {
        let mut config = CaptureConfig::default();
        config.metadata.insert("venue".into(), "scrim".into());
        config.metadata.insert("source".into(), "overridden".into());

        let header = converted_header("night.log", &config);
        assert!(header.capture_id.starts_with("converted-"));
        assert_eq!(header.metadata["source"], "legacy");
        assert_eq!(header.metadata["source_file"], "night.log");
        assert_eq!(header.metadata["converted"], "true");
        assert_eq!(header.metadata["venue"], "scrim");
    }

    #[test]
    fn empty_legacy_capture_gives_header_only_container() {
        let config = CaptureConfig::default();
        let (container, summary) =
            legacy_to_container(Cursor::new("\n\n"), Vec::new(), "empty.log", &config).unwrap();
        assert_eq!(summary.frames, 0);

        let mut reader = ContainerReader::new(container.as_slice(), &config).unwrap();
        assert!(reader.read_frame().unwrap().is_none());
    }

    #[test]
    fn malformed_line_aborts_conversion() {
        let config = CaptureConfig::default();
        let input = format!("{}not a capture line\n", legacy_capture(2));
        let err = legacy_to_container(Cursor::new(input), Vec::new(), "bad.log", &config).unwrap_err();
        assert!(matches!(err, CaptureError::LegacyLine { line: 3, .. }));
    }
}
