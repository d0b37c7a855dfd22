//! Legacy line-oriented capture format.
//!
//! One frame per line, session JSON only:
//!
//! ```text
//! 2024/03/01 19:04:05.123<TAB>{"sessionid":"…",…}<LF>
//! ```
//!
//! Timestamps are UTC with millisecond precision. Blank lines are skipped on
//! read. There is no header and no event or bones data.
//!
//! Replay files in the wild wrap the line file in a zip archive; see
//! [`archive`].

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::{debug, trace};

use crate::types::{Session, Snapshot};
use crate::{CaptureError, Result};

pub mod archive;

/// `strftime` pattern for legacy timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S%.3f";

/// One parsed legacy line.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyLine {
    pub timestamp: DateTime<Utc>,
    pub session: Snapshot<Session>,
}

/// Format a timestamp the way legacy files store it.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// Width of a formatted legacy timestamp.
const TIMESTAMP_LEN: usize = "YYYY/MM/DD HH:MM:SS.mmm".len();

/// Parse a legacy timestamp as UTC. The millisecond field is mandatory.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if text.len() != TIMESTAMP_LEN {
        return None;
    }
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok().map(|naive| naive.and_utc())
}

/// Writes legacy lines in call order.
pub struct LegacyWriter<W: Write> {
    sink: W,
    lines_written: u64,
}

impl LegacyWriter<BufWriter<File>> {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(&path)
            .map_err(|e| CaptureError::file_error(path.as_ref().to_path_buf(), e))?;
        debug!("Creating legacy capture {}", path.as_ref().display());
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> LegacyWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, lines_written: 0 }
    }

    /// Append one line. `session` is written verbatim and must not contain a
    /// line break.
    pub fn write_line(&mut self, timestamp: &DateTime<Utc>, session: &[u8]) -> Result<()> {
        if session.contains(&b'\n') {
            return Err(CaptureError::LegacyLine {
                line: self.lines_written as usize + 1,
                details: "session payload contains a line break".to_string(),
            });
        }
        let stamp = format_timestamp(timestamp);
        self.sink
            .write_all(stamp.as_bytes())
            .and_then(|()| self.sink.write_all(b"\t"))
            .and_then(|()| self.sink.write_all(session))
            .and_then(|()| self.sink.write_all(b"\n"))
            .map_err(|e| CaptureError::io("legacy write", e))?;
        self.lines_written += 1;
        trace!("Legacy line {} written", self.lines_written);
        Ok(())
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Flush and return the sink.
    pub fn finish(mut self) -> Result<W> {
        self.sink.flush().map_err(|e| CaptureError::io("legacy flush", e))?;
        Ok(self.sink)
    }
}

/// Reads legacy lines sequentially.
pub struct LegacyReader<R: BufRead> {
    source: R,
    line: Vec<u8>,
    line_number: usize,
}

impl LegacyReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)
            .map_err(|e| CaptureError::file_error(path.as_ref().to_path_buf(), e))?;
        debug!("Opening legacy capture {}", path.as_ref().display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LegacyReader<R> {
    pub fn new(source: R) -> Self {
        Self { source, line: Vec::new(), line_number: 0 }
    }

    /// Number of physical lines consumed so far, blank lines included.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next non-blank line. `Ok(None)` at end of input.
    pub fn read_line(&mut self) -> Result<Option<LegacyLine>> {
        loop {
            self.line.clear();
            let read = self
                .source
                .read_until(b'\n', &mut self.line)
                .map_err(|e| CaptureError::io("legacy read", e))?;
            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            if self.line.last() == Some(&b'\n') {
                self.line.pop();
            }
            if self.line.is_empty() {
                continue;
            }
            return self.parse_current().map(Some);
        }
    }

    fn parse_current(&self) -> Result<LegacyLine> {
        let line = self.line_number;
        let malformed = |details: String| CaptureError::LegacyLine { line, details };

        let tab = self
            .line
            .iter()
            .position(|&b| b == b'\t')
            .ok_or_else(|| malformed("missing tab separator".to_string()))?;
        let (stamp, payload) = (&self.line[..tab], &self.line[tab + 1..]);

        let stamp = std::str::from_utf8(stamp)
            .map_err(|_| malformed("timestamp is not valid UTF-8".to_string()))?;
        let timestamp = parse_timestamp(stamp)
            .ok_or_else(|| malformed(format!("unparseable timestamp '{}'", stamp)))?;

        let session = Snapshot::parse(payload, "legacy session")
            .map_err(|e| malformed(format!("invalid session payload: {}", e)))?;

        Ok(LegacyLine { timestamp, session })
    }
}

impl<R: BufRead> Iterator for LegacyReader<R> {
    type Item = Result<LegacyLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_line().transpose()
    }
}
