//! Zip packaging for legacy captures.
//!
//! A `.echoreplay` file is a zip archive holding a single deflated entry
//! named after the archive itself, so `night.echoreplay` contains an entry
//! called `night.echoreplay`. The entry is a plain legacy line file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use tracing::{debug, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{LegacyReader, LegacyWriter};
use crate::{CaptureError, Result};

/// File extension of zipped legacy captures.
pub const ARCHIVE_EXTENSION: &str = "echoreplay";

/// Whether `path` names a zipped legacy capture.
pub fn is_archive(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}

/// Name of the entry an archive at `path` holds.
pub fn entry_name(path: &Path) -> Result<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned()).ok_or_else(|| {
        CaptureError::file_error(
            path.to_path_buf(),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
        )
    })
}

/// Inflate the entry called `name` into memory.
///
/// An archive holding exactly one entry under another name was renamed after
/// it was written; that entry is used.
pub fn read_entry<R: Read + Seek>(source: R, name: &str) -> Result<Vec<u8>> {
    let mut archive =
        ZipArchive::new(source).map_err(|e| CaptureError::archive("legacy archive open", e))?;

    let index = match archive.index_for_name(name) {
        Some(index) => index,
        None if archive.len() == 1 => {
            warn!("Archive has no entry '{}', reading its only entry", name);
            0
        }
        None => {
            return Err(CaptureError::archive(format!("legacy archive entry '{}'", name), ZipError::FileNotFound));
        }
    };

    let mut entry = archive
        .by_index(index)
        .map_err(|e| CaptureError::archive("legacy archive entry", e))?;
    let mut data = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut data).map_err(|e| CaptureError::io("legacy archive read", e))?;
    debug!("Inflated archive entry '{}': {} bytes", entry.name(), data.len());
    Ok(data)
}

/// Start an archive on `sink` with one deflated entry called `name`.
///
/// Write the line file through the returned writer, then call [`finish`].
pub fn start_entry<W: Write + Seek>(sink: W, name: &str) -> Result<ZipWriter<W>> {
    let mut writer = ZipWriter::new(sink);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer
        .start_file(name, options)
        .map_err(|e| CaptureError::archive(format!("legacy archive entry '{}'", name), e))?;
    Ok(writer)
}

/// Write the central directory and flush, returning the sink.
pub fn finish<W: Write + Seek>(writer: ZipWriter<W>) -> Result<W> {
    let mut sink = writer.finish().map_err(|e| CaptureError::archive("legacy archive finish", e))?;
    sink.flush().map_err(|e| CaptureError::io("legacy archive flush", e))?;
    Ok(sink)
}

impl LegacyReader<Cursor<Vec<u8>>> {
    /// Open a `.echoreplay` archive. The entry is inflated up front.
    pub fn open_archive<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| CaptureError::file_error(path.to_path_buf(), e))?;
        debug!("Opening legacy archive {}", path.display());
        let data = read_entry(BufReader::new(file), &entry_name(path)?)?;
        Ok(Self::new(Cursor::new(data)))
    }
}

impl LegacyWriter<ZipWriter<BufWriter<File>>> {
    /// Create a `.echoreplay` archive. Call
    /// [`finish_archive`](LegacyWriter::finish_archive) when done.
    pub fn create_archive<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = entry_name(path)?;
        let file = File::create(path).map_err(|e| CaptureError::file_error(path.to_path_buf(), e))?;
        debug!("Creating legacy archive {}", path.display());
        Ok(Self::new(start_entry(BufWriter::new(file), &name)?))
    }
}

impl<W: Write + Seek> LegacyWriter<ZipWriter<W>> {
    /// Flush the line file and close the archive around it.
    pub fn finish_archive(self) -> Result<W> {
        finish(self.finish()?)
    }
}
