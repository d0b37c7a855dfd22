//! Error types for capture encoding, decoding and analysis.
//!
//! Every fallible operation in arenacap returns [`CaptureError`]. Variants carry
//! enough context (field, byte offset, line or frame index) to diagnose a failure
//! without re-running the operation.
//!
//! ## Error Categories
//!
//! - **Wire Errors**: short reads, bad length prefixes and invalid field data
//! - **Text Errors**: malformed legacy lines or structured-text payloads
//! - **Compression Errors**: zstd initialization or mid-stream failures
//! - **Archive Errors**: unreadable or incomplete `.echoreplay` zip archives
//! - **File Errors**: failure to open or create a capture file
//!
//! End of a container is never an error. Readers signal it with `Ok(None)`.
//!
//! ## Recovery
//!
//! ```rust
//! use arenacap::CaptureError;
//!
//! let error = CaptureError::wire("text", 12, "missing NUL terminator");
//! assert!(!error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for capture operations.
pub type Result<T, E = CaptureError> = std::result::Result<T, E>;

/// Main error type for capture operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CaptureError {
    #[error("Malformed wire data in {context} at offset {offset}: {details}")]
    Wire { context: String, offset: usize, details: String },

    #[error("Malformed structured text in {context}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed legacy line {line}: {details}")]
    LegacyLine { line: usize, details: String },

    #[error("Compression stream failed during {context}")]
    Compression {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Legacy archive error during {context}")]
    Archive {
        context: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Capture file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error during {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to process frame {index}")]
    Frame {
        index: u64,
        #[source]
        source: Box<CaptureError>,
    },

    #[error("Invalid identifier '{input}': {details}")]
    Identifier { input: String, details: String },

    #[error("Invalid configuration: {details}")]
    Config { details: String },
}

impl CaptureError {
    /// Returns whether this error is potentially recoverable through retry.
    ///
    /// Decoding failures are deterministic, so only interrupted or timed out
    /// stream I/O qualifies.
    pub fn is_retryable(&self) -> bool {
        match self {
            CaptureError::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            CaptureError::Frame { source, .. } => source.is_retryable(),
            CaptureError::Wire { .. } => false,
            CaptureError::Json { .. } => false,
            CaptureError::LegacyLine { .. } => false,
            CaptureError::Compression { .. } => false,
            CaptureError::Archive { .. } => false,
            CaptureError::File { .. } => false,
            CaptureError::Identifier { .. } => false,
            CaptureError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            CaptureError::Wire { .. } => vec![
                "Discard the decode target, its state is indeterminate",
                "Check both peers use the same message layout",
                "Verify the payload was not truncated in transit",
            ],
            CaptureError::Json { .. } => vec![
                "Check the payload is valid JSON",
                "Verify the game API version matches the expected schema",
            ],
            CaptureError::LegacyLine { .. } => vec![
                "Check each line is '<YYYY/MM/DD HH:MM:SS.mmm><TAB><json>'",
                "Remove partially written trailing lines",
            ],
            CaptureError::Compression { .. } => vec![
                "Verify the file is a zstd-compressed capture container",
                "Check the file was finalized by its writer",
            ],
            CaptureError::Archive { .. } => vec![
                "Verify the file is a zip archive holding one legacy capture",
                "Check the archive was closed by its writer",
            ],
            CaptureError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
                "Ensure sufficient disk space",
            ],
            CaptureError::Io { .. } => vec![
                "Check the underlying stream is still open",
                "Retry if the failure was transient",
            ],
            CaptureError::Frame { source, .. } => source.recovery_suggestions(),
            CaptureError::Identifier { .. } => vec![
                "Use the '<PLATFORM>-<account id>' form, e.g. 'STM-1'",
                "Check the platform token is a known platform",
            ],
            CaptureError::Config { .. } => vec![
                "Check configuration values against their documented ranges",
                "Remove the key to fall back to the default",
            ],
        }
    }

    /// Helper constructor for malformed wire data.
    pub fn wire(context: impl Into<String>, offset: usize, details: impl Into<String>) -> Self {
        CaptureError::Wire { context: context.into(), offset, details: details.into() }
    }

    /// Helper constructor for structured-text decode failures.
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        CaptureError::Json { context: context.into(), source }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        CaptureError::File { path, source }
    }

    /// Helper constructor for compression failures.
    pub fn compression(context: impl Into<String>, source: std::io::Error) -> Self {
        CaptureError::Compression { context: context.into(), source }
    }

    /// Helper constructor for zip archive failures.
    pub fn archive(context: impl Into<String>, source: zip::result::ZipError) -> Self {
        CaptureError::Archive { context: context.into(), source }
    }

    /// Helper constructor for stream I/O failures.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CaptureError::Io { context: context.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(details: impl Into<String>) -> Self {
        CaptureError::Config { details: details.into() }
    }

    /// Attach a frame index to this error.
    pub fn in_frame(self, index: u64) -> Self {
        CaptureError::Frame { index, source: Box::new(self) }
    }
}

impl From<std::io::Error> for CaptureError {
    fn from(err: std::io::Error) -> Self {
        CaptureError::Io { context: "stream".to_string(), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_wrapping_keeps_source() {
        let inner = CaptureError::wire("u64", 3, "short read");
        let wrapped = inner.in_frame(7);
        assert!(wrapped.to_string().contains('7'));

        let source = std::error::Error::source(&wrapped).expect("frame error has a source");
        assert!(source.to_string().contains("short read"));
    }

    #[test]
    fn only_transient_io_is_retryable() {
        let transient =
            CaptureError::io("read", std::io::Error::from(std::io::ErrorKind::Interrupted));
        let eof = CaptureError::io("read", std::io::Error::from(std::io::ErrorKind::UnexpectedEof));

        assert!(transient.is_retryable());
        assert!(!eof.is_retryable());
        assert!(!CaptureError::wire("text", 0, "bad utf-8").is_retryable());
        assert!(transient.in_frame(1).is_retryable());
    }

    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_format_correctly_with_arbitrary_context(
            context in "\\w+",
            offset in 0usize..0x10000usize,
            line in 1usize..100_000usize,
            details in ".*"
          ) {
            let wire = CaptureError::Wire { context: context.clone(), offset, details: details.clone() };
            let legacy = CaptureError::LegacyLine { line, details: details.clone() };
            let config = CaptureError::Config { details: details.clone() };

            let wire_msg = wire.to_string();
            prop_assert!(wire_msg.contains(&context));
            prop_assert!(wire_msg.contains(&offset.to_string()));
            prop_assert!(wire_msg.contains(&details));

            let legacy_msg = legacy.to_string();
            prop_assert!(legacy_msg.contains(&line.to_string()));
            prop_assert!(legacy_msg.contains(&details));

            prop_assert!(config.to_string().contains(&details));
          }

          #[test]
          fn io_conversion_preserves_message(reason in ".*") {
            let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, reason.clone());
            let converted: CaptureError = io_err.into();
            match converted {
              CaptureError::Io { source, .. } => {
                prop_assert_eq!(source.to_string(), reason);
              }
              _ => prop_assert!(false, "Expected Io error from io::Error conversion"),
            }
          }

          #[test]
          fn every_variant_offers_suggestions(index in any::<u64>(), details in ".*") {
            let errors = vec![
              CaptureError::wire("u8", 0, details.clone()),
              CaptureError::LegacyLine { line: 1, details: details.clone() },
              CaptureError::config(details.clone()),
              CaptureError::Identifier { input: details.clone(), details: details.clone() },
              CaptureError::compression("decode", std::io::Error::other(details.clone())),
              CaptureError::archive("legacy archive open", zip::result::ZipError::FileNotFound),
              CaptureError::file_error(PathBuf::from("capture.echoreplay"), std::io::Error::other(details.clone())),
              CaptureError::io("read", std::io::Error::other(details.clone())).in_frame(index),
            ];

            for error in errors {
              prop_assert!(!error.recovery_suggestions().is_empty());
              prop_assert!(!error.to_string().is_empty());
            }
          }
        }
    }
}
