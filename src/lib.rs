//! Capture, replay and conversion of arena game telemetry.
//!
//! arenacap records the game's session and bone payloads as numbered frames,
//! derives gameplay events by diffing consecutive frames, and stores them in
//! compressed, length-delimited capture containers.
//!
//! # Features
//!
//! - **Symmetric codec**: one [`Streamable`](codec::Streamable) method per
//!   message both encodes and decodes it
//! - **Event detection**: joins, leaves, score, possession, throws and stat
//!   increments between frames
//! - **Containers**: zstd-compressed, varint-delimited frame files
//! - **Legacy captures**: lossless import of tab-separated line captures,
//!   bare or zipped as `.echoreplay`
//! - **Replay**: timestamp-paced async playback of containers
//!
//! ## Example (conversion)
//!
//! ```rust,no_run
//! use arenacap::{CaptureConfig, convert};
//!
//! # fn main() -> arenacap::Result<()> {
//! let config = CaptureConfig::default();
//! let summary = convert::legacy_file_to_container("match.log", "match.cap", &config)?;
//! println!("{} frames, {} events", summary.frames, summary.events);
//! # Ok(())
//! # }
//! ```
//!
//! ## Example (replay)
//!
//! ```rust,no_run
//! use arenacap::{ArenaCap, CaptureConfig};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> arenacap::Result<()> {
//!     let mut connection = ArenaCap::replay("match.cap", &CaptureConfig::default()).await?;
//!     let mut events = Box::pin(connection.events());
//!     while let Some((frame, event)) = events.next().await {
//!         println!("{frame}: {event}");
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod codec;
mod config;
mod error;
pub mod messages;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Capture formats and processing
pub mod container;
pub mod convert;
pub mod legacy;
pub mod processor;
pub mod transport;

// Stream-based replay architecture
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;

// Core exports
pub use config::*;
pub use error::*;
pub use types::*;

pub use connection::{LiveConnection, ReplayConnection};
pub use container::{ContainerReader, ContainerWriter};
pub use convert::ConversionSummary;
pub use legacy::{LegacyReader, LegacyWriter};
pub use processor::{EventDetector, FrameProcessor, RoleClassifier, SlotParityHeuristic};
pub use providers::RawPayload;

/// Unified entry point for capture connections.
pub struct ArenaCap;

impl ArenaCap {
    /// Replay a container file at the configured playback speed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or its header is
    /// malformed.
    pub async fn replay<P: AsRef<std::path::Path>>(
        path: P,
        config: &CaptureConfig,
    ) -> Result<ReplayConnection> {
        ReplayConnection::open(path, config).await
    }

    /// Start a live capture fed through the returned sender.
    pub fn live(
        header: CaptureHeader,
    ) -> (tokio::sync::mpsc::Sender<RawPayload>, LiveConnection) {
        LiveConnection::start(header)
    }
}
