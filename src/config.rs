//! Capture configuration.
//!
//! Settings can be built in code or loaded from YAML:
//!
//! ```rust
//! use arenacap::CaptureConfig;
//!
//! let config = CaptureConfig::from_yaml_str(
//!     "compression_level: 3\nmetadata:\n  venue: practice arena\n",
//! )?;
//! assert_eq!(config.compression_level, 3);
//! assert_eq!(config.playback_speed, 1.0);
//! # Ok::<(), arenacap::CaptureError>(())
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{CaptureError, Result};

/// Default upper bound on a single container message.
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 64 * 1024 * 1024;

/// Replay speed range accepted by the replay provider.
pub const MIN_PLAYBACK_SPEED: f64 = 0.1;
pub const MAX_PLAYBACK_SPEED: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// zstd level for container output. `1` favours latency.
    pub compression_level: i32,
    /// Largest length prefix a reader accepts before treating the stream as
    /// corrupt.
    pub max_message_len: usize,
    /// Replay pacing multiplier, clamped to 0.1..=10.
    pub playback_speed: f64,
    /// Extra metadata merged into generated capture headers.
    pub metadata: BTreeMap<String, String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            compression_level: 1,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            playback_speed: 1.0,
            metadata: BTreeMap::new(),
        }
    }
}

impl CaptureConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)
            .map_err(|e| CaptureError::config(format!("YAML parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| CaptureError::file_error(path.as_ref().to_path_buf(), e))?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        let levels = zstd::compression_level_range();
        if !levels.contains(&self.compression_level) {
            return Err(CaptureError::config(format!(
                "compression_level {} outside {}..={}",
                self.compression_level,
                levels.start(),
                levels.end()
            )));
        }
        if self.max_message_len == 0 {
            return Err(CaptureError::config("max_message_len must be positive"));
        }
        if !(self.playback_speed.is_finite() && self.playback_speed > 0.0) {
            return Err(CaptureError::config(format!(
                "playback_speed {} must be a positive number",
                self.playback_speed
            )));
        }
        Ok(())
    }

    /// Playback speed clamped to the supported range.
    pub fn effective_speed(&self) -> f64 {
        self.playback_speed.clamp(MIN_PLAYBACK_SPEED, MAX_PLAYBACK_SPEED)
    }
}
