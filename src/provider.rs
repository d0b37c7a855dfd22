//! Provider trait for frame sources

use std::sync::Arc;

use crate::Result;
use crate::types::{CaptureHeader, Frame};

/// Source of frames for the [`Driver`](crate::driver::Driver).
///
/// Providers pace themselves: a replay sleeps between recorded timestamps,
/// a live source waits for the next payload.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Get the next frame
    ///
    /// Returns:
    /// - `Ok(Some(frame))` - New frame available
    /// - `Ok(None)` - Stream ended (normal termination)
    /// - `Err(e)` - Error occurred
    ///
    /// Errors go to the caller, which decides whether to call again. A
    /// provider may recover from bad input on its own instead; the live
    /// provider skips undecodable payloads unless told otherwise with
    /// [`LiveProvider::skip_invalid`](crate::providers::LiveProvider::skip_invalid).
    async fn next_frame(&mut self) -> Result<Option<Arc<Frame>>>;

    /// Header describing the capture this provider produces.
    fn header(&self) -> &CaptureHeader;
}
