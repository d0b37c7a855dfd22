//! Verbatim structured-text payloads paired with their decoded shape.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::codec::{FieldStream, Streamable};
use crate::{CaptureError, Result};

/// A JSON payload kept exactly as received, alongside its decoded value.
///
/// Keeping the original text lets captures be re-emitted byte-for-byte, even
/// when the payload carries fields the typed model does not know about.
/// Both halves are reference counted, so clones are cheap.
pub struct Snapshot<T> {
    raw: Arc<str>,
    value: Arc<T>,
}

impl<T: DeserializeOwned> Snapshot<T> {
    /// Decode a payload from raw bytes.
    pub fn parse(raw: &[u8], context: &str) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|e| {
            CaptureError::wire(context, e.valid_up_to(), "payload is not valid UTF-8")
        })?;
        Self::from_text(Arc::from(text), context)
    }

    /// Decode a payload that is already shared text.
    pub fn from_text(raw: Arc<str>, context: &str) -> Result<Self> {
        let value = serde_json::from_str(&raw).map_err(|e| CaptureError::json(context, e))?;
        Ok(Self { raw, value: Arc::new(value) })
    }
}

impl<T: Serialize> Snapshot<T> {
    /// Build a snapshot by serializing `value`.
    pub fn from_value(value: T) -> Result<Self> {
        let raw = serde_json::to_string(&value).map_err(|e| CaptureError::json("snapshot", e))?;
        Ok(Self { raw: Arc::from(raw), value: Arc::new(value) })
    }
}

impl<T> Snapshot<T> {
    /// The payload text exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.raw.as_bytes()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn shared_value(&self) -> Arc<T> {
        Arc::clone(&self.value)
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self { raw: Arc::clone(&self.raw), value: Arc::clone(&self.value) }
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

/// Snapshots compare by their verbatim text.
impl<T> PartialEq for Snapshot<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> fmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot").field("raw_len", &self.raw.len()).finish()
    }
}

/// Empty placeholder used as a decode target.
impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self { raw: Arc::from(""), value: Arc::new(T::default()) }
    }
}

impl<T: DeserializeOwned> Streamable for Snapshot<T> {
    fn stream(&mut self, s: &mut FieldStream<'_>) -> Result<()> {
        s.shared_text(&mut self.raw)?;
        if s.is_decoding() {
            let value =
                serde_json::from_str(&self.raw).map_err(|e| CaptureError::json("snapshot", e))?;
            self.value = Arc::new(value);
        }
        Ok(())
    }
}
