//! Request body previews.
//!
//! Captured network calls carry the request payload. [`BodyPreview`] turns a
//! request body into that payload without consuming it: JSON bodies become
//! JSON values, other UTF-8 bodies become strings, anything else is skipped.

use bytes::Bytes;
use serde_json::Value;

/// A request body that can describe itself as a JSON payload.
pub trait BodyPreview {
    /// The payload to record, or `None` for empty or binary bodies.
    fn preview(&self) -> Option<Value>;
}

/// Preview raw bytes: JSON first, then UTF-8 text.
pub fn preview_bytes(bytes: &[u8]) -> Option<Value> {
    if bytes.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return Some(value);
    }
    std::str::from_utf8(bytes)
        .ok()
        .map(|text| Value::String(text.to_string()))
}

impl BodyPreview for () {
    fn preview(&self) -> Option<Value> {
        None
    }
}

impl BodyPreview for String {
    fn preview(&self) -> Option<Value> {
        preview_bytes(self.as_bytes())
    }
}

impl BodyPreview for &'static str {
    fn preview(&self) -> Option<Value> {
        preview_bytes(self.as_bytes())
    }
}

impl BodyPreview for Vec<u8> {
    fn preview(&self) -> Option<Value> {
        preview_bytes(self)
    }
}

impl BodyPreview for Bytes {
    fn preview(&self) -> Option<Value> {
        preview_bytes(self)
    }
}

impl BodyPreview for Value {
    fn preview(&self) -> Option<Value> {
        match self {
            Value::Null => None,
            other => Some(other.clone()),
        }
    }
}

impl<T: BodyPreview> BodyPreview for Option<T> {
    fn preview(&self) -> Option<Value> {
        self.as_ref().and_then(BodyPreview::preview)
    }
}
