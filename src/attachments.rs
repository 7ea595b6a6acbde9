//! Attachment resolution.
//!
//! The host delivers attachments either through the stdin channel, as a
//! bare array or as `{ "attachments": [...], "message": "..." }`, or through
//! the older `CLAUDE_ATTACHMENTS_FILE` JSON file. Everything here is best
//! effort: a wrong shape or unreadable file means no attachments.

use serde_json::Value;
use std::path::Path;

use crate::models::AttachmentDescriptor;

const ATTACHMENTS_FIELD: &str = "attachments";
const MESSAGE_FIELD: &str = "message";

/// Resolve the ordered attachment list from a channel payload, falling
/// back to the legacy file when the payload has no attachment list.
pub fn resolve_attachments(
    payload: Option<&Value>,
    fallback_file: Option<&Path>,
) -> Vec<AttachmentDescriptor> {
    if let Some(items) = payload.and_then(payload_attachments) {
        return items.iter().map(AttachmentDescriptor::from_value).collect();
    }
    match fallback_file {
        Some(path) => load_attachments_file(path),
        None => Vec::new(),
    }
}

fn payload_attachments(payload: &Value) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get(ATTACHMENTS_FIELD)?.as_array(),
        _ => None,
    }
}

/// The optional `message` string carried alongside the attachments.
pub fn payload_message(payload: Option<&Value>) -> Option<String> {
    payload?
        .get(MESSAGE_FIELD)?
        .as_str()
        .map(str::to_string)
}

/// Read the legacy attachments file. Anything but a JSON array yields `[]`.
pub fn load_attachments_file(path: &Path) -> Vec<AttachmentDescriptor> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to load attachments: {}", e);
            return Vec::new();
        }
    };
    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(items)) => items.iter().map(AttachmentDescriptor::from_value).collect(),
        Ok(_) => {
            tracing::debug!(path = %path.display(), "attachments file is not a JSON array");
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to load attachments: {}", e);
            Vec::new()
        }
    }
}
