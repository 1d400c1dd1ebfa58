//! Helpers for client-side chat message payloads.
//!
//! Messages arrive in either the parts format (`{"role", "parts": [{"type":
//! "text", "text": ...}]}`) or the flat format (`{"role", "content"}`).

use serde_json::Value;

use crate::MessageRole;

/// Text of a message: its first part's text, else `content`, else `text`.
#[must_use]
pub fn message_text(message: &Value) -> Option<String> {
    let first_part = message
        .get("parts")
        .and_then(Value::as_array)
        .and_then(|parts| parts.first())
        .and_then(|part| part.get("text"))
        .and_then(Value::as_str);
    first_part
        .or_else(|| message.get("content").and_then(Value::as_str))
        .or_else(|| message.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

/// Role of a message payload, if present and recognised.
#[must_use]
pub fn message_role(message: &Value) -> Option<MessageRole> {
    message.get("role").and_then(Value::as_str).and_then(|r| r.parse().ok())
}
