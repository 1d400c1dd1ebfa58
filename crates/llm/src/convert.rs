//! Conversion of stored UI messages into Messages API turns.

use serde_json::Value;

use crate::types::{ApiContent, ApiMessage};

/// Text of a UI message: its `text` parts joined, else `content`, else `text`.
fn ui_message_text(message: &Value) -> Option<String> {
    if let Some(parts) = message.get("parts").and_then(Value::as_array) {
        let joined = parts
            .iter()
            .filter(|p| p.get("type").and_then(Value::as_str).is_none_or(|t| t == "text"))
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n");
        if !joined.trim().is_empty() {
            return Some(joined);
        }
    }
    message
        .get("content")
        .and_then(Value::as_str)
        .or_else(|| message.get("text").and_then(Value::as_str))
        .filter(|t| !t.trim().is_empty())
        .map(str::to_owned)
}

/// Build the API conversation from client-side messages.
///
/// Keeps `user` and `assistant` turns with non-empty text, merges
/// consecutive turns of the same role, and drops leading assistant turns
/// since the API requires the first turn to come from the user.
#[must_use]
pub fn to_api_messages(messages: &[Value]) -> Vec<ApiMessage> {
    let mut out: Vec<ApiMessage> = Vec::new();
    for message in messages {
        let role = match message.get("role").and_then(Value::as_str) {
            Some(role @ ("user" | "assistant")) => role,
            _ => continue,
        };
        if out.is_empty() && role == "assistant" {
            continue;
        }
        let Some(text) = ui_message_text(message) else {
            continue;
        };
        let merged = match out.last_mut() {
            Some(ApiMessage { role: last_role, content: ApiContent::Text(existing) })
                if last_role.as_str() == role =>
            {
                existing.push_str("\n\n");
                existing.push_str(&text);
                true
            },
            _ => false,
        };
        if !merged {
            out.push(ApiMessage { role: role.to_owned(), content: ApiContent::Text(text) });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn texts(messages: &[ApiMessage]) -> Vec<(String, String)> {
        messages
            .iter()
            .map(|m| match &m.content {
                ApiContent::Text(t) => (m.role.clone(), t.clone()),
                ApiContent::Blocks(_) => (m.role.clone(), String::new()),
            })
            .collect()
    }

    #[test]
    fn extracts_parts_and_flat_content() {
        let msgs = vec![
            json!({"role": "user", "parts": [{"type": "text", "text": "VIPs in the US"}]}),
            json!({"role": "assistant", "content": "Which VIP segment?"}),
            json!({"role": "user", "text": "high_ltv"}),
        ];
        assert_eq!(
            texts(&to_api_messages(&msgs)),
            vec![
                ("user".into(), "VIPs in the US".into()),
                ("assistant".into(), "Which VIP segment?".into()),
                ("user".into(), "high_ltv".into()),
            ]
        );
    }

    #[test]
    fn merges_same_role_and_drops_leading_assistant() {
        let msgs = vec![
            json!({"role": "assistant", "content": "Welcome!"}),
            json!({"role": "system", "content": "ignored"}),
            json!({"role": "user", "content": "first"}),
            json!({"role": "user", "content": "second"}),
            json!({"role": "assistant", "parts": [{"type": "tool-get_segments"}]}),
            json!({"role": "assistant", "content": "done"}),
        ];
        assert_eq!(
            texts(&to_api_messages(&msgs)),
            vec![("user".into(), "first\n\nsecond".into()), ("assistant".into(), "done".into())]
        );
    }

    #[test]
    fn reasoning_parts_are_not_replayed() {
        let msgs = vec![json!({
            "role": "user",
            "parts": [{"type": "reasoning", "text": "hmm"}, {"type": "text", "text": "hello"}]
        })];
        assert_eq!(texts(&to_api_messages(&msgs)), vec![("user".into(), "hello".into())]);
    }
}
