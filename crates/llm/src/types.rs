//! Anthropic Messages API request, response and SSE payload types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the tool input.
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiMessage {
    /// `user` or `assistant`.
    pub role: String,
    pub content: ApiContent,
}

impl ApiMessage {
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self { role: "user".to_owned(), content: ApiContent::Text(text.into()) }
    }

    #[must_use]
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self { role: "assistant".to_owned(), content: ApiContent::Text(text.into()) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not", default)]
        is_error: bool,
    },
}

/// Non-streaming response body.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub content: Vec<ResponseContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: ApiUsage,
}

impl MessageResponse {
    /// Concatenation of every text block.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ResponseContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// Block kinds this client does not use (thinking, server tools).
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

// ── SSE payloads ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageStart {
    pub message: MessageResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseContentBlockStart {
    pub index: usize,
    pub content_block: ResponseContentBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseContentBlockDelta {
    pub index: usize,
    pub delta: SseDelta,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseContentBlockStop {
    pub index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageDelta {
    pub delta: SseMessageDeltaInfo,
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageDeltaInfo {
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseError {
    pub error: ApiErrorDetail,
}

/// Error body shared by non-2xx responses and stream `error` events.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_empty_tools_and_system() {
        let req = MessageRequest {
            model: "claude-sonnet-4-20250514".into(),
            messages: vec![ApiMessage::user_text("Hello")],
            system: None,
            max_tokens: 30,
            stream: false,
            tools: Vec::new(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert!(json.get("tools").is_none());
        assert!(json.get("system").is_none());
    }

    #[test]
    fn tool_result_block_wire_shape() {
        let ok = ApiContentBlock::ToolResult {
            tool_use_id: "toolu_1".into(),
            content: "{}".into(),
            is_error: false,
        };
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"type": "tool_result", "tool_use_id": "toolu_1", "content": "{}"})
        );
        let failed = ApiContentBlock::ToolResult {
            tool_use_id: "toolu_2".into(),
            content: "boom".into(),
            is_error: true,
        };
        assert_eq!(serde_json::to_value(&failed).unwrap()["is_error"], true);
    }

    #[test]
    fn unknown_response_blocks_are_tolerated() {
        let resp: MessageResponse = serde_json::from_value(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "m",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "VIP "},
                {"type": "text", "text": "Shoppers"}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(resp.text(), "VIP Shoppers");
        assert_eq!(resp.content[0], ResponseContentBlock::Unsupported);
    }
}
