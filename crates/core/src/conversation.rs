use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    /// Latest tree accepted by the validator.
    pub tree_state: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    #[must_use]
    pub fn new(id: String, title: Option<String>) -> Self {
        let now = Utc::now();
        Self { id, title, tree_state: None, created_at: now, updated_at: now }
    }

    #[must_use]
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Conversation row without the tree payload, used for sidebar listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

impl MessageRole {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Tool => "tool",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            "tool" => Ok(Self::Tool),
            _ => Err(CoreError::InvalidInput(format!("Invalid message role: {s}"))),
        }
    }
}

/// A stored chat message. `content` is the full client-side message payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: i64,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Message about to be written by a history replace.
#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub role: MessageRole,
    pub content: serde_json::Value,
}

/// Append-only snapshot of a validated tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeVersion {
    pub id: String,
    pub conversation_id: String,
    /// Starts at 1 and increases by one per accepted tree.
    pub version: i32,
    pub tree_state: serde_json::Value,
    pub validation_output: Option<serde_json::Value>,
    pub is_valid: bool,
    pub validated_at: DateTime<Utc>,
}
