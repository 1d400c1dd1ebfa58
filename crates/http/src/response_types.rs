//! Response types (Serialize)

use serde::Serialize;
use serde_json::Value;
use treewright_core::{
    Attribute, Conversation, ConversationSummary, Segment, SyncReport, SyncStatus, TreeVersion,
};

#[derive(Debug, Serialize)]
#[non_exhaustive]
pub struct VersionResponse {
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub success: bool,
    pub conversations: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedConversationResponse {
    pub conversation_id: String,
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationResponse {
    pub success: bool,
    pub conversation: Conversation,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub success: bool,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TreeResponse {
    pub success: bool,
    pub tree: Option<Value>,
    pub versions: Vec<TreeVersion>,
}

#[derive(Debug, Serialize)]
pub struct SegmentsResponse {
    pub success: bool,
    pub segments: Vec<Segment>,
    pub status: SyncStatus,
}

#[derive(Debug, Serialize)]
pub struct AttributesResponse {
    pub success: bool,
    pub attributes: Vec<Attribute>,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub success: bool,
    #[serde(flatten)]
    pub report: SyncReport,
}
