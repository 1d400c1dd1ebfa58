use async_trait::async_trait;
use treewright_core::{ChatMessage, Conversation, ConversationSummary, NewChatMessage, TreeVersion};

use crate::error::StorageError;

/// Conversation lifecycle operations.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert a new conversation. Fails with `Duplicate` if the id exists.
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StorageError>;

    /// Get conversation by ID.
    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError>;

    /// All conversations, most recently updated first.
    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, StorageError>;

    /// Set or clear the title. Returns `true` if the conversation exists.
    async fn update_title(&self, id: &str, title: Option<&str>) -> Result<bool, StorageError>;

    /// Delete conversation with its messages and tree versions.
    /// Returns `true` if a row was deleted.
    async fn delete_conversation(&self, id: &str) -> Result<bool, StorageError>;
}

/// Chat history operations.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Atomically replace the whole history of a conversation and bump its
    /// `updated_at`. Fails with `NotFound` if the conversation is missing.
    async fn replace_messages(
        &self,
        conversation_id: &str,
        messages: &[NewChatMessage],
    ) -> Result<usize, StorageError>;

    /// History in insertion order.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StorageError>;

    /// Most recent message with role `user`.
    async fn latest_user_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ChatMessage>, StorageError>;
}

/// Validated tree history.
#[async_trait]
pub trait TreeStore: Send + Sync {
    /// Store `tree` as the conversation's current state (creating the
    /// conversation if needed) and append version `existing + 1`.
    async fn record_tree_version(
        &self,
        conversation_id: &str,
        tree: &serde_json::Value,
        validation_output: Option<&serde_json::Value>,
    ) -> Result<TreeVersion, StorageError>;

    /// Oldest-first versions, at most `limit`.
    async fn list_tree_versions(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<TreeVersion>, StorageError>;
}
