//! Unified storage backend with enum dispatch.

use async_trait::async_trait;
use serde_json::Value;
use treewright_core::{
    Attribute, AttributeInput, ChatMessage, Conversation, ConversationSummary, NewChatMessage,
    Segment, SyncMetadata, SyncMetadataUpdate, TreeVersion,
};

use crate::error::StorageError;
use crate::memory::MemoryStorage;
use crate::pg_storage::PgStorage;
use crate::traits::{CatalogStore, ConversationStore, MessageStore, SyncMetadataStore, TreeStore};
use crate::types::AttributeOrder;

macro_rules! dispatch {
    ($self:expr, $trait:path, $method:ident ( $($arg:expr),* $(,)? )) => {
        match $self {
            StorageBackend::Postgres(s) => <PgStorage as $trait>::$method(s, $($arg),*).await,
            StorageBackend::Memory(s) => <MemoryStorage as $trait>::$method(s, $($arg),*).await,
        }
    };
}

#[derive(Clone, Debug)]
pub enum StorageBackend {
    Postgres(PgStorage),
    Memory(MemoryStorage),
}

impl StorageBackend {
    pub async fn new_postgres(database_url: &str) -> Result<Self, StorageError> {
        Ok(Self::Postgres(PgStorage::new(database_url).await?))
    }

    /// Process-local backend; contents are lost on exit.
    #[must_use]
    pub fn new_memory() -> Self {
        Self::Memory(MemoryStorage::new())
    }

    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }
}

// ── ConversationStore ────────────────────────────────────────────

#[async_trait]
impl ConversationStore for StorageBackend {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StorageError> {
        dispatch!(self, ConversationStore, create_conversation(conversation))
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        dispatch!(self, ConversationStore, get_conversation(id))
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, StorageError> {
        dispatch!(self, ConversationStore, list_conversations())
    }

    async fn update_title(&self, id: &str, title: Option<&str>) -> Result<bool, StorageError> {
        dispatch!(self, ConversationStore, update_title(id, title))
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, StorageError> {
        dispatch!(self, ConversationStore, delete_conversation(id))
    }
}

// ── MessageStore ─────────────────────────────────────────────────

#[async_trait]
impl MessageStore for StorageBackend {
    async fn replace_messages(
        &self,
        conversation_id: &str,
        messages: &[NewChatMessage],
    ) -> Result<usize, StorageError> {
        dispatch!(self, MessageStore, replace_messages(conversation_id, messages))
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StorageError> {
        dispatch!(self, MessageStore, list_messages(conversation_id))
    }

    async fn latest_user_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ChatMessage>, StorageError> {
        dispatch!(self, MessageStore, latest_user_message(conversation_id))
    }
}

// ── TreeStore ────────────────────────────────────────────────────

#[async_trait]
impl TreeStore for StorageBackend {
    async fn record_tree_version(
        &self,
        conversation_id: &str,
        tree: &Value,
        validation_output: Option<&Value>,
    ) -> Result<TreeVersion, StorageError> {
        dispatch!(self, TreeStore, record_tree_version(conversation_id, tree, validation_output))
    }

    async fn list_tree_versions(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<TreeVersion>, StorageError> {
        dispatch!(self, TreeStore, list_tree_versions(conversation_id, limit))
    }
}

// ── CatalogStore ─────────────────────────────────────────────────

#[async_trait]
impl CatalogStore for StorageBackend {
    async fn upsert_segments(&self, names: &[String]) -> Result<usize, StorageError> {
        dispatch!(self, CatalogStore, upsert_segments(names))
    }

    async fn list_segments(&self) -> Result<Vec<Segment>, StorageError> {
        dispatch!(self, CatalogStore, list_segments())
    }

    async fn count_segments(&self) -> Result<i64, StorageError> {
        dispatch!(self, CatalogStore, count_segments())
    }

    async fn upsert_attributes(&self, attributes: &[AttributeInput]) -> Result<usize, StorageError> {
        dispatch!(self, CatalogStore, upsert_attributes(attributes))
    }

    async fn list_attributes(&self, order: AttributeOrder) -> Result<Vec<Attribute>, StorageError> {
        dispatch!(self, CatalogStore, list_attributes(order))
    }

    async fn count_attributes(&self) -> Result<i64, StorageError> {
        dispatch!(self, CatalogStore, count_attributes())
    }
}

// ── SyncMetadataStore ────────────────────────────────────────────

#[async_trait]
impl SyncMetadataStore for StorageBackend {
    async fn get_or_create_sync_metadata(&self) -> Result<SyncMetadata, StorageError> {
        dispatch!(self, SyncMetadataStore, get_or_create_sync_metadata())
    }

    async fn update_sync_metadata(
        &self,
        update: &SyncMetadataUpdate,
    ) -> Result<SyncMetadata, StorageError> {
        dispatch!(self, SyncMetadataStore, update_sync_metadata(update))
    }
}
