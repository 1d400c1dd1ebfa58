//! PostgreSQL storage backend using sqlx.
//!
//! Split into modular files by domain concern.

#![allow(clippy::absolute_paths, reason = "std paths in error handling are clear")]

mod catalog;
mod conversations;
mod messages;
mod sync_metadata;
mod trees;

use crate::error::StorageError;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use treewright_core::{
    Attribute, ChatMessage, Conversation, ConversationSummary, MessageRole, Segment,
    SyncMetadata, TreeVersion, PG_POOL_ACQUIRE_TIMEOUT_SECS, PG_POOL_IDLE_TIMEOUT_SECS,
    PG_POOL_MAX_CONNECTIONS,
};

use super::pg_migrations::run_pg_migrations;

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(PG_POOL_MAX_CONNECTIONS)
            .acquire_timeout(std::time::Duration::from_secs(PG_POOL_ACQUIRE_TIMEOUT_SECS))
            .idle_timeout(std::time::Duration::from_secs(PG_POOL_IDLE_TIMEOUT_SECS))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;
        run_pg_migrations(&pool).await.map_err(|e| StorageError::Migration(e.to_string()))?;
        tracing::info!("PgStorage initialized");
        Ok(Self { pool })
    }
}

pub(crate) const CONVERSATION_COLUMNS: &str = "id, title, tree_state, created_at, updated_at";

pub(crate) const MESSAGE_COLUMNS: &str = "id, conversation_id, role, content, created_at";

pub(crate) const TREE_VERSION_COLUMNS: &str =
    "id, conversation_id, version, tree_state, validation_output, is_valid, validated_at";

pub(crate) const ATTRIBUTE_COLUMNS: &str =
    "id, name, attr_type, ops, description, enum_values, min, max, item_type, schema, updated_at";

pub(crate) const SYNC_METADATA_COLUMNS: &str =
    "last_sync_at, is_initial_sync, max_page_size, total_users, total_segments, total_attributes";

/// Convert `usize` to `i64` for SQL LIMIT/OFFSET binds.
/// Saturates to `i64::MAX` on overflow (only possible on 128-bit targets).
pub(crate) fn usize_to_i64(val: usize) -> i64 {
    i64::try_from(val).unwrap_or(i64::MAX)
}

pub(crate) fn row_to_conversation(row: &PgRow) -> Result<Conversation, StorageError> {
    Ok(Conversation {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        tree_state: row.try_get("tree_state")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn row_to_conversation_summary(
    row: &PgRow,
) -> Result<ConversationSummary, StorageError> {
    Ok(ConversationSummary {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn row_to_message(row: &PgRow) -> Result<ChatMessage, StorageError> {
    let role: MessageRole = row.try_get::<String, _>("role")?.parse()?;
    Ok(ChatMessage {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        role,
        content: row.try_get("content")?,
        created_at: row.try_get("created_at")?,
    })
}

pub(crate) fn row_to_tree_version(row: &PgRow) -> Result<TreeVersion, StorageError> {
    Ok(TreeVersion {
        id: row.try_get("id")?,
        conversation_id: row.try_get("conversation_id")?,
        version: row.try_get("version")?,
        tree_state: row.try_get("tree_state")?,
        validation_output: row.try_get("validation_output")?,
        is_valid: row.try_get("is_valid")?,
        validated_at: row.try_get("validated_at")?,
    })
}

pub(crate) fn row_to_segment(row: &PgRow) -> Result<Segment, StorageError> {
    Ok(Segment { name: row.try_get("name")?, updated_at: row.try_get("updated_at")? })
}

pub(crate) fn row_to_attribute(row: &PgRow) -> Result<Attribute, StorageError> {
    let ops: serde_json::Value = row.try_get("ops")?;
    let ops: Vec<String> = serde_json::from_value(ops).map_err(|e| {
        StorageError::DataCorruption { context: "attribute ops is not a string array".into(), source: Box::new(e) }
    })?;
    Ok(Attribute {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        attr_type: row.try_get("attr_type")?,
        ops,
        description: row.try_get("description")?,
        enum_values: row.try_get("enum_values")?,
        min: row.try_get("min")?,
        max: row.try_get("max")?,
        item_type: row.try_get("item_type")?,
        schema: row.try_get("schema")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub(crate) fn row_to_sync_metadata(row: &PgRow) -> Result<SyncMetadata, StorageError> {
    Ok(SyncMetadata {
        last_sync_at: row.try_get("last_sync_at")?,
        is_initial_sync: row.try_get("is_initial_sync")?,
        max_page_size: row.try_get("max_page_size")?,
        total_users: row.try_get("total_users")?,
        total_segments: row.try_get("total_segments")?,
        total_attributes: row.try_get("total_attributes")?,
    })
}
