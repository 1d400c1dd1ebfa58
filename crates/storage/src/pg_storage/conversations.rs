//! ConversationStore implementation for PgStorage.

use super::*;

use crate::traits::ConversationStore;
use async_trait::async_trait;

#[async_trait]
impl ConversationStore for PgStorage {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StorageError> {
        sqlx::query(&format!(
            "INSERT INTO conversations ({CONVERSATION_COLUMNS}) VALUES ($1, $2, $3, $4, $5)"
        ))
        .bind(&conversation.id)
        .bind(&conversation.title)
        .bind(&conversation.tree_state)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_conversation(&r)).transpose()
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, StorageError> {
        let rows = sqlx::query(
            "SELECT id, title, created_at, updated_at FROM conversations ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_conversation_summary).collect()
    }

    async fn update_title(&self, id: &str, title: Option<&str>) -> Result<bool, StorageError> {
        let result =
            sqlx::query("UPDATE conversations SET title = $1, updated_at = NOW() WHERE id = $2")
                .bind(title)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, StorageError> {
        // Messages and tree versions go with it via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
