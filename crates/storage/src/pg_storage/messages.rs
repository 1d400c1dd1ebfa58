//! MessageStore implementation for PgStorage.

use super::*;

use crate::traits::MessageStore;
use async_trait::async_trait;
use treewright_core::NewChatMessage;

#[async_trait]
impl MessageStore for PgStorage {
    async fn replace_messages(
        &self,
        conversation_id: &str,
        messages: &[NewChatMessage],
    ) -> Result<usize, StorageError> {
        let mut tx = self.pool.begin().await?;

        let touched = sqlx::query("UPDATE conversations SET updated_at = NOW() WHERE id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Err(StorageError::not_found("conversation", conversation_id));
        }

        sqlx::query("DELETE FROM chat_messages WHERE conversation_id = $1")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        // One statement per message keeps BIGSERIAL ids in list order.
        for message in messages {
            sqlx::query(
                "INSERT INTO chat_messages (conversation_id, role, content) VALUES ($1, $2, $3)",
            )
            .bind(conversation_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(messages.len())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE conversation_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_message).collect()
    }

    async fn latest_user_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ChatMessage>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE conversation_id = $1 AND role = 'user'
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| row_to_message(&r)).transpose()
    }
}
