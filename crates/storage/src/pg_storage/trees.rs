//! TreeStore implementation for PgStorage.

use super::*;

use crate::traits::TreeStore;
use async_trait::async_trait;

#[async_trait]
impl TreeStore for PgStorage {
    async fn record_tree_version(
        &self,
        conversation_id: &str,
        tree: &serde_json::Value,
        validation_output: Option<&serde_json::Value>,
    ) -> Result<TreeVersion, StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO conversations (id, tree_state) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET tree_state = EXCLUDED.tree_state, updated_at = NOW()",
        )
        .bind(conversation_id)
        .bind(tree)
        .execute(&mut *tx)
        .await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tree_versions WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(&mut *tx)
                .await?;
        let version = i32::try_from(existing.saturating_add(1)).map_err(|e| {
            StorageError::DataCorruption {
                context: "tree version exceeds i32::MAX".into(),
                source: Box::new(e),
            }
        })?;

        let row = sqlx::query(&format!(
            "INSERT INTO tree_versions (id, conversation_id, version, tree_state, validation_output, is_valid)
             VALUES ($1, $2, $3, $4, $5, TRUE)
             RETURNING {TREE_VERSION_COLUMNS}"
        ))
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(conversation_id)
        .bind(version)
        .bind(tree)
        .bind(validation_output)
        .fetch_one(&mut *tx)
        .await?;
        let recorded = row_to_tree_version(&row)?;

        tx.commit().await?;
        Ok(recorded)
    }

    async fn list_tree_versions(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<TreeVersion>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {TREE_VERSION_COLUMNS} FROM tree_versions
             WHERE conversation_id = $1 ORDER BY version ASC LIMIT $2"
        ))
        .bind(conversation_id)
        .bind(usize_to_i64(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_tree_version).collect()
    }
}
