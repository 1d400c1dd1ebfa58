//! SyncMetadataStore implementation for PgStorage.

use super::*;

use crate::traits::SyncMetadataStore;
use async_trait::async_trait;
use treewright_core::{SyncMetadataUpdate, SYNC_METADATA_ID};

#[async_trait]
impl SyncMetadataStore for PgStorage {
    async fn get_or_create_sync_metadata(&self) -> Result<SyncMetadata, StorageError> {
        sqlx::query("INSERT INTO sync_metadata (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(SYNC_METADATA_ID)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query(&format!(
            "SELECT {SYNC_METADATA_COLUMNS} FROM sync_metadata WHERE id = $1"
        ))
        .bind(SYNC_METADATA_ID)
        .fetch_one(&self.pool)
        .await?;
        row_to_sync_metadata(&row)
    }

    async fn update_sync_metadata(
        &self,
        update: &SyncMetadataUpdate,
    ) -> Result<SyncMetadata, StorageError> {
        sqlx::query("INSERT INTO sync_metadata (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(SYNC_METADATA_ID)
            .execute(&self.pool)
            .await?;
        let row = sqlx::query(&format!(
            "UPDATE sync_metadata SET
               last_sync_at = COALESCE($2, last_sync_at),
               is_initial_sync = COALESCE($3, is_initial_sync),
               max_page_size = COALESCE($4, max_page_size),
               total_users = COALESCE($5, total_users),
               total_segments = COALESCE($6, total_segments),
               total_attributes = COALESCE($7, total_attributes)
             WHERE id = $1
             RETURNING {SYNC_METADATA_COLUMNS}"
        ))
        .bind(SYNC_METADATA_ID)
        .bind(update.last_sync_at)
        .bind(update.is_initial_sync)
        .bind(update.max_page_size)
        .bind(update.total_users)
        .bind(update.total_segments)
        .bind(update.total_attributes)
        .fetch_one(&self.pool)
        .await?;
        row_to_sync_metadata(&row)
    }
}
