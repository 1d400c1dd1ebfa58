use async_trait::async_trait;
use treewright_core::{Attribute, AttributeInput, Segment, SyncMetadata, SyncMetadataUpdate};

use crate::error::StorageError;
use crate::types::AttributeOrder;

/// Mirrored segment and attribute catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert missing segments and refresh `updated_at` on existing ones, in
    /// one transaction. Returns the number of distinct names written.
    async fn upsert_segments(&self, names: &[String]) -> Result<usize, StorageError>;

    /// All segments ordered by name.
    async fn list_segments(&self) -> Result<Vec<Segment>, StorageError>;

    async fn count_segments(&self) -> Result<i64, StorageError>;

    /// Insert or overwrite attributes by id, in one transaction.
    async fn upsert_attributes(&self, attributes: &[AttributeInput]) -> Result<usize, StorageError>;

    async fn list_attributes(&self, order: AttributeOrder) -> Result<Vec<Attribute>, StorageError>;

    async fn count_attributes(&self) -> Result<i64, StorageError>;
}

/// Singleton sync cursor.
#[async_trait]
pub trait SyncMetadataStore: Send + Sync {
    /// Read the metadata row, inserting the defaults on first use.
    async fn get_or_create_sync_metadata(&self) -> Result<SyncMetadata, StorageError>;

    /// Apply the `Some` fields of `update` and return the resulting row.
    async fn update_sync_metadata(
        &self,
        update: &SyncMetadataUpdate,
    ) -> Result<SyncMetadata, StorageError>;
}
