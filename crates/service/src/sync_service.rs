//! Mirrors segments and attributes from the user directory.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use chrono::Utc;
use futures_util::future::try_join_all;
use serde::Serialize;
use tokio::sync::broadcast;
use treewright_core::{
    AttributeInput, SyncMetadata, SyncMetadataUpdate, SyncProgress, SyncReport, SyncStatus,
    SyncType,
};
use treewright_storage::StorageBackend;
use treewright_storage::traits::{CatalogStore, SyncMetadataStore};

use crate::directory_client::{DirectoryClient, UsersPage};
use crate::error::{RemoteError, ServiceError};

/// Events broadcast to `/api/events` subscribers.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    SyncProgress(SyncProgress),
    SyncCompleted(SyncReport),
    SyncFailed { error: String },
}

/// Offsets of every page needed to cover `total` users.
pub fn page_offsets(total: i64, page_size: i64) -> Result<Vec<i64>, ServiceError> {
    if page_size <= 0 {
        return Err(ServiceError::Remote(RemoteError::InvalidResponse {
            service: "directory",
            message: format!("max_page_size must be positive, got {page_size}"),
        }));
    }
    let total = total.max(0);
    let pages = (total + page_size - 1) / page_size;
    Ok((0..pages).map(|page| page * page_size).collect())
}

fn unique_segments<'a>(pages: impl IntoIterator<Item = &'a UsersPage>) -> Vec<String> {
    pages
        .into_iter()
        .flat_map(|page| page.items.iter())
        .flat_map(|user| user.segments.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncService {
    storage: Arc<StorageBackend>,
    directory: Option<DirectoryClient>,
    event_tx: broadcast::Sender<String>,
    running: AtomicBool,
}

impl SyncService {
    #[must_use]
    pub fn new(
        storage: Arc<StorageBackend>,
        directory: Option<DirectoryClient>,
        event_tx: broadcast::Sender<String>,
    ) -> Self {
        Self { storage, directory, event_tx, running: AtomicBool::new(false) }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run a sync unless one is already in progress, in which case `Ok(None)`.
    pub async fn try_sync(&self) -> Result<Option<SyncReport>, ServiceError> {
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err()
        {
            tracing::info!("sync already running, skipping");
            return Ok(None);
        }
        let _guard = RunGuard(&self.running);

        match self.sync().await {
            Ok(report) => {
                tracing::info!(
                    sync_type = ?report.sync_type,
                    segments_added = report.segments_added,
                    duration_ms = report.duration,
                    "sync completed"
                );
                self.publish(&ServerEvent::SyncCompleted(report.clone()));
                Ok(Some(report))
            },
            Err(e) => {
                tracing::error!(error = %e, "sync failed");
                self.publish(&ServerEvent::SyncFailed { error: e.to_string() });
                Err(e)
            },
        }
    }

    /// Full sync on first run, incremental afterwards.
    pub async fn sync(&self) -> Result<SyncReport, ServiceError> {
        let directory = self.directory()?;
        let metadata = self.storage.get_or_create_sync_metadata().await?;
        if metadata.is_initial_sync {
            self.initial_sync(directory).await
        } else {
            self.incremental_sync(directory, &metadata).await
        }
    }

    pub async fn status(&self) -> Result<SyncStatus, ServiceError> {
        let metadata = self.storage.get_or_create_sync_metadata().await?;
        let total_segments = self.storage.count_segments().await?;
        Ok(SyncStatus {
            last_sync_at: metadata.last_sync_at,
            is_initial_sync: metadata.is_initial_sync,
            total_segments,
            total_users: metadata.total_users,
        })
    }

    fn directory(&self) -> Result<&DirectoryClient, ServiceError> {
        self.directory.as_ref().ok_or_else(|| {
            ServiceError::NotConfigured(
                "user directory API (set API_BASE_URL and BEARER_TOKEN)".to_owned(),
            )
        })
    }

    async fn initial_sync(&self, directory: &DirectoryClient) -> Result<SyncReport, ServiceError> {
        let started = Instant::now();
        // Taken before fetching so changes made mid-run are seen next time.
        let cursor = Utc::now();

        let meta = directory.users_meta().await?;
        let offsets = page_offsets(meta.total_users, meta.max_page_size)?;
        let total_pages = offsets.len();
        self.storage
            .update_sync_metadata(&SyncMetadataUpdate {
                total_users: Some(meta.total_users),
                max_page_size: Some(meta.max_page_size),
                ..SyncMetadataUpdate::default()
            })
            .await?;
        tracing::info!(total_users = meta.total_users, total_pages, "starting initial sync");

        let completed = AtomicUsize::new(0);
        let pages = try_join_all(offsets.into_iter().map(|offset| {
            let completed = &completed;
            async move {
                let page = directory.users_page(meta.max_page_size, offset).await?;
                let done = completed.fetch_add(1, Ordering::AcqRel) + 1;
                self.publish(&ServerEvent::SyncProgress(SyncProgress::new(done, total_pages)));
                Ok::<_, RemoteError>(page)
            }
        }))
        .await?;

        let segments = unique_segments(&pages);
        let segment_count = usize_to_i64(self.storage.upsert_segments(&segments).await?);
        let attribute_count = self.sync_attributes(directory).await?;

        self.storage
            .update_sync_metadata(&SyncMetadataUpdate {
                last_sync_at: Some(cursor),
                is_initial_sync: Some(false),
                total_segments: Some(segment_count),
                total_attributes: Some(attribute_count),
                ..SyncMetadataUpdate::default()
            })
            .await?;

        Ok(SyncReport {
            sync_type: SyncType::Initial,
            segments_added: segment_count,
            total_segments: Some(segment_count),
            attributes_added: Some(attribute_count),
            total_attributes: Some(attribute_count),
            pages_processed: Some(usize_to_i64(total_pages)),
            changed_users: None,
            duration: elapsed_ms(started),
        })
    }

    async fn incremental_sync(
        &self,
        directory: &DirectoryClient,
        metadata: &SyncMetadata,
    ) -> Result<SyncReport, ServiceError> {
        let started = Instant::now();
        // Taken before fetching so changes made mid-run are seen next time.
        let cursor = Utc::now();
        let since = metadata.last_sync_at.ok_or_else(|| {
            ServiceError::NotReady("No last sync timestamp found. Run initial sync first.".into())
        })?;

        let changes = directory.users_changes(since).await?;
        if changes.items.is_empty() {
            self.storage
                .update_sync_metadata(&SyncMetadataUpdate {
                    last_sync_at: Some(cursor),
                    ..SyncMetadataUpdate::default()
                })
                .await?;
            return Ok(SyncReport {
                sync_type: SyncType::Incremental,
                segments_added: 0,
                total_segments: metadata.total_segments,
                attributes_added: None,
                total_attributes: None,
                pages_processed: None,
                changed_users: Some(0),
                duration: elapsed_ms(started),
            });
        }

        let segments = unique_segments([&changes]);
        let segments_added = usize_to_i64(self.storage.upsert_segments(&segments).await?);
        let attribute_count = self.sync_attributes(directory).await?;
        let total_segments = self.storage.count_segments().await?;

        self.storage
            .update_sync_metadata(&SyncMetadataUpdate {
                last_sync_at: Some(cursor),
                total_segments: Some(total_segments),
                total_attributes: Some(attribute_count),
                ..SyncMetadataUpdate::default()
            })
            .await?;

        Ok(SyncReport {
            sync_type: SyncType::Incremental,
            segments_added,
            total_segments: Some(total_segments),
            attributes_added: Some(attribute_count),
            total_attributes: Some(attribute_count),
            pages_processed: None,
            changed_users: Some(usize_to_i64(changes.items.len())),
            duration: elapsed_ms(started),
        })
    }

    /// List attribute ids, fetch every detail concurrently, upsert all.
    async fn sync_attributes(&self, directory: &DirectoryClient) -> Result<i64, ServiceError> {
        let ids = directory.attribute_ids().await?;
        let details: Vec<AttributeInput> =
            try_join_all(ids.iter().map(|attr| directory.attribute(&attr.id))).await?;
        let written = self.storage.upsert_attributes(&details).await?;
        tracing::debug!(attributes = written, "attributes synced");
        Ok(usize_to_i64(details.len()))
    }

    fn publish(&self, event: &ServerEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize server event");
                return;
            },
        };
        if self.event_tx.send(payload).is_err() {
            tracing::debug!("No SSE subscribers for sync event");
        }
    }
}
