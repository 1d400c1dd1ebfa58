use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Singleton row driving the full-vs-incremental sync decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadata {
    /// Cursor for incremental syncs; also sent to the validator as the
    /// segments cache timestamp.
    pub last_sync_at: Option<DateTime<Utc>>,
    pub is_initial_sync: bool,
    pub max_page_size: Option<i64>,
    pub total_users: Option<i64>,
    pub total_segments: Option<i64>,
    pub total_attributes: Option<i64>,
}

impl Default for SyncMetadata {
    fn default() -> Self {
        Self {
            last_sync_at: None,
            is_initial_sync: true,
            max_page_size: None,
            total_users: None,
            total_segments: None,
            total_attributes: None,
        }
    }
}

/// Partial update for [`SyncMetadata`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncMetadataUpdate {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub is_initial_sync: Option<bool>,
    pub max_page_size: Option<i64>,
    pub total_users: Option<i64>,
    pub total_segments: Option<i64>,
    pub total_attributes: Option<i64>,
}

impl SyncMetadata {
    pub fn apply(&mut self, update: &SyncMetadataUpdate) {
        if let Some(at) = update.last_sync_at {
            self.last_sync_at = Some(at);
        }
        if let Some(flag) = update.is_initial_sync {
            self.is_initial_sync = flag;
        }
        if let Some(v) = update.max_page_size {
            self.max_page_size = Some(v);
        }
        if let Some(v) = update.total_users {
            self.total_users = Some(v);
        }
        if let Some(v) = update.total_segments {
            self.total_segments = Some(v);
        }
        if let Some(v) = update.total_attributes {
            self.total_attributes = Some(v);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_sync_at: Option<DateTime<Utc>>,
    pub is_initial_sync: bool,
    pub total_segments: i64,
    pub total_users: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    Initial,
    Incremental,
}

/// Outcome of one sync run, returned by the manual trigger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub sync_type: SyncType,
    pub segments_added: i64,
    pub total_segments: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_added: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_attributes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_processed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_users: Option<i64>,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
}

/// Published once per completed page during an initial sync.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub current_page: usize,
    pub total_pages: usize,
    pub progress: f64,
}

impl SyncProgress {
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "page counts are far below 2^52")]
    pub fn new(current_page: usize, total_pages: usize) -> Self {
        let progress =
            if total_pages == 0 { 100.0 } else { current_page as f64 / total_pages as f64 * 100.0 };
        Self { current_page, total_pages, progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metadata_starts_in_initial_mode() {
        let meta = SyncMetadata::default();
        assert!(meta.is_initial_sync);
        assert!(meta.last_sync_at.is_none());
    }

    #[test]
    fn apply_only_touches_provided_fields() {
        let mut meta = SyncMetadata { total_users: Some(40), ..SyncMetadata::default() };
        meta.apply(&SyncMetadataUpdate {
            is_initial_sync: Some(false),
            total_segments: Some(7),
            ..SyncMetadataUpdate::default()
        });
        assert!(!meta.is_initial_sync);
        assert_eq!(meta.total_segments, Some(7));
        assert_eq!(meta.total_users, Some(40));
    }

    #[test]
    fn progress_percentages() {
        assert!((SyncProgress::new(1, 4).progress - 25.0).abs() < f64::EPSILON);
        assert!((SyncProgress::new(4, 4).progress - 100.0).abs() < f64::EPSILON);
        assert!((SyncProgress::new(0, 0).progress - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn report_omits_branch_specific_fields() {
        let report = SyncReport {
            sync_type: SyncType::Incremental,
            segments_added: 0,
            total_segments: Some(12),
            attributes_added: None,
            total_attributes: None,
            pages_processed: None,
            changed_users: Some(0),
            duration: 5,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["syncType"], "incremental");
        assert_eq!(json["changedUsers"], 0);
        assert!(json.get("pagesProcessed").is_none());
    }
}
