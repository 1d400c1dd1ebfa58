//! Validate proposed trees and persist accepted ones with version history.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use treewright_core::TreeVersion;
use treewright_storage::{StorageBackend, StorageError};
use treewright_storage::traits::{SyncMetadataStore, TreeStore};

use crate::error::ServiceError;
use crate::validator_client::ValidatorClient;

const REJECTED_MESSAGE: &str =
    "Validator rejected the tree. Please fix the reported issues and try again.";
const ACCEPTED_MESSAGE: &str = "Tree validated and stored with version history.";

/// Concurrent writers for one conversation can race on the version number.
const VERSION_CONFLICT_RETRIES: usize = 3;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum TreeOutcome {
    #[serde(rename_all = "camelCase")]
    Accepted { ok: bool, conversation_id: String, version: i32, message: String },
    Rejected { ok: bool, errors: Vec<Value>, warnings: Vec<Value>, message: String },
}

impl TreeOutcome {
    /// JSON returned to the model as the tool result.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

pub struct TreeService {
    storage: Arc<StorageBackend>,
    validator: Option<ValidatorClient>,
}

impl TreeService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>, validator: Option<ValidatorClient>) -> Self {
        Self { storage, validator }
    }

    /// Validate `tree` and, when accepted, store it as the next version of
    /// `conversation_id` (a fresh id when absent).
    pub async fn update_tree(
        &self,
        conversation_id: Option<&str>,
        tree: &Value,
    ) -> Result<TreeOutcome, ServiceError> {
        if !tree.is_object() {
            return Err(ServiceError::InvalidInput("Tree payload is required".to_owned()));
        }
        let validator = self.validator.as_ref().ok_or_else(|| {
            ServiceError::NotConfigured(
                "Missing validator bearer token (set BEARER_TOKEN or VALIDATOR_BEARER_TOKEN)."
                    .to_owned(),
            )
        })?;
        let metadata = self.storage.get_or_create_sync_metadata().await?;
        let cache_timestamp = metadata.last_sync_at.ok_or_else(|| {
            ServiceError::NotReady(
                "Segments cache timestamp not found. Run an initial sync before validating trees."
                    .to_owned(),
            )
        })?;

        let verdict = validator.validate(tree, cache_timestamp).await?;
        if !verdict.ok {
            tracing::info!(errors = verdict.errors.len(), "validator rejected tree");
            return Ok(TreeOutcome::Rejected {
                ok: false,
                errors: verdict.errors,
                warnings: verdict.warnings,
                message: REJECTED_MESSAGE.to_owned(),
            });
        }

        let conversation_id = conversation_id
            .filter(|id| !id.is_empty())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), str::to_owned);
        let stored_output = verdict.output.as_ref().unwrap_or(&verdict.body);

        let storage = &self.storage;
        let id = conversation_id.as_str();
        let version =
            record_with_retries(id, move || storage.record_tree_version(id, tree, Some(stored_output)))
                .await?;
        tracing::info!(%conversation_id, version = version.version, "tree version stored");

        Ok(TreeOutcome::Accepted {
            ok: true,
            conversation_id,
            version: version.version,
            message: ACCEPTED_MESSAGE.to_owned(),
        })
    }
}

/// Run `record` until it stores a version, retrying unique-index conflicts.
async fn record_with_retries<F, Fut>(
    conversation_id: &str,
    mut record: F,
) -> Result<TreeVersion, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<TreeVersion, StorageError>>,
{
    let mut attempt = 0;
    loop {
        match record().await {
            Ok(version) => return Ok(version),
            Err(e) if e.is_duplicate() && attempt < VERSION_CONFLICT_RETRIES => {
                attempt += 1;
                tracing::warn!(%conversation_id, attempt, "tree version conflict, retrying");
            },
            Err(e) => return Err(e),
        }
    }
}
