//! The three data-access tools offered to the model.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use treewright_llm::{ToolDefinition, ToolExecutor};

use crate::catalog_service::CatalogService;
use crate::tree_service::TreeService;

pub const GET_SEGMENTS: &str = "get_segments";
pub const GET_ATTRIBUTES: &str = "get_attributes";
pub const UPDATE_TREE: &str = "update_tree";

/// Tools bound to one conversation. `update_tree` always writes to
/// `conversation_id`, whatever the model passes.
pub struct AgentTools {
    catalog: Arc<CatalogService>,
    trees: Arc<TreeService>,
    conversation_id: String,
}

impl AgentTools {
    #[must_use]
    pub const fn new(
        catalog: Arc<CatalogService>,
        trees: Arc<TreeService>,
        conversation_id: String,
    ) -> Self {
        Self { catalog, trees, conversation_id }
    }

    async fn get_segments(&self) -> Result<Value, String> {
        let segments = self
            .catalog
            .segment_names()
            .await
            .map_err(|e| format!("Failed to fetch segments: {e}"))?;
        Ok(json!({ "segments": segments }))
    }

    async fn get_attributes(&self) -> Result<Value, String> {
        let attributes = self
            .catalog
            .attributes_for_agent()
            .await
            .map_err(|e| format!("Failed to fetch attributes: {e}"))?;
        Ok(json!({ "attributes": attributes }))
    }

    async fn update_tree(&self, input: &Value) -> Result<Value, String> {
        let tree = input.get("tree").ok_or_else(|| "Tree payload is required".to_owned())?;
        let outcome = self
            .trees
            .update_tree(Some(&self.conversation_id), tree)
            .await
            .map_err(|e| e.to_string())?;
        Ok(outcome.to_value())
    }
}

fn no_input_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

#[async_trait]
impl ToolExecutor for AgentTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition {
                name: GET_SEGMENTS.to_owned(),
                description: "Search for available user segments (tags). Returns a list of valid segment keys."
                    .to_owned(),
                input_schema: no_input_schema(),
            },
            ToolDefinition {
                name: GET_ATTRIBUTES.to_owned(),
                description: "Get the list of available user attributes, their data types, and valid operators."
                    .to_owned(),
                input_schema: no_input_schema(),
            },
            ToolDefinition {
                name: UPDATE_TREE.to_owned(),
                description: "Validate a proposed decision tree and persist it with version history after the Validator API confirms ok: true."
                    .to_owned(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "tree": {
                            "type": "object",
                            "description": "Decision tree JSON to validate and, if valid, persist as the latest version."
                        }
                    },
                    "required": ["tree"]
                }),
            },
        ]
    }

    async fn execute(&self, name: &str, input: Value) -> Result<Value, String> {
        tracing::debug!(tool = name, conversation_id = %self.conversation_id, "executing tool");
        match name {
            GET_SEGMENTS => self.get_segments().await,
            GET_ATTRIBUTES => self.get_attributes().await,
            UPDATE_TREE => self.update_tree(&input).await,
            other => Err(format!("Unknown tool: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treewright_core::SyncMetadataUpdate;
    use treewright_storage::StorageBackend;
    use treewright_storage::traits::{CatalogStore, SyncMetadataStore, TreeStore};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::validator_client::ValidatorClient;

    fn tools(storage: &Arc<StorageBackend>, validator: Option<ValidatorClient>) -> AgentTools {
        AgentTools::new(
            Arc::new(CatalogService::new(Arc::clone(storage))),
            Arc::new(TreeService::new(Arc::clone(storage), validator)),
            "conv-1".to_owned(),
        )
    }

    #[tokio::test]
    async fn exposes_three_tools() {
        let storage = Arc::new(StorageBackend::new_memory());
        let names: Vec<_> = tools(&storage, None).definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec![GET_SEGMENTS, GET_ATTRIBUTES, UPDATE_TREE]);
    }

    #[tokio::test]
    async fn get_segments_lists_names() {
        let storage = Arc::new(StorageBackend::new_memory());
        storage.upsert_segments(&["vip".into()]).await.unwrap();
        let out = tools(&storage, None).execute(GET_SEGMENTS, json!({})).await.unwrap();
        assert_eq!(out, json!({"segments": ["vip"]}));
    }

    #[tokio::test]
    async fn update_tree_ignores_model_conversation_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;
        let storage = Arc::new(StorageBackend::new_memory());
        storage
            .update_sync_metadata(&SyncMetadataUpdate {
                last_sync_at: Some(chrono::Utc::now()),
                ..SyncMetadataUpdate::default()
            })
            .await
            .unwrap();
        let validator = ValidatorClient::new(server.uri(), "t".into()).unwrap();

        let out = tools(&storage, Some(validator))
            .execute(UPDATE_TREE, json!({"conversationId": "spoofed", "tree": {"type": "segment"}}))
            .await
            .unwrap();
        assert_eq!(out["ok"], true);
        assert_eq!(out["conversationId"], "conv-1");
        assert!(storage.list_tree_versions("spoofed", 20).await.unwrap().is_empty());
        assert_eq!(storage.list_tree_versions("conv-1", 20).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failures_become_error_strings() {
        let storage = Arc::new(StorageBackend::new_memory());
        let t = tools(&storage, None);
        let err = t.execute(UPDATE_TREE, json!({"tree": {}})).await.unwrap_err();
        assert!(err.contains("BEARER_TOKEN"));
        assert!(t.execute(UPDATE_TREE, json!({})).await.is_err());
        assert_eq!(t.execute("drop_tables", json!({})).await.unwrap_err(), "Unknown tool: drop_tables");
    }
}
