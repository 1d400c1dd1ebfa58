//! In-process storage backend.
//!
//! Mirrors the PostgreSQL semantics (cascading deletes, append-only tree
//! versions, singleton sync metadata) behind one `RwLock`, for tests and
//! `--in-memory` runs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use treewright_core::{
    Attribute, AttributeInput, ChatMessage, Conversation, ConversationSummary, MessageRole,
    NewChatMessage, Segment, SyncMetadata, SyncMetadataUpdate, TreeVersion,
};

use crate::error::StorageError;
use crate::traits::{CatalogStore, ConversationStore, MessageStore, SyncMetadataStore, TreeStore};
use crate::types::AttributeOrder;

#[derive(Debug, Default)]
struct Inner {
    conversations: HashMap<String, Conversation>,
    messages: HashMap<String, Vec<ChatMessage>>,
    tree_versions: HashMap<String, Vec<TreeVersion>>,
    segments: BTreeMap<String, Segment>,
    attributes: BTreeMap<String, Attribute>,
    sync_metadata: Option<SyncMetadata>,
    next_message_id: i64,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStorage {
    async fn create_conversation(&self, conversation: &Conversation) -> Result<(), StorageError> {
        let mut inner = self.inner.write().await;
        if inner.conversations.contains_key(&conversation.id) {
            return Err(StorageError::Duplicate(format!("conversation {}", conversation.id)));
        }
        inner.conversations.insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        Ok(self.inner.read().await.conversations.get(id).cloned())
    }

    async fn list_conversations(&self) -> Result<Vec<ConversationSummary>, StorageError> {
        let inner = self.inner.read().await;
        let mut list: Vec<ConversationSummary> =
            inner.conversations.values().map(Conversation::summary).collect();
        list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(list)
    }

    async fn update_title(&self, id: &str, title: Option<&str>) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().await;
        let Some(conv) = inner.conversations.get_mut(id) else {
            return Ok(false);
        };
        conv.title = title.map(str::to_owned);
        conv.updated_at = Utc::now();
        Ok(true)
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, StorageError> {
        let mut inner = self.inner.write().await;
        let removed = inner.conversations.remove(id).is_some();
        inner.messages.remove(id);
        inner.tree_versions.remove(id);
        Ok(removed)
    }
}

#[async_trait]
impl MessageStore for MemoryStorage {
    async fn replace_messages(
        &self,
        conversation_id: &str,
        messages: &[NewChatMessage],
    ) -> Result<usize, StorageError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let Some(conv) = inner.conversations.get_mut(conversation_id) else {
            return Err(StorageError::not_found("conversation", conversation_id));
        };
        conv.updated_at = now;

        let mut stored = Vec::with_capacity(messages.len());
        for message in messages {
            inner.next_message_id = inner.next_message_id.saturating_add(1);
            stored.push(ChatMessage {
                id: inner.next_message_id,
                conversation_id: conversation_id.to_owned(),
                role: message.role,
                content: message.content.clone(),
                created_at: now,
            });
        }
        inner.messages.insert(conversation_id.to_owned(), stored);
        Ok(messages.len())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, StorageError> {
        Ok(self.inner.read().await.messages.get(conversation_id).cloned().unwrap_or_default())
    }

    async fn latest_user_message(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ChatMessage>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .get(conversation_id)
            .and_then(|msgs| msgs.iter().rev().find(|m| m.role == MessageRole::User))
            .cloned())
    }
}

#[async_trait]
impl TreeStore for MemoryStorage {
    async fn record_tree_version(
        &self,
        conversation_id: &str,
        tree: &Value,
        validation_output: Option<&Value>,
    ) -> Result<TreeVersion, StorageError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let conv = inner
            .conversations
            .entry(conversation_id.to_owned())
            .or_insert_with(|| Conversation::new(conversation_id.to_owned(), None));
        conv.tree_state = Some(tree.clone());
        conv.updated_at = now;

        let versions = inner.tree_versions.entry(conversation_id.to_owned()).or_default();
        let version = i32::try_from(versions.len().saturating_add(1)).map_err(|e| {
            StorageError::DataCorruption {
                context: "tree version exceeds i32::MAX".into(),
                source: Box::new(e),
            }
        })?;
        let recorded = TreeVersion {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_owned(),
            version,
            tree_state: tree.clone(),
            validation_output: validation_output.cloned(),
            is_valid: true,
            validated_at: now,
        };
        versions.push(recorded.clone());
        Ok(recorded)
    }

    async fn list_tree_versions(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<TreeVersion>, StorageError> {
        let inner = self.inner.read().await;
        Ok(inner
            .tree_versions
            .get(conversation_id)
            .map(|v| v.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CatalogStore for MemoryStorage {
    async fn upsert_segments(&self, names: &[String]) -> Result<usize, StorageError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        for name in names {
            inner.segments.insert(name.clone(), Segment { name: name.clone(), updated_at: now });
        }
        Ok(distinct_count(names))
    }

    async fn list_segments(&self) -> Result<Vec<Segment>, StorageError> {
        Ok(self.inner.read().await.segments.values().cloned().collect())
    }

    async fn count_segments(&self) -> Result<i64, StorageError> {
        Ok(i64::try_from(self.inner.read().await.segments.len()).unwrap_or(i64::MAX))
    }

    async fn upsert_attributes(&self, attributes: &[AttributeInput]) -> Result<usize, StorageError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        for attr in attributes {
            inner.attributes.insert(attr.id.clone(), attr.clone().into_attribute(now));
        }
        Ok(attributes.len())
    }

    async fn list_attributes(&self, order: AttributeOrder) -> Result<Vec<Attribute>, StorageError> {
        let mut list: Vec<Attribute> =
            self.inner.read().await.attributes.values().cloned().collect();
        if order == AttributeOrder::Name {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(list)
    }

    async fn count_attributes(&self) -> Result<i64, StorageError> {
        Ok(i64::try_from(self.inner.read().await.attributes.len()).unwrap_or(i64::MAX))
    }
}

#[async_trait]
impl SyncMetadataStore for MemoryStorage {
    async fn get_or_create_sync_metadata(&self) -> Result<SyncMetadata, StorageError> {
        let mut inner = self.inner.write().await;
        Ok(inner.sync_metadata.get_or_insert_with(SyncMetadata::default).clone())
    }

    async fn update_sync_metadata(
        &self,
        update: &SyncMetadataUpdate,
    ) -> Result<SyncMetadata, StorageError> {
        let mut inner = self.inner.write().await;
        let meta = inner.sync_metadata.get_or_insert_with(SyncMetadata::default);
        meta.apply(update);
        Ok(meta.clone())
    }
}

fn distinct_count(names: &[String]) -> usize {
    names.iter().collect::<BTreeSet<_>>().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(text: &str) -> NewChatMessage {
        NewChatMessage { role: MessageRole::User, content: json!({"role": "user", "content": text}) }
    }

    fn assistant(text: &str) -> NewChatMessage {
        NewChatMessage {
            role: MessageRole::Assistant,
            content: json!({"role": "assistant", "content": text}),
        }
    }

    #[tokio::test]
    async fn duplicate_conversation_is_rejected() {
        let store = MemoryStorage::new();
        let conv = Conversation::new("c1".into(), None);
        store.create_conversation(&conv).await.unwrap();
        let err = store.create_conversation(&conv).await.unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn replace_messages_overwrites_history() {
        let store = MemoryStorage::new();
        store.create_conversation(&Conversation::new("c1".into(), None)).await.unwrap();

        store.replace_messages("c1", &[user("a"), assistant("b"), user("c")]).await.unwrap();
        store.replace_messages("c1", &[user("only")]).await.unwrap();

        let msgs = store.list_messages("c1").await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].content["content"], "only");
    }

    #[tokio::test]
    async fn replace_messages_requires_conversation() {
        let store = MemoryStorage::new();
        let err = store.replace_messages("missing", &[user("x")]).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { entity: "conversation", .. }));
    }

    #[tokio::test]
    async fn latest_user_message_skips_assistant() {
        let store = MemoryStorage::new();
        store.create_conversation(&Conversation::new("c1".into(), None)).await.unwrap();
        store.replace_messages("c1", &[user("first"), user("second"), assistant("reply")]).await.unwrap();

        let latest = store.latest_user_message("c1").await.unwrap().unwrap();
        assert_eq!(latest.content["content"], "second");
    }

    #[tokio::test]
    async fn tree_versions_are_sequential_and_create_conversation() {
        let store = MemoryStorage::new();
        let first = store.record_tree_version("fresh", &json!({"v": 1}), None).await.unwrap();
        let second = store
            .record_tree_version("fresh", &json!({"v": 2}), Some(&json!({"ok": true})))
            .await
            .unwrap();
        assert_eq!(first.version, 1);
        assert_eq!(second.version, 2);

        let conv = store.get_conversation("fresh").await.unwrap().unwrap();
        assert_eq!(conv.tree_state, Some(json!({"v": 2})));

        let versions = store.list_tree_versions("fresh", 20).await.unwrap();
        assert_eq!(versions.iter().map(|v| v.version).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(store.list_tree_versions("fresh", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_cascades() {
        let store = MemoryStorage::new();
        store.create_conversation(&Conversation::new("c1".into(), None)).await.unwrap();
        store.replace_messages("c1", &[user("a")]).await.unwrap();
        store.record_tree_version("c1", &json!({}), None).await.unwrap();

        assert!(store.delete_conversation("c1").await.unwrap());
        assert!(!store.delete_conversation("c1").await.unwrap());
        assert!(store.list_messages("c1").await.unwrap().is_empty());
        assert!(store.list_tree_versions("c1", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn segments_dedupe_and_sort() {
        let store = MemoryStorage::new();
        let written = store
            .upsert_segments(&["vip".into(), "churned".into(), "vip".into()])
            .await
            .unwrap();
        assert_eq!(written, 2);
        let names: Vec<String> =
            store.list_segments().await.unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["churned", "vip"]);
        assert_eq!(store.count_segments().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn attributes_order_by_name_or_id() {
        let store = MemoryStorage::new();
        let input = |id: &str, name: &str| AttributeInput {
            id: id.into(),
            name: name.into(),
            attr_type: "string".into(),
            ops: vec!["==".into()],
            description: None,
            enum_values: None,
            min: None,
            max: None,
            item_type: None,
            schema: None,
        };
        store.upsert_attributes(&[input("a2", "Alpha"), input("a1", "Zulu")]).await.unwrap();

        let by_id = store.list_attributes(AttributeOrder::Id).await.unwrap();
        assert_eq!(by_id[0].id, "a1");
        let by_name = store.list_attributes(AttributeOrder::Name).await.unwrap();
        assert_eq!(by_name[0].name, "Alpha");
    }

    #[tokio::test]
    async fn sync_metadata_starts_initial_and_merges_updates() {
        let store = MemoryStorage::new();
        assert!(store.get_or_create_sync_metadata().await.unwrap().is_initial_sync);

        let updated = store
            .update_sync_metadata(&SyncMetadataUpdate {
                is_initial_sync: Some(false),
                total_users: Some(9),
                ..SyncMetadataUpdate::default()
            })
            .await
            .unwrap();
        assert!(!updated.is_initial_sync);
        assert_eq!(updated.total_users, Some(9));
        assert_eq!(store.get_or_create_sync_metadata().await.unwrap(), updated);
    }
}
