use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use treewright_core::{
    Conversation, ConversationSummary, NewChatMessage, TREE_HISTORY_LIMIT, TreeVersion,
    message_role, message_text,
};
use treewright_llm::AnthropicClient;
use treewright_storage::{StorageBackend, StorageError};
use treewright_storage::traits::{ConversationStore, MessageStore, TreeStore};

use crate::error::ServiceError;

/// Current tree with its oldest-first version history.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationTree {
    pub tree: Option<Value>,
    pub versions: Vec<TreeVersion>,
}

pub struct ConversationService {
    storage: Arc<StorageBackend>,
    llm: Option<Arc<AnthropicClient>>,
}

impl ConversationService {
    #[must_use]
    pub const fn new(storage: Arc<StorageBackend>, llm: Option<Arc<AnthropicClient>>) -> Self {
        Self { storage, llm }
    }

    pub async fn list(&self) -> Result<Vec<ConversationSummary>, ServiceError> {
        Ok(self.storage.list_conversations().await?)
    }

    /// Create a conversation titled from `prompt_text` when an LLM is configured.
    pub async fn create(&self, prompt_text: &str) -> Result<Conversation, ServiceError> {
        let title = self.title_for(prompt_text).await;
        self.insert(title).await
    }

    /// Create an untitled conversation without calling the LLM.
    pub async fn quick_create(&self) -> Result<Conversation, ServiceError> {
        self.insert(None).await
    }

    async fn insert(&self, title: Option<String>) -> Result<Conversation, ServiceError> {
        let conversation = Conversation::new(uuid::Uuid::new_v4().to_string(), title);
        self.storage.create_conversation(&conversation).await?;
        tracing::info!(id = %conversation.id, titled = conversation.title.is_some(), "conversation created");
        Ok(conversation)
    }

    pub async fn get(&self, id: &str) -> Result<Conversation, ServiceError> {
        self.storage
            .get_conversation(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Conversation not found".to_owned()))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ServiceError> {
        Ok(self.storage.delete_conversation(id).await?)
    }

    /// Stored message payloads in insertion order.
    pub async fn messages(&self, id: &str) -> Result<Vec<Value>, ServiceError> {
        let rows = self.storage.list_messages(id).await?;
        Ok(rows.into_iter().map(|m| m.content).collect())
    }

    /// Replace the whole history. Every message needs a known `role`.
    pub async fn save_messages(&self, id: &str, messages: &[Value]) -> Result<usize, ServiceError> {
        let rows = messages
            .iter()
            .enumerate()
            .map(|(index, m)| {
                let role = message_role(m).ok_or_else(|| {
                    ServiceError::InvalidInput(format!("message {index} has a missing or invalid role"))
                })?;
                Ok(NewChatMessage { role, content: m.clone() })
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        match self.storage.replace_messages(id, &rows).await {
            Ok(count) => Ok(count),
            Err(StorageError::NotFound { .. }) => {
                Err(ServiceError::NotFound("Conversation not found".to_owned()))
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Return the existing title unless `force`, otherwise generate one from
    /// `prompt_text` or the latest stored user message.
    pub async fn generate_title(
        &self,
        id: &str,
        prompt_text: Option<&str>,
        force: bool,
    ) -> Result<Option<String>, ServiceError> {
        let conversation = self.get(id).await?;
        if conversation.title.is_some() && !force {
            return Ok(conversation.title);
        }

        let prompt = match prompt_text.filter(|p| !p.is_empty()) {
            Some(p) => p.to_owned(),
            None => self
                .storage
                .latest_user_message(id)
                .await?
                .and_then(|m| message_text(&m.content))
                .unwrap_or_default(),
        };

        let title = self.title_for(&prompt).await;
        self.storage.update_title(id, title.as_deref()).await?;
        Ok(title)
    }

    /// Store a title only when the conversation has none yet.
    pub async fn ensure_title(&self, conversation: &Conversation, prompt: &str) {
        if conversation.title.is_some() {
            return;
        }
        let Some(title) = self.title_for(prompt).await else {
            return;
        };
        if let Err(e) = self.storage.update_title(&conversation.id, Some(&title)).await {
            tracing::warn!(id = %conversation.id, error = %e, "failed to store title");
        }
    }

    /// Best-effort title; failures are logged and yield `None`.
    pub async fn title_for(&self, prompt: &str) -> Option<String> {
        let llm = self.llm.as_ref()?;
        match llm.generate_title(prompt).await {
            Ok(title) => title,
            Err(e) => {
                tracing::warn!(error = %e, "title generation failed");
                None
            },
        }
    }

    pub async fn tree(&self, id: &str) -> Result<ConversationTree, ServiceError> {
        let tree = self.storage.get_conversation(id).await?.and_then(|c| c.tree_state);
        let versions = self.storage.list_tree_versions(id, TREE_HISTORY_LIMIT).await?;
        Ok(ConversationTree { tree, versions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn svc() -> ConversationService {
        ConversationService::new(Arc::new(StorageBackend::new_memory()), None)
    }

    async fn llm_returning(title: &str) -> (MockServer, Arc<AnthropicClient>) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "test-model",
                "content": [{"type": "text", "text": title}],
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 5, "output_tokens": 3}
            })))
            .mount(&server)
            .await;
        let client = AnthropicClient::new("k", "test-model".into()).unwrap().with_base_url(&server.uri());
        (server, Arc::new(client))
    }

    #[tokio::test]
    async fn create_without_llm_is_untitled() {
        let svc = svc();
        let conv = svc.create("VIP users in France").await.unwrap();
        assert!(conv.title.is_none());
        assert_eq!(svc.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_and_read_back_messages() {
        let svc = svc();
        let conv = svc.quick_create().await.unwrap();
        let history = vec![
            json!({"role": "user", "parts": [{"type": "text", "text": "hi"}]}),
            json!({"role": "assistant", "content": "hello"}),
        ];
        assert_eq!(svc.save_messages(&conv.id, &history).await.unwrap(), 2);
        assert_eq!(svc.messages(&conv.id).await.unwrap(), history);

        svc.save_messages(&conv.id, &history[..1]).await.unwrap();
        assert_eq!(svc.messages(&conv.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_messages_rejects_bad_roles_and_unknown_ids() {
        let svc = svc();
        let conv = svc.quick_create().await.unwrap();
        let err = svc.save_messages(&conv.id, &[json!({"role": "wizard"})]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));

        let err = svc.save_messages("missing", &[]).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn existing_title_is_kept_unless_forced() {
        let (_server, llm) = llm_returning("French VIPs").await;
        let svc = ConversationService::new(Arc::new(StorageBackend::new_memory()), Some(llm));
        let conv = svc.quick_create().await.unwrap();
        svc.save_messages(&conv.id, &[json!({"role": "user", "content": "VIPs in France"})])
            .await
            .unwrap();

        let title = svc.generate_title(&conv.id, None, false).await.unwrap();
        assert_eq!(title.as_deref(), Some("French VIPs"));

        svc.storage.update_title(&conv.id, Some("Manual")).await.unwrap();
        let kept = svc.generate_title(&conv.id, None, false).await.unwrap();
        assert_eq!(kept.as_deref(), Some("Manual"));
        let forced = svc.generate_title(&conv.id, Some("anything"), true).await.unwrap();
        assert_eq!(forced.as_deref(), Some("French VIPs"));
    }

    #[tokio::test]
    async fn title_for_unknown_conversation_is_not_found() {
        assert!(svc().generate_title("nope", None, false).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn tree_of_fresh_conversation_is_empty() {
        let svc = svc();
        let conv = svc.quick_create().await.unwrap();
        let tree = svc.tree(&conv.id).await.unwrap();
        assert!(tree.tree.is_none());
        assert!(tree.versions.is_empty());
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let svc = svc();
        let conv = svc.quick_create().await.unwrap();
        assert!(svc.delete(&conv.id).await.unwrap());
        assert!(!svc.delete(&conv.id).await.unwrap());
        assert!(svc.get(&conv.id).await.unwrap_err().is_not_found());
    }
}
