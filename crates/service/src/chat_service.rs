//! Chat turns: request validation, title bootstrap, and the agent run.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use treewright_core::{
    Conversation, MessageRole, message_role, message_text, parse_suggestions, strip_suggestions,
};
use treewright_llm::{Agent, AgentEvent, AgentOutcome, ApiMessage, to_api_messages};

use crate::agent_tools::AgentTools;
use crate::catalog_service::CatalogService;
use crate::conversation_service::ConversationService;
use crate::error::ServiceError;
use crate::tree_service::TreeService;

/// A validated chat request, ready to stream.
#[derive(Debug)]
pub struct ChatSession {
    pub conversation_id: String,
    messages: Vec<ApiMessage>,
}

pub struct ChatService {
    agent: Option<Agent>,
    conversations: Arc<ConversationService>,
    catalog: Arc<CatalogService>,
    trees: Arc<TreeService>,
}

impl ChatService {
    #[must_use]
    pub const fn new(
        agent: Option<Agent>,
        conversations: Arc<ConversationService>,
        catalog: Arc<CatalogService>,
        trees: Arc<TreeService>,
    ) -> Self {
        Self { agent, conversations, catalog, trees }
    }

    /// Validate a chat request body (`{conversationId | id, messages}`).
    ///
    /// Titles an untitled conversation from its latest user message before
    /// the model is called.
    pub async fn start(&self, body: &Value) -> Result<ChatSession, ServiceError> {
        let conversation_id = ["conversationId", "id"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str).filter(|id| !id.is_empty()))
            .ok_or_else(|| ServiceError::InvalidInput("conversationId is required".to_owned()))?
            .to_owned();
        let messages = body
            .get("messages")
            .and_then(Value::as_array)
            .ok_or_else(|| ServiceError::InvalidInput("Messages array is required".to_owned()))?;

        let conversation = self.conversations.get(&conversation_id).await.map_err(|e| {
            if e.is_not_found() {
                ServiceError::NotFound(
                    "Conversation not found. Please create a conversation first.".to_owned(),
                )
            } else {
                e
            }
        })?;

        if self.agent.is_none() {
            return Err(ServiceError::NotConfigured(
                "LLM provider (set ANTHROPIC_API_KEY)".to_owned(),
            ));
        }

        self.bootstrap_title(&conversation, messages).await;

        let api_messages = to_api_messages(messages);
        if api_messages.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Messages must include at least one user message with text".to_owned(),
            ));
        }
        Ok(ChatSession { conversation_id, messages: api_messages })
    }

    /// Run the agent, then publish any suggestions found in its final text.
    pub async fn stream(
        &self,
        session: ChatSession,
        events: mpsc::Sender<AgentEvent>,
    ) -> Result<AgentOutcome, ServiceError> {
        let agent = self.agent.as_ref().ok_or_else(|| {
            ServiceError::NotConfigured("LLM provider (set ANTHROPIC_API_KEY)".to_owned())
        })?;
        let tools = AgentTools::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.trees),
            session.conversation_id.clone(),
        );

        let outcome = agent.run(session.messages, &tools, &events).await?;
        if let Some(suggestions) = parse_suggestions(&outcome.text) {
            let display_text = strip_suggestions(&outcome.text);
            if events.send(AgentEvent::Suggestions { suggestions, display_text }).await.is_err() {
                tracing::debug!("chat client disconnected before suggestions");
            }
        }
        tracing::info!(
            conversation_id = %session.conversation_id,
            steps = outcome.steps,
            finish_reason = %outcome.finish_reason,
            "chat turn finished"
        );
        Ok(outcome)
    }

    async fn bootstrap_title(&self, conversation: &Conversation, messages: &[Value]) {
        if conversation.title.is_some() {
            return;
        }
        let Some(last) = messages.last() else {
            return;
        };
        if message_role(last) != Some(MessageRole::User) {
            return;
        }
        let prompt = message_text(last).unwrap_or_default();
        self.conversations.ensure_title(conversation, &prompt).await;
    }
}
