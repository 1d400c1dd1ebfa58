//! Wires storage, clients, and services from a [`Config`].

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use treewright_core::EVENT_CHANNEL_CAPACITY;
use treewright_http::AppState;
use treewright_llm::{Agent, AnthropicClient};
use treewright_service::{
    CatalogService, ChatService, ConversationService, DirectoryClient, SyncService, TreeService,
    ValidatorClient,
};
use treewright_storage::StorageBackend;

use crate::config::Config;

pub(crate) struct Services {
    pub event_tx: broadcast::Sender<String>,
    pub conversations: Arc<ConversationService>,
    pub catalog: Arc<CatalogService>,
    pub sync: Arc<SyncService>,
    pub chat: Arc<ChatService>,
}

pub(crate) async fn open_storage(config: &Config, in_memory: bool) -> Result<Arc<StorageBackend>> {
    let storage = if in_memory {
        tracing::warn!("using in-memory storage, data is lost on exit");
        StorageBackend::new_memory()
    } else {
        let url = config
            .database_url
            .as_deref()
            .context("DATABASE_URL must be set (or pass --in-memory to serve)")?;
        StorageBackend::new_postgres(url).await.context("failed to open PostgreSQL")?
    };
    tracing::info!(backend = storage.kind(), "storage ready");
    Ok(Arc::new(storage))
}

impl Services {
    pub(crate) fn build(config: &Config, storage: Arc<StorageBackend>) -> Result<Self> {
        let (event_tx, _initial_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let llm = match config.anthropic_api_key.as_deref() {
            Some(key) => Some(Arc::new(AnthropicClient::new(key, config.model.clone())?)),
            None => {
                tracing::warn!("ANTHROPIC_API_KEY not set, chat and titles disabled");
                None
            },
        };

        let directory = match (config.api_base_url.as_deref(), config.bearer_token.as_deref()) {
            (Some(url), Some(token)) => Some(DirectoryClient::new(url, token.to_owned())?),
            _ => {
                tracing::warn!("API_BASE_URL or BEARER_TOKEN not set, sync disabled");
                None
            },
        };

        let validator = match config.validator_token() {
            Some(token) => Some(ValidatorClient::new(config.validator_url.clone(), token.to_owned())?),
            None => {
                tracing::warn!("no validator bearer token, tree updates disabled");
                None
            },
        };

        let conversations =
            Arc::new(ConversationService::new(Arc::clone(&storage), llm.clone()));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage)));
        let trees = Arc::new(TreeService::new(Arc::clone(&storage), validator));
        let sync = Arc::new(SyncService::new(Arc::clone(&storage), directory, event_tx.clone()));
        let chat = Arc::new(ChatService::new(
            llm.map(Agent::new),
            Arc::clone(&conversations),
            Arc::clone(&catalog),
            trees,
        ));

        Ok(Self { event_tx, conversations, catalog, sync, chat })
    }

    pub(crate) fn into_app_state(self) -> AppState {
        AppState {
            event_tx: self.event_tx,
            conversations: self.conversations,
            catalog: self.catalog,
            sync: self.sync,
            chat: self.chat,
        }
    }
}
