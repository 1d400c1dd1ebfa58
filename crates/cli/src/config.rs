//! Environment-driven configuration.

use std::time::Duration;

use treewright_core::{DEFAULT_SYNC_INTERVAL_MS, env_parse_with_default};
use treewright_llm::DEFAULT_MODEL;
use treewright_service::DEFAULT_VALIDATOR_URL;

#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub database_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub model: String,
    pub api_base_url: Option<String>,
    pub bearer_token: Option<String>,
    pub validator_bearer_token: Option<String>,
    pub validator_url: String,
    pub sync_interval: Duration,
}

impl Config {
    pub(crate) fn from_env() -> Self {
        let sync_interval_ms = env_parse_with_default("SYNC_INTERVAL_MS", DEFAULT_SYNC_INTERVAL_MS);
        Self::from_lookup(|key| std::env::var(key).ok(), sync_interval_ms)
    }

    /// Blank values count as unset. A zero interval falls back to the default.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>, sync_interval_ms: u64) -> Self {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        Self {
            database_url: var("DATABASE_URL"),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            model: var("TREEWRIGHT_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            api_base_url: var("API_BASE_URL"),
            bearer_token: var("BEARER_TOKEN"),
            validator_bearer_token: var("VALIDATOR_BEARER_TOKEN"),
            validator_url: var("VALIDATOR_URL").unwrap_or_else(|| DEFAULT_VALIDATOR_URL.to_owned()),
            sync_interval: Duration::from_millis(if sync_interval_ms == 0 {
                DEFAULT_SYNC_INTERVAL_MS
            } else {
                sync_interval_ms
            }),
        }
    }

    /// `BEARER_TOKEN` wins over `VALIDATOR_BEARER_TOKEN`.
    pub(crate) fn validator_token(&self) -> Option<&str> {
        self.bearer_token.as_deref().or(self.validator_bearer_token.as_deref())
    }
}
