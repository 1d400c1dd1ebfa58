//! Request bodies (Deserialize).
//!
//! Bodies whose fields are all optional are parsed leniently: a missing
//! or malformed body behaves like `{}`.

use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub prompt_text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleRequest {
    #[serde(default)]
    pub prompt_text: Option<String>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaveMessagesRequest {
    #[serde(default)]
    pub messages: Option<Vec<serde_json::Value>>,
}

pub fn lenient<T: DeserializeOwned + Default>(body: &[u8]) -> T {
    if body.iter().all(u8::is_ascii_whitespace) {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "ignoring malformed request body");
        T::default()
    })
}
