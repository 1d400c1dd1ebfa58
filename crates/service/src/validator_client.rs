//! Client for the external tree validator.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::directory_client::format_since;
use crate::error::RemoteError;

pub const DEFAULT_VALIDATOR_URL: &str =
    "https://dt-agent-support.divyanshgolyan.workers.dev/v1/validate";

const SERVICE: &str = "validator";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Parsed validator verdict. `body` keeps the full response.
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    pub ok: bool,
    pub errors: Vec<Value>,
    pub warnings: Vec<Value>,
    pub output: Option<Value>,
    pub body: Value,
}

impl Validation {
    fn from_body(body: Value) -> Self {
        let list = |key: &str| body.get(key).and_then(Value::as_array).cloned().unwrap_or_default();
        Self {
            ok: body.get("ok").and_then(Value::as_bool).unwrap_or(false),
            errors: list("errors"),
            warnings: list("warnings"),
            output: body.get("output").filter(|v| !v.is_null()).cloned(),
            body,
        }
    }
}

#[derive(Clone)]
pub struct ValidatorClient {
    client: reqwest::Client,
    url: String,
    bearer_token: String,
}

impl std::fmt::Debug for ValidatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorClient").field("url", &self.url).finish_non_exhaustive()
    }
}

impl ValidatorClient {
    pub fn new(url: String, bearer_token: String) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RemoteError::ClientInit(e.to_string()))?;
        Ok(Self { client, url, bearer_token })
    }

    /// Validate `tree` against the segment cache as of `segments_cache_timestamp`.
    pub async fn validate(
        &self,
        tree: &Value,
        segments_cache_timestamp: DateTime<Utc>,
    ) -> Result<Validation, RemoteError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.bearer_token)
            .json(&json!({
                "tree": tree,
                "segments_cache_timestamp": format_since(segments_cache_timestamp),
            }))
            .send()
            .await
            .map_err(|source| RemoteError::Http { service: SERVICE, source })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| RemoteError::Http { service: SERVICE, source })?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if !status.is_success() {
            let message =
                body.get("message").and_then(Value::as_str).unwrap_or("unknown error").to_owned();
            return Err(RemoteError::HttpStatus { service: SERVICE, code: status.as_u16(), message });
        }
        if !body.is_object() {
            return Err(RemoteError::InvalidResponse {
                service: SERVICE,
                message: "expected a JSON object".to_owned(),
            });
        }
        Ok(Validation::from_body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    #[tokio::test]
    async fn posts_tree_with_cache_timestamp() {
        let server = MockServer::start().await;
        let tree = json!({"type": "segment", "key": "vip"});
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer vt"))
            .and(body_json(json!({
                "tree": tree,
                "segments_cache_timestamp": "2025-01-02T03:04:05.000Z"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true, "output": {"normalized": true}
            })))
            .mount(&server)
            .await;

        let client = ValidatorClient::new(server.uri(), "vt".into()).unwrap();
        let verdict = client.validate(&tree, at()).await.unwrap();
        assert!(verdict.ok);
        assert_eq!(verdict.output, Some(json!({"normalized": true})));
        assert!(verdict.errors.is_empty());
    }

    #[tokio::test]
    async fn rejection_keeps_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": false, "errors": [{"path": "$.key", "message": "unknown segment"}]
            })))
            .mount(&server)
            .await;

        let client = ValidatorClient::new(server.uri(), "vt".into()).unwrap();
        let verdict = client.validate(&json!({}), at()).await.unwrap();
        assert!(!verdict.ok);
        assert_eq!(verdict.errors.len(), 1);
        assert!(verdict.warnings.is_empty());
    }

    #[tokio::test]
    async fn http_failure_surfaces_body_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "bad token"})))
            .mount(&server)
            .await;

        let client = ValidatorClient::new(server.uri(), "vt".into()).unwrap();
        match client.validate(&json!({}), at()).await.unwrap_err() {
            RemoteError::HttpStatus { code, message, .. } => {
                assert_eq!(code, 403);
                assert_eq!(message, "bad token");
            },
            other => panic!("unexpected error: {other}"),
        }
    }
}
