use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::error::LlmError;
use crate::sse::{EventStream, parse_sse_stream};
use crate::types::{ApiErrorResponse, MessageRequest, MessageResponse};

/// Default Anthropic API host.
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
/// Default model identifier.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

const MAX_RETRIES: usize = 3;
const RETRY_DELAYS: [u64; 4] = [0, 1, 2, 4];
const COMPLETE_TIMEOUT_SECS: u64 = 60;

/// Client for the Anthropic Messages API.
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl AnthropicClient {
    /// Creates a client authenticated with `api_key`.
    ///
    /// # Errors
    /// Returns an error if the key is not a valid header value or the HTTP
    /// client cannot be built.
    pub fn new(api_key: &str, model: String) -> Result<Self, LlmError> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|e| LlmError::ClientInit(format!("invalid API key header value: {e}")))?;
        key.set_sensitive(true);
        headers.insert("x-api-key", key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        // No overall timeout: streamed agent turns can run for minutes.
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LlmError::ClientInit(e.to_string()))?;
        Ok(Self { client, base_url: DEFAULT_BASE_URL.to_owned(), model })
    }

    /// Point the client at another host (proxies, test servers).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a non-streaming request.
    ///
    /// # Errors
    /// Returns an error if every attempt fails, the API answers with a
    /// non-transient status, or the body cannot be parsed.
    pub async fn complete(&self, request: &MessageRequest) -> Result<MessageResponse, LlmError> {
        let mut req = request.clone();
        req.stream = false;
        let response = self.send_with_retry(&req, Some(COMPLETE_TIMEOUT_SECS)).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| LlmError::JsonParse {
            context: format!("messages response (body: {})", truncate(&body, 200)),
            source,
        })
    }

    /// Send a streaming request and return its event stream.
    ///
    /// Only opening the stream is retried; errors after the first byte
    /// surface as stream items.
    ///
    /// # Errors
    /// Same failure modes as [`Self::complete`] for the initial response.
    pub async fn stream(&self, request: &MessageRequest) -> Result<EventStream, LlmError> {
        let mut req = request.clone();
        req.stream = true;
        let response = self.send_with_retry(&req, None).await?;
        Ok(parse_sse_stream(response))
    }

    async fn send_with_retry(
        &self,
        request: &MessageRequest,
        timeout_secs: Option<u64>,
    ) -> Result<reqwest::Response, LlmError> {
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay_secs = RETRY_DELAYS.get(attempt).copied().unwrap_or(4);
                let delay = Duration::from_secs(delay_secs);
                tokio::time::sleep(delay).await;
                tracing::warn!("LLM retry attempt {attempt}/{MAX_RETRIES} after {delay:?}");
            }

            let mut builder =
                self.client.post(format!("{}/v1/messages", self.base_url)).json(request);
            if let Some(secs) = timeout_secs {
                builder = builder.timeout(Duration::from_secs(secs));
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::HttpRequest(e));
                    continue;
                },
            };

            let status = response.status();
            tracing::debug!(status = %status, attempt, stream = request.stream, "LLM response received");
            if status.is_success() {
                return Ok(response);
            }

            let body =
                response.text().await.unwrap_or_else(|_| "Could not read error body".to_owned());
            let body = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api) => format!("{}: {}", api.error.error_type, api.error.message),
                Err(_) => body,
            };
            let err = LlmError::HttpStatus { code: status.as_u16(), body };
            if err.is_transient() {
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(LlmError::RetriesExhausted(Box::new(last_error.unwrap_or(LlmError::EmptyResponse))))
    }
}

/// Truncates a string to the given maximum length at a char boundary.
#[must_use]
pub fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        s.get(..end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ApiMessage;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AnthropicClient {
        AnthropicClient::new("test-key", "test-model".to_owned()).unwrap().with_base_url(&server.uri())
    }

    fn request() -> MessageRequest {
        MessageRequest {
            model: "test-model".into(),
            messages: vec![ApiMessage::user_text("hello")],
            system: None,
            max_tokens: 30,
            stream: false,
            tools: Vec::new(),
        }
    }

    fn text_body(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "test-model",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 3, "output_tokens": 2}
        })
    }

    #[tokio::test]
    async fn sends_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({"stream": false, "max_tokens": 30})))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("hi")))
            .mount(&server)
            .await;

        let resp = client(&server).complete(&request()).await.unwrap();
        assert_eq!(resp.text(), "hi");
        assert_eq!(resp.usage.output_tokens, 2);
    }

    #[tokio::test]
    async fn retries_on_529_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body("after retry")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let resp = client(&server).complete(&request()).await.unwrap();
        assert_eq!(resp.text(), "after retry");
    }

    #[tokio::test]
    async fn bad_request_fails_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "bad model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).complete(&request()).await.unwrap_err();
        match err {
            LlmError::HttpStatus { code, body } => {
                assert_eq!(code, 400);
                assert_eq!(body, "invalid_request_error: bad model");
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "h");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
