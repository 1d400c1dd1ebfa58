use treewright_core::TITLE_PROMPT_MAX_CHARS;

use crate::client::AnthropicClient;
use crate::error::LlmError;
use crate::prompt::{TITLE_MAX_TOKENS, TITLE_SYSTEM_PROMPT};
use crate::types::{ApiMessage, MessageRequest};

impl AnthropicClient {
    /// Summarise the opening user request into a short title.
    ///
    /// Returns `Ok(None)` for empty prompts and empty model output.
    ///
    /// # Errors
    /// Propagates API failures; callers typically log and continue untitled.
    pub async fn generate_title(&self, prompt: &str) -> Result<Option<String>, LlmError> {
        let prompt: String = prompt.chars().take(TITLE_PROMPT_MAX_CHARS).collect();
        if prompt.trim().is_empty() {
            return Ok(None);
        }
        let request = MessageRequest {
            model: self.model().to_owned(),
            messages: vec![ApiMessage::user_text(prompt)],
            system: Some(TITLE_SYSTEM_PROMPT.to_owned()),
            max_tokens: TITLE_MAX_TOKENS,
            stream: false,
            tools: Vec::new(),
        };
        let response = self.complete(&request).await?;
        let title = response.text().trim().to_owned();
        Ok((!title.is_empty()).then_some(title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> serde_json::Value {
        json!({
            "id": "msg_t",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "m",
            "stop_reason": "end_turn"
        })
    }

    #[tokio::test]
    async fn trims_title_and_sends_budget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(json!({"max_tokens": 30, "system": TITLE_SYSTEM_PROMPT})))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("  US Premium Shoppers \n")))
            .mount(&server)
            .await;

        let client = AnthropicClient::new("k", "m".into()).unwrap().with_base_url(&server.uri());
        let title = client.generate_title("premium shoppers in the US").await.unwrap();
        assert_eq!(title.as_deref(), Some("US Premium Shoppers"));
    }

    #[tokio::test]
    async fn blank_output_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("   ")))
            .mount(&server)
            .await;

        let client = AnthropicClient::new("k", "m".into()).unwrap().with_base_url(&server.uri());
        assert_eq!(client.generate_title("anything").await.unwrap(), None);
        assert_eq!(client.generate_title("   ").await.unwrap(), None);
    }
}
