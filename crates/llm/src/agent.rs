//! Streaming tool-use loop.
//!
//! Each step streams one model response, forwarding text deltas to the
//! event sink while tool-use blocks are assembled from their partial JSON
//! fragments. A `tool_use` stop runs the requested tools in order, appends
//! their results as a user turn, and starts the next step.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use treewright_core::Suggestions;

use crate::client::AnthropicClient;
use crate::error::LlmError;
use crate::prompt::{AGENT_MAX_TOKENS, MAX_STEPS, SYSTEM_PROMPT};
use crate::sse::StreamEvent;
use crate::types::{
    ApiContent, ApiContentBlock, ApiMessage, ApiUsage, MessageRequest, ResponseContentBlock,
    SseDelta, ToolDefinition,
};

/// Events streamed to the chat client. Serialized with a kebab-case `type` tag.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AgentEvent {
    TextDelta {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    ToolCall {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    #[serde(rename_all = "camelCase")]
    ToolResult {
        tool_call_id: String,
        tool_name: String,
        output: Value,
        is_error: bool,
    },
    /// Sent after `finish`. `displayText` is the final reply without the
    /// suggestions block.
    #[serde(rename_all = "camelCase")]
    Suggestions {
        suggestions: Suggestions,
        display_text: String,
    },
    #[serde(rename_all = "camelCase")]
    Finish {
        finish_reason: String,
        steps: usize,
        usage: ApiUsage,
    },
    Error {
        message: String,
    },
}

/// Tools offered to the model.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Run a tool. `Err` is reported to the model as an `is_error` result.
    async fn execute(&self, name: &str, input: Value) -> Result<Value, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutcome {
    /// Text of the last step that produced any.
    pub text: String,
    pub steps: usize,
    pub finish_reason: String,
    pub usage: ApiUsage,
}

#[derive(Debug, Clone)]
pub struct Agent {
    client: Arc<AnthropicClient>,
    system: String,
    max_steps: usize,
    max_tokens: u32,
}

impl Agent {
    #[must_use]
    pub fn new(client: Arc<AnthropicClient>) -> Self {
        Self {
            client,
            system: SYSTEM_PROMPT.to_owned(),
            max_steps: MAX_STEPS,
            max_tokens: AGENT_MAX_TOKENS,
        }
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Run the loop to completion, emitting a closing `finish` or `error` event.
    ///
    /// Stops early with finish reason `cancelled` once the receiver is gone.
    ///
    /// # Errors
    /// Returns the first model or stream failure.
    pub async fn run(
        &self,
        messages: Vec<ApiMessage>,
        tools: &dyn ToolExecutor,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Result<AgentOutcome, LlmError> {
        match self.run_steps(messages, tools, events).await {
            Ok(outcome) => {
                emit(
                    events,
                    AgentEvent::Finish {
                        finish_reason: outcome.finish_reason.clone(),
                        steps: outcome.steps,
                        usage: outcome.usage,
                    },
                )
                .await;
                Ok(outcome)
            },
            Err(e) => {
                tracing::warn!(error = %e, "agent run failed");
                emit(events, AgentEvent::Error { message: e.to_string() }).await;
                Err(e)
            },
        }
    }

    async fn run_steps(
        &self,
        mut messages: Vec<ApiMessage>,
        tools: &dyn ToolExecutor,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Result<AgentOutcome, LlmError> {
        let definitions = tools.definitions();
        let mut usage = ApiUsage::default();
        let mut last_text = String::new();

        for step in 1..=self.max_steps {
            let request = MessageRequest {
                model: self.client.model().to_owned(),
                messages: messages.clone(),
                system: Some(self.system.clone()),
                max_tokens: self.max_tokens,
                stream: true,
                tools: definitions.clone(),
            };
            let mut stream = self.client.stream(&request).await?;
            let mut state = StepState::default();
            while let Some(event) = stream.next().await {
                if let Some(text) = state.apply(event?)? {
                    if !emit(events, AgentEvent::TextDelta { text }).await {
                        return Ok(outcome(last_text, step, "cancelled", usage));
                    }
                }
            }

            let result = state.finish()?;
            usage.input_tokens = usage.input_tokens.saturating_add(result.usage.input_tokens);
            usage.output_tokens = usage.output_tokens.saturating_add(result.usage.output_tokens);
            if !result.text.is_empty() {
                last_text.clone_from(&result.text);
            }
            let stop_reason = result.stop_reason.unwrap_or_else(|| "end_turn".to_owned());
            tracing::debug!(step, %stop_reason, tool_calls = result.tool_uses.len(), "agent step finished");

            if stop_reason != "tool_use" || result.tool_uses.is_empty() {
                return Ok(outcome(last_text, step, &stop_reason, usage));
            }

            messages.push(ApiMessage {
                role: "assistant".to_owned(),
                content: ApiContent::Blocks(result.content),
            });

            let mut tool_results = Vec::with_capacity(result.tool_uses.len());
            for call in result.tool_uses {
                let open = emit(
                    events,
                    AgentEvent::ToolCall {
                        tool_call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        input: call.input.clone(),
                    },
                )
                .await;
                if !open {
                    return Ok(outcome(last_text, step, "cancelled", usage));
                }

                let (output, is_error) = match tools.execute(&call.name, call.input).await {
                    Ok(value) => (value, false),
                    Err(message) => {
                        tracing::warn!(tool = %call.name, error = %message, "tool call failed");
                        (Value::String(message), true)
                    },
                };
                let content = match &output {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                emit(
                    events,
                    AgentEvent::ToolResult {
                        tool_call_id: call.id.clone(),
                        tool_name: call.name,
                        output,
                        is_error,
                    },
                )
                .await;
                tool_results.push(ApiContentBlock::ToolResult {
                    tool_use_id: call.id,
                    content,
                    is_error,
                });
            }
            messages.push(ApiMessage {
                role: "user".to_owned(),
                content: ApiContent::Blocks(tool_results),
            });
        }

        Ok(outcome(last_text, self.max_steps, "max_steps", usage))
    }
}

fn outcome(text: String, steps: usize, finish_reason: &str, usage: ApiUsage) -> AgentOutcome {
    AgentOutcome { text, steps, finish_reason: finish_reason.to_owned(), usage }
}

/// Send an event; `false` once the receiver has been dropped.
async fn emit(events: &mpsc::Sender<AgentEvent>, event: AgentEvent) -> bool {
    events.send(event).await.is_ok()
}

#[derive(Debug)]
enum PendingBlock {
    Text(String),
    ToolUse { id: String, name: String, initial: Value, json: String },
}

#[derive(Debug, Clone, PartialEq)]
struct ToolUse {
    id: String,
    name: String,
    input: Value,
}

#[derive(Debug)]
struct StepResult {
    content: Vec<ApiContentBlock>,
    tool_uses: Vec<ToolUse>,
    text: String,
    stop_reason: Option<String>,
    usage: ApiUsage,
}

/// Accumulates one streamed response, keyed by content block index.
#[derive(Debug, Default)]
struct StepState {
    blocks: BTreeMap<usize, PendingBlock>,
    stop_reason: Option<String>,
    usage: ApiUsage,
}

impl StepState {
    /// Fold one event in, returning any text to forward.
    fn apply(&mut self, event: StreamEvent) -> Result<Option<String>, LlmError> {
        match event {
            StreamEvent::MessageStart(start) => {
                self.usage.input_tokens = start.message.usage.input_tokens;
            },
            StreamEvent::ContentBlockStart(start) => match start.content_block {
                ResponseContentBlock::Text { text } => {
                    self.blocks.insert(start.index, PendingBlock::Text(text.clone()));
                    return Ok((!text.is_empty()).then_some(text));
                },
                ResponseContentBlock::ToolUse { id, name, input } => {
                    self.blocks.insert(
                        start.index,
                        PendingBlock::ToolUse { id, name, initial: input, json: String::new() },
                    );
                },
                ResponseContentBlock::Unsupported => {},
            },
            StreamEvent::ContentBlockDelta(delta) => match delta.delta {
                SseDelta::TextDelta { text } => {
                    let block = self
                        .blocks
                        .entry(delta.index)
                        .or_insert_with(|| PendingBlock::Text(String::new()));
                    if let PendingBlock::Text(buf) = block {
                        buf.push_str(&text);
                    }
                    return Ok(Some(text));
                },
                SseDelta::InputJsonDelta { partial_json } => {
                    if let Some(PendingBlock::ToolUse { json, .. }) = self.blocks.get_mut(&delta.index) {
                        json.push_str(&partial_json);
                    }
                },
                SseDelta::Other => {},
            },
            StreamEvent::MessageDelta(delta) => {
                if delta.delta.stop_reason.is_some() {
                    self.stop_reason = delta.delta.stop_reason;
                }
                if let Some(u) = delta.usage {
                    self.usage.output_tokens = u.output_tokens;
                }
            },
            StreamEvent::Error(err) => {
                return Err(LlmError::Api {
                    error_type: err.error.error_type,
                    message: err.error.message,
                });
            },
            StreamEvent::ContentBlockStop(_) | StreamEvent::MessageStop | StreamEvent::Ping => {},
        }
        Ok(None)
    }

    fn finish(self) -> Result<StepResult, LlmError> {
        let mut content = Vec::with_capacity(self.blocks.len());
        let mut tool_uses = Vec::new();
        let mut text = String::new();
        for block in self.blocks.into_values() {
            match block {
                PendingBlock::Text(t) => {
                    if t.is_empty() {
                        continue;
                    }
                    text.push_str(&t);
                    content.push(ApiContentBlock::Text { text: t });
                },
                PendingBlock::ToolUse { id, name, initial, json } => {
                    let input = if json.trim().is_empty() {
                        initial
                    } else {
                        serde_json::from_str(&json).map_err(|source| LlmError::JsonParse {
                            context: format!("input of tool call {name}"),
                            source,
                        })?
                    };
                    content.push(ApiContentBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    });
                    tool_uses.push(ToolUse { id, name, input });
                },
            }
        }
        Ok(StepResult { content, tool_uses, text, stop_reason: self.stop_reason, usage: self.usage })
    }
}
