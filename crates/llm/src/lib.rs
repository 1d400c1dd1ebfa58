//! Anthropic Messages API integration: HTTP client with retry, SSE stream
//! parsing, the streaming tool-use agent loop, and title generation.

mod agent;
mod client;
mod convert;
pub mod error;
mod prompt;
mod sse;
mod title;
pub mod types;

pub use agent::{Agent, AgentEvent, AgentOutcome, ToolExecutor};
pub use client::{ANTHROPIC_VERSION, AnthropicClient, DEFAULT_BASE_URL, DEFAULT_MODEL, truncate};
pub use convert::to_api_messages;
pub use error::LlmError;
pub use prompt::{MAX_STEPS, SYSTEM_PROMPT, TITLE_SYSTEM_PROMPT};
pub use sse::{EventStream, StreamEvent};
pub use types::{ApiMessage, ToolDefinition};
