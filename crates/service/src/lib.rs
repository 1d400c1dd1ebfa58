//! Service layer for treewright
//!
//! Business logic between the HTTP handlers and storage, the LLM, and the
//! remote directory and validator APIs.

#![allow(missing_docs, reason = "Internal crate with self-explanatory API")]
#![allow(clippy::missing_errors_doc, reason = "Errors are self-explanatory from Result types")]
#![allow(missing_debug_implementations, reason = "Internal types")]
#![allow(clippy::missing_docs_in_private_items, reason = "Internal crate")]
#![allow(clippy::implicit_return, reason = "Implicit return is idiomatic Rust")]
#![allow(clippy::question_mark_used, reason = "? operator is idiomatic Rust")]
#![allow(clippy::min_ident_chars, reason = "Short error vars are idiomatic")]

mod agent_tools;
mod catalog_service;
mod chat_service;
mod conversation_service;
mod directory_client;
pub mod error;
mod sync_service;
mod tree_service;
mod validator_client;

pub use agent_tools::{AgentTools, GET_ATTRIBUTES, GET_SEGMENTS, UPDATE_TREE};
pub use catalog_service::CatalogService;
pub use chat_service::{ChatService, ChatSession};
pub use conversation_service::{ConversationService, ConversationTree};
pub use directory_client::{DirectoryClient, UsersMeta, UsersPage};
pub use error::{RemoteError, ServiceError};
pub use sync_service::{ServerEvent, SyncService, page_offsets};
pub use tree_service::{TreeOutcome, TreeService};
pub use validator_client::{DEFAULT_VALIDATOR_URL, Validation, ValidatorClient};
