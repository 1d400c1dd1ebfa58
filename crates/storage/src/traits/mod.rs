//! Storage backend trait abstraction
//!
//! Async domain traits implemented by every backend, so services stay
//! backend-agnostic and tests can run against the in-memory store.

pub mod catalog;
pub mod conversation;

pub use catalog::{CatalogStore, SyncMetadataStore};
pub use conversation::{ConversationStore, MessageStore, TreeStore};
