//! Storage layer for treewright
//!
//! PostgreSQL persistence (sqlx) for conversations, chat history, tree
//! versions, and the mirrored segment/attribute catalog, plus an in-memory
//! backend with the same semantics.

mod backend;
pub mod error;
mod memory;
mod pg_migrations;
mod pg_storage;
pub mod traits;
mod types;

pub use backend::StorageBackend;
pub use error::StorageError;
pub use memory::MemoryStorage;
pub use pg_migrations::run_pg_migrations;
pub use pg_storage::PgStorage;
pub use types::AttributeOrder;
