//! Shared constants for treewright.

/// PostgreSQL connection pool: maximum connections.
pub const PG_POOL_MAX_CONNECTIONS: u32 = 20;

/// PostgreSQL connection pool: acquire timeout in seconds.
pub const PG_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// PostgreSQL connection pool: idle timeout in seconds.
pub const PG_POOL_IDLE_TIMEOUT_SECS: u64 = 300;

/// Primary key of the single sync metadata row.
pub const SYNC_METADATA_ID: &str = "singleton";

/// Number of tree versions returned alongside the current tree.
pub const TREE_HISTORY_LIMIT: usize = 20;

/// Title generation only looks at this many characters of the prompt.
pub const TITLE_PROMPT_MAX_CHARS: usize = 500;

/// Default interval between scheduled syncs (one hour).
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 60 * 60 * 1000;

/// Capacity of the broadcast channel carrying sync progress events.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;
