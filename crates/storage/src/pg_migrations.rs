//! PostgreSQL schema migrations for treewright storage.

use anyhow::Result;
use sqlx::PgPool;

/// Run all PostgreSQL migrations. Every statement is idempotent.
pub async fn run_pg_migrations(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            id TEXT PRIMARY KEY,
            title TEXT,
            tree_state JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_conv_updated ON conversations (updated_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chat_messages (
            id BIGSERIAL PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations (id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            content JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_msg_conv_created ON chat_messages (conversation_id, created_at, id)",
    )
    .execute(pool)
    .await?;

    // Versions are append-only; the unique index turns a concurrent
    // count-then-insert race into a duplicate error.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tree_versions (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL REFERENCES conversations (id) ON DELETE CASCADE,
            version INTEGER NOT NULL,
            tree_state JSONB NOT NULL,
            validation_output JSONB,
            is_valid BOOLEAN NOT NULL DEFAULT FALSE,
            validated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_tree_conv_version ON tree_versions (conversation_id, version)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS segments (
            name TEXT PRIMARY KEY,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS attributes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            attr_type TEXT NOT NULL,
            ops JSONB NOT NULL DEFAULT '[]',
            description TEXT,
            enum_values JSONB,
            min DOUBLE PRECISION,
            max DOUBLE PRECISION,
            item_type TEXT,
            schema JSONB,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_attr_name ON attributes (name)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_metadata (
            id TEXT PRIMARY KEY,
            last_sync_at TIMESTAMPTZ,
            is_initial_sync BOOLEAN NOT NULL DEFAULT TRUE,
            max_page_size BIGINT,
            total_users BIGINT,
            total_segments BIGINT,
            total_attributes BIGINT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::debug!("PostgreSQL migrations applied");
    Ok(())
}
