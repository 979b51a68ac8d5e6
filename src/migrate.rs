use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the engine schema on an open pool. Idempotent.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // Stored fields, one row per identity key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS search_documents (
            key TEXT PRIMARY KEY,
            path TEXT NOT NULL,
            title TEXT NOT NULL,
            original_content TEXT NOT NULL,
            content TEXT NOT NULL,
            time INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // FTS5 CREATE is not idempotent natively, so we check first
    let fts_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='search_fts'",
    )
    .fetch_one(pool)
    .await?;

    if !fts_exists {
        sqlx::query(
            r#"
            CREATE VIRTUAL TABLE search_fts USING fts5(
                key UNINDEXED,
                title,
                path,
                original_content,
                content
            )
            "#,
        )
        .execute(pool)
        .await?;
    }

    // Point index on publication time for range queries
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_search_documents_time ON search_documents(time)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_search_documents_path ON search_documents(path)")
        .execute(pool)
        .await?;

    Ok(())
}
