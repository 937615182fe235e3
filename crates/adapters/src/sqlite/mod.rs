//! SQLite persistence for the ledger and stored configuration
//!
//! One pool serves both stores. Timestamps are stored as UTC RFC 3339 text
//! at second precision so string comparison matches chronological order.

mod config;
mod ledger;

pub use config::SqliteConfigStore;
pub use ledger::SqliteLedger;

use autopromo_domain::LedgerError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Open the database at `path`, creating file and schema if needed
pub async fn connect(path: impl AsRef<Path>) -> Result<SqlitePool, LedgerError> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| LedgerError::Database(format!("Failed to create directory: {}", e)))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

    migrate(&pool).await?;

    Ok(pool)
}

/// In-memory database (for testing)
pub async fn connect_in_memory() -> Result<SqlitePool, LedgerError> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| LedgerError::Database(e.to_string()))?
        .foreign_keys(true);

    // A single connection keeps the shared in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

    migrate(&pool).await?;

    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            marketplace_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            description TEXT,
            price TEXT,
            image_url TEXT,
            product_url TEXT NOT NULL,
            affiliate_url TEXT NOT NULL,
            rating REAL,
            reviews_count INTEGER,
            category TEXT,
            fetched_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS runs (
            id TEXT PRIMARY KEY,
            admin_id TEXT NOT NULL,
            trigger_source TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            posts_created INTEGER NOT NULL DEFAULT 0,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            run_id TEXT NOT NULL REFERENCES runs(id),
            product_id TEXT NOT NULL REFERENCES products(id),
            marketplace_id TEXT NOT NULL,
            platform TEXT NOT NULL,
            caption TEXT NOT NULL,
            status TEXT NOT NULL,
            scheduled_at TEXT NOT NULL,
            posted_at TEXT,
            platform_post_id TEXT,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_posts_scheduled_at ON posts(scheduled_at)",
    )
    .execute(pool)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_posts_status_posted_at ON posts(status, posted_at)",
    )
    .execute(pool)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_run_id ON posts(run_id)")
        .execute(pool)
        .await
        .map_err(|e| LedgerError::Database(e.to_string()))?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_runs_admin_status ON runs(admin_id, status, started_at)",
    )
    .execute(pool)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scheduler_configs (
            admin_id TEXT PRIMARY KEY,
            is_active INTEGER NOT NULL,
            posts_per_day INTEGER NOT NULL,
            post_times TEXT NOT NULL,
            platforms TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS integration_configs (
            admin_id TEXT PRIMARY KEY,
            rapidapi_key TEXT,
            rapidapi_host TEXT,
            affiliate_tag TEXT,
            instagram_access_token TEXT,
            instagram_user_id TEXT,
            facebook_access_token TEXT,
            facebook_page_id TEXT,
            pinterest_access_token TEXT,
            pinterest_board_id TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| LedgerError::Database(e.to_string()))?;

    Ok(())
}
