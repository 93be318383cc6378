//! Store connection and schema establishment
//!
//! The pipeline holds exactly one connection for the lifetime of a batch.
//! `ensure_schema` is idempotent and runs on every batch.

use crate::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub const ENGINE_PAGES_TABLE: &str = "engine_pages";
pub const ENGINE_PAGE_FIELDS_TABLE: &str = "engine_page_fields";

/// SQLite's own wait before reporting "database is locked".
/// Longer waits are handled by the caller's retry loop.
const BUSY_TIMEOUT_MS: u64 = 250;

/// Open a read-write connection, creating the database file if needed
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    // Create parent directory if it doesn't exist
    let filename = options.get_filename().to_path_buf();
    if let Some(parent) = filename.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let newly_created = !filename.exists();

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", filename.display());
    } else {
        info!("Opened existing database: {}", filename.display());
    }

    Ok(pool)
}

/// Open a read-only connection to an existing database
///
/// `immutable` keeps SQLite from touching the WAL/SHM files, so readers work
/// on databases the ingest process has already closed.
pub async fn connect_readonly(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .read_only(true)
        .immutable(true)
        .create_if_missing(false);

    if !options.get_filename().exists() {
        return Err(Error::NotFound(format!(
            "Database not found: {}. Run evspec-ingest first to populate it.",
            options.get_filename().display()
        )));
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Release the connection.
///
/// `PRAGMA optimize` runs first so that a connection which can no longer
/// execute statements reports an error instead of closing silently.
pub async fn close(pool: SqlitePool) -> Result<()> {
    let optimized = sqlx::query("PRAGMA optimize").execute(&pool).await;
    pool.close().await;
    optimized?;
    debug!("Database connection closed");
    Ok(())
}

/// Create tables and indexes if missing, then add any missing columns.
///
/// Safe to call on every run.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    create_engine_pages_table(pool).await?;
    create_engine_page_fields_table(pool).await?;

    crate::db::table_schemas::sync_all_table_schemas(pool).await?;

    // Also enforces the key on tables created before the inline constraint existed
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_engine_pages_key ON engine_pages (brand, engine_code)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_engine_pages_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS engine_pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            brand TEXT NOT NULL,
            engine_code TEXT NOT NULL,
            data TEXT NOT NULL CHECK (json_valid(data)),
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (brand, engine_code)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// One row per distinct scalar leaf of each page document
async fn create_engine_page_fields_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS engine_page_fields (
            page_id INTEGER NOT NULL REFERENCES engine_pages(id) ON DELETE CASCADE,
            path TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (page_id, path, value)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_engine_page_fields_lookup ON engine_page_fields (path, value)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
