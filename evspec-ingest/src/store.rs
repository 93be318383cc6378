//! Upsert store for engine pages
//!
//! One row per (brand, engine_code). A write replaces the document, refreshes
//! `created_at` and rebuilds the page's field-index rows, all in a single
//! transaction.

use crate::error::StoreError;
use crate::retry::retry_on_lock;
use chrono::{DateTime, SecondsFormat, Utc};
use evspec_common::db::{self, flatten_fields, FieldPair};
use evspec_common::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::BTreeSet;

pub struct PageStore {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl PageStore {
    /// Open the single batch connection
    pub async fn open(database_url: &str, max_lock_wait_ms: u64) -> Result<Self> {
        let pool = db::connect(database_url).await?;
        Ok(Self::from_pool(pool, max_lock_wait_ms))
    }

    pub fn from_pool(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self { pool, max_lock_wait_ms }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent; see [`evspec_common::db::ensure_schema`]
    pub async fn ensure_schema(&self) -> Result<()> {
        db::ensure_schema(&self.pool).await
    }

    /// Insert or replace the page for (brand, engine_code), stamped now
    pub async fn upsert(&self, brand: &str, engine_code: &str, document: &Value) -> std::result::Result<(), StoreError> {
        self.upsert_at(brand, engine_code, document, Utc::now()).await
    }

    pub async fn upsert_at(
        &self,
        brand: &str,
        engine_code: &str,
        document: &Value,
        created_at: DateTime<Utc>,
    ) -> std::result::Result<(), StoreError> {
        let store_error = |source: evspec_common::Error| StoreError {
            brand: brand.to_string(),
            engine_code: engine_code.to_string(),
            source,
        };

        // Prepare all data before touching the connection
        let data = serde_json::to_string(document).map_err(|e| store_error(e.into()))?;
        let fields = flatten_fields(document);
        let created_at = created_at.to_rfc3339_opts(SecondsFormat::Micros, true);

        retry_on_lock("upsert engine page", self.max_lock_wait_ms, || {
            write_page(&self.pool, brand, engine_code, &data, &fields, &created_at)
        })
        .await
        .map_err(store_error)
    }

    /// Release the connection
    pub async fn close(self) -> Result<()> {
        db::close(self.pool).await
    }
}

async fn write_page(
    pool: &SqlitePool,
    brand: &str,
    engine_code: &str,
    data: &str,
    fields: &BTreeSet<FieldPair>,
    created_at: &str,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    let page_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO engine_pages (brand, engine_code, data, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(brand, engine_code) DO UPDATE SET
            data = excluded.data,
            created_at = excluded.created_at
        RETURNING id
        "#,
    )
    .bind(brand)
    .bind(engine_code)
    .bind(data)
    .bind(created_at)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM engine_page_fields WHERE page_id = ?")
        .bind(page_id)
        .execute(&mut *tx)
        .await?;

    for (path, value) in fields {
        sqlx::query("INSERT OR IGNORE INTO engine_page_fields (page_id, path, value) VALUES (?, ?, ?)")
            .bind(page_id)
            .bind(path)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}
