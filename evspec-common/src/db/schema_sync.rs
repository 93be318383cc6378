//! Column sync for tables created by older builds
//!
//! `CREATE TABLE IF NOT EXISTS` leaves an existing table untouched, so a
//! column added to a declared schema would never reach an old database.
//! `SchemaSync::sync_table` adds every declared column the table lacks.
//! Other differences are left alone.

use crate::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// One declared column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    /// SQL literal, quoted by the caller
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Column clause for `ALTER TABLE ADD COLUMN`.
    ///
    /// SQLite only accepts NOT NULL on an added column with a default, and
    /// never accepts PRIMARY KEY.
    fn add_column_clause(&self) -> String {
        let mut clause = format!("{} {}", self.name, self.sql_type);
        if let Some(default) = &self.default_value {
            if self.not_null {
                clause.push_str(" NOT NULL");
            }
            clause.push_str(" DEFAULT ");
            clause.push_str(default);
        }
        clause
    }
}

/// Declared columns of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    fn expected_columns() -> Vec<ColumnDefinition>;
}

pub struct SchemaSync;

impl SchemaSync {
    /// Add the declared columns `T`'s table is missing. A missing table is skipped.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
        let table = T::table_name();
        let present = Self::column_names(pool, table).await?;

        if present.is_empty() {
            warn!("Table '{}' does not exist, skipping column sync", table);
            return Ok(());
        }

        let missing: Vec<ColumnDefinition> = T::expected_columns()
            .into_iter()
            .filter(|c| !present.contains(&c.name))
            .collect();

        if missing.is_empty() {
            debug!("Columns up to date for '{}'", table);
            return Ok(());
        }

        for column in missing {
            if column.primary_key {
                warn!("Adding {}.{} without its PRIMARY KEY constraint", table, column.name);
            }
            if column.not_null && column.default_value.is_none() {
                warn!("Adding {}.{} as nullable, it has no default", table, column.name);
            }

            info!("Adding column {}.{} ({})", table, column.name, column.sql_type);
            sqlx::query(&format!("ALTER TABLE {} ADD COLUMN {}", table, column.add_column_clause()))
                .execute(pool)
                .await?;
        }

        Ok(())
    }

    /// Column names of `table`; empty when the table does not exist
    pub async fn column_names(pool: &SqlitePool, table: &str) -> Result<HashSet<String>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", table))
            .fetch_all(pool)
            .await?;

        Ok(rows.iter().map(|row| row.get::<String, _>("name")).collect())
    }
}
