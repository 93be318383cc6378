//! Table Schema Definitions
//!
//! Single source of truth for the columns `ensure_schema` keeps in sync.
//! Defaults here must be constants, since SQLite rejects expression defaults
//! on `ALTER TABLE ADD COLUMN`.

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::debug;

/// `engine_pages`: one row per (brand, engine_code)
pub struct EnginePagesTableSchema;

impl TableSchema for EnginePagesTableSchema {
    fn table_name() -> &'static str {
        super::ENGINE_PAGES_TABLE
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("brand", "TEXT").not_null().default("''"),
            ColumnDefinition::new("engine_code", "TEXT").not_null().default("''"),
            ColumnDefinition::new("data", "TEXT").not_null().default("'{}'"),
            ColumnDefinition::new("created_at", "TIMESTAMP")
                .not_null()
                .default("'1970-01-01T00:00:00Z'"),
        ]
    }
}

/// `engine_page_fields`: containment index over page documents
pub struct EnginePageFieldsTableSchema;

impl TableSchema for EnginePageFieldsTableSchema {
    fn table_name() -> &'static str {
        super::ENGINE_PAGE_FIELDS_TABLE
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("page_id", "INTEGER").not_null(),
            ColumnDefinition::new("path", "TEXT").not_null().default("''"),
            ColumnDefinition::new("value", "TEXT").not_null().default("'null'"),
        ]
    }
}

/// Add missing columns to every evspec table
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<()> {
    SchemaSync::sync_table::<EnginePagesTableSchema>(pool).await?;
    SchemaSync::sync_table::<EnginePageFieldsTableSchema>(pool).await?;

    debug!("Schema synchronization complete");
    Ok(())
}
