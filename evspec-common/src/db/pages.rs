//! Read API over persisted engine pages
//!
//! Consumed by the page layer and by `evspec-lookup`. Every query is a plain
//! read of `engine_pages` / `engine_page_fields`; nothing here writes.

use crate::db::field_index::{flatten_fields, scalar_text};
use crate::models::{
    brand_display_name, BrandSummary, EnginePageData, EngineSlug, EngineSummary, ResearchResources,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::warn;

const RESEARCH_RESOURCES_KEY: &str = "researchResources";

/// Full enriched document for one engine, or `None` when not ingested.
///
/// A document without research resources gets the default empty shape, the
/// same default the enrichment step falls back to.
pub async fn get_engine_page_data(
    pool: &SqlitePool,
    brand: &str,
    engine_code: &str,
) -> Result<Option<EnginePageData>> {
    let row = sqlx::query(
        r#"
        SELECT brand, engine_code, data, created_at
        FROM engine_pages
        WHERE brand = ? AND engine_code = ?
        "#,
    )
    .bind(brand)
    .bind(engine_code)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let raw: String = row.get("data");
    let mut data: Value = serde_json::from_str(&raw)?;
    let created_at = parse_timestamp(&row.get::<String, _>("created_at"))?;

    let research_resources = fill_research_resources(&mut data, brand, engine_code);

    Ok(Some(EnginePageData {
        brand: row.get("brand"),
        engine_code: row.get("engine_code"),
        data,
        research_resources,
        created_at,
    }))
}

fn fill_research_resources(data: &mut Value, brand: &str, engine_code: &str) -> ResearchResources {
    let Some(map) = data.as_object_mut() else {
        warn!(brand, engine_code, "Stored document is not an object");
        return ResearchResources::empty();
    };

    match map.get(RESEARCH_RESOURCES_KEY) {
        None | Some(Value::Null) => {
            let empty = ResearchResources::empty();
            map.insert(RESEARCH_RESOURCES_KEY.to_string(), empty.to_json());
            empty
        }
        Some(stored) => ResearchResources::from_json(stored),
    }
}

/// Timestamps are written as RFC 3339; SQLite's own `CURRENT_TIMESTAMP`
/// format is accepted for rows written by other tools.
fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::InvalidInput(format!("Bad created_at '{}': {}", raw, e)))
}

/// Every ingested (brand, engine code) pair, sorted
pub async fn get_all_engine_slugs(pool: &SqlitePool) -> Result<Vec<EngineSlug>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT brand, engine_code FROM engine_pages ORDER BY brand, engine_code",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(into_slug).collect())
}

pub async fn get_all_brands(pool: &SqlitePool) -> Result<Vec<BrandSummary>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT brand, COUNT(*) AS engine_count
        FROM engine_pages
        GROUP BY brand
        ORDER BY brand
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, engine_count)| BrandSummary {
            display_name: brand_display_name(&id),
            id,
            engine_count,
        })
        .collect())
}

/// Engines of one brand; display name is `metadata.title` when it is text
pub async fn get_engines_for_brand(pool: &SqlitePool, brand: &str) -> Result<Vec<EngineSummary>> {
    let rows = sqlx::query_as::<_, (String, Option<String>)>(
        r#"
        SELECT engine_code,
               CASE WHEN json_type(data, '$.metadata.title') = 'text'
                    THEN json_extract(data, '$.metadata.title')
               END AS title
        FROM engine_pages
        WHERE brand = ?
        ORDER BY engine_code
        "#,
    )
    .bind(brand)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, title)| EngineSummary {
            display_name: title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| id.to_uppercase()),
            id,
        })
        .collect())
}

/// Pages with `value` at `path` (field-index path syntax, e.g. `hero.years`)
pub async fn find_pages_by_field(pool: &SqlitePool, path: &str, value: &Value) -> Result<Vec<EngineSlug>> {
    let text = scalar_text(value)
        .ok_or_else(|| Error::InvalidInput(format!("Field lookup needs a scalar, got {}", value)))?;

    let rows = sqlx::query_as::<_, (String, String)>(
        r#"
        SELECT p.brand, p.engine_code
        FROM engine_pages p
        JOIN engine_page_fields f ON f.page_id = p.id
        WHERE f.path = ? AND f.value = ?
        ORDER BY p.brand, p.engine_code
        "#,
    )
    .bind(path)
    .bind(text)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(into_slug).collect())
}

/// Pages whose document contains every scalar leaf of `fragment`.
///
/// An empty fragment matches every page.
pub async fn find_pages_containing(pool: &SqlitePool, fragment: &Value) -> Result<Vec<EngineSlug>> {
    let pairs = flatten_fields(fragment);
    if pairs.is_empty() {
        return get_all_engine_slugs(pool).await;
    }

    let required = pairs.len() as i64;
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT p.brand, p.engine_code FROM engine_pages p \
         JOIN engine_page_fields f ON f.page_id = p.id WHERE ",
    );

    for (i, (path, value)) in pairs.into_iter().enumerate() {
        if i > 0 {
            builder.push(" OR ");
        }
        builder
            .push("(f.path = ")
            .push_bind(path)
            .push(" AND f.value = ")
            .push_bind(value)
            .push(")");
    }

    builder
        .push(" GROUP BY p.id HAVING COUNT(*) = ")
        .push_bind(required)
        .push(" ORDER BY p.brand, p.engine_code");

    let rows = builder
        .build_query_as::<(String, String)>()
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(into_slug).collect())
}

/// Number of persisted rows for one key; 0 or 1 while the key is unique
pub async fn count_rows_for_key(pool: &SqlitePool, brand: &str, engine_code: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM engine_pages WHERE brand = ? AND engine_code = ?",
    )
    .bind(brand)
    .bind(engine_code)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

fn into_slug((brand, engine_code): (String, String)) -> EngineSlug {
    EngineSlug { brand, engine_code }
}
