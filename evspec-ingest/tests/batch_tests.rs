//! End-to-end batch runs against a temporary store and source tree

use evspec_common::config::IngestConfig;
use evspec_common::db::{self, count_rows_for_key, get_all_engine_slugs, get_engine_page_data};
use evspec_common::ResearchResources;
use evspec_ingest::{run_batch, BatchError, SkippedEngine};
use serde_json::json;
use sqlx::SqlitePool;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

struct Fixture {
    _temp: TempDir,
    source_dir: PathBuf,
    database_url: String,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let source_dir = temp.path().join("engines");
        fs::create_dir_all(&source_dir).unwrap();
        let database_url = format!("sqlite://{}", temp.path().join("store").join("pages.db").display());
        Self { _temp: temp, source_dir, database_url }
    }

    fn write_module(&self, name: &str, content: &str) {
        write(&self.source_dir, name, content);
    }

    fn config(&self) -> IngestConfig {
        IngestConfig::new(self.database_url.clone(), self.source_dir.clone())
    }

    async fn pool(&self) -> SqlitePool {
        db::connect(&self.database_url).await.unwrap()
    }
}

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

const ACME: &str = r#"{
    "brands": {
        "acme": {
            "heroImage": {"src": "/a.jpg", "alt": "Acme"},
            "researchResources": {"serviceManual": "url1", "serviceBulletin": "url2"},
            "engines": {
                "x1": {"hero": {"years": "2020"}}
            }
        }
    }
}"#;

#[tokio::test]
async fn test_brand_defaults_are_persisted() {
    let fixture = Fixture::new();
    fixture.write_module("acme.json", ACME);

    let report = run_batch(&fixture.config()).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.modules_loaded, 1);
    assert!(report.skipped.is_empty());
    assert!(report.module_failures.is_empty());

    let pool = fixture.pool().await;
    let page = get_engine_page_data(&pool, "acme", "x1").await.unwrap().unwrap();
    assert_eq!(
        page.data,
        json!({
            "hero": {"years": "2020", "image": {"src": "/a.jpg", "alt": "Acme"}},
            "researchResources": {"serviceManual": "url1", "serviceBulletin": "url2"}
        })
    );
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_rerun_replaces_row_and_refreshes_timestamp() {
    let fixture = Fixture::new();
    fixture.write_module("acme.json", ACME);
    run_batch(&fixture.config()).await.unwrap();

    let pool = fixture.pool().await;
    let first = get_engine_page_data(&pool, "acme", "x1").await.unwrap().unwrap();
    db::close(pool).await.unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    fixture.write_module("acme.json", &ACME.replace("/a.jpg", "/b.jpg"));
    let report = run_batch(&fixture.config()).await.unwrap();
    assert_eq!(report.inserted, 1);

    let pool = fixture.pool().await;
    assert_eq!(count_rows_for_key(&pool, "acme", "x1").await.unwrap(), 1);
    let second = get_engine_page_data(&pool, "acme", "x1").await.unwrap().unwrap();
    assert_eq!(second.data["hero"]["image"]["src"], json!("/b.jpg"));
    assert!(second.created_at > first.created_at);
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_unchanged_sources_are_idempotent() {
    let fixture = Fixture::new();
    fixture.write_module("acme.json", ACME);
    fixture.write_module(
        "volt.toml",
        r#"
[brands.volt.engines.e1.hero]
years = "2022"

[brands.volt.engines.e2.metadata]
title = "E2"
released = 2021-09-01
"#,
    );

    run_batch(&fixture.config()).await.unwrap();
    let pool = fixture.pool().await;
    let slugs_before = get_all_engine_slugs(&pool).await.unwrap();
    let e2_before = get_engine_page_data(&pool, "volt", "e2").await.unwrap().unwrap();
    db::close(pool).await.unwrap();

    run_batch(&fixture.config()).await.unwrap();
    let pool = fixture.pool().await;
    let slugs_after = get_all_engine_slugs(&pool).await.unwrap();
    let e2_after = get_engine_page_data(&pool, "volt", "e2").await.unwrap().unwrap();

    assert_eq!(slugs_before.len(), 3);
    assert_eq!(slugs_before, slugs_after);
    assert_eq!(e2_before.data, e2_after.data);
    assert_eq!(e2_after.data["metadata"]["released"], json!("2021-09-01T00:00:00.000Z"));
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_broken_module_is_isolated() {
    let fixture = Fixture::new();
    fixture.write_module("1-alpha.json", r#"{"brands": {"alpha": {"engines": {"a1": {}}}}}"#);
    fixture.write_module("2-broken.json", r#"{"brands": {"#);
    fixture.write_module("3-gamma.json", r#"{"brands": {"gamma": {"engines": {"g1": {}}}}}"#);

    let report = run_batch(&fixture.config()).await.unwrap();
    assert_eq!(report.modules_loaded, 2);
    assert_eq!(report.module_failures.len(), 1);
    assert_eq!(report.module_failures[0].module, "2-broken.json");
    assert_eq!(report.inserted, 2);

    let pool = fixture.pool().await;
    let brands: Vec<String> = get_all_engine_slugs(&pool)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.brand)
        .collect();
    assert_eq!(brands, vec!["alpha", "gamma"]);
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_unusable_engines_and_brands_are_skipped() {
    let fixture = Fixture::new();
    fixture.write_module(
        "mixed.json",
        r#"{
            "brands": {
                "acme": {"engines": {"x1": {"hero": {}}, "x2": null, "x3": "see x1"}},
                "broken": ["not", "a", "brand"]
            }
        }"#,
    );

    let report = run_batch(&fixture.config()).await.unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(
        report.skipped,
        vec![
            SkippedEngine {
                brand: "acme".to_string(),
                engine_code: "x2".to_string(),
                reason: "engine record is null".to_string(),
            },
            SkippedEngine {
                brand: "acme".to_string(),
                engine_code: "x3".to_string(),
                reason: "engine record is string, expected a mapping".to_string(),
            },
        ]
    );
    assert_eq!(report.skipped_brands.len(), 1);
    assert_eq!(report.skipped_brands[0].brand, "broken");
    assert_eq!(report.skipped_brands[0].module, "mixed.json");

    let pool = fixture.pool().await;
    assert_eq!(count_rows_for_key(&pool, "acme", "x2").await.unwrap(), 0);
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_failed_upsert_does_not_stop_the_batch() {
    let fixture = Fixture::new();
    fixture.write_module(
        "acme.json",
        r#"{"brands": {"acme": {"engines": {"a1": {}, "bad": {}, "z9": {}}}}}"#,
    );

    let pool = fixture.pool().await;
    db::ensure_schema(&pool).await.unwrap();
    sqlx::query(
        r#"
        CREATE TRIGGER reject_bad BEFORE INSERT ON engine_pages
        WHEN NEW.engine_code = 'bad'
        BEGIN SELECT RAISE(ABORT, 'rejected by test'); END
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();
    db::close(pool).await.unwrap();

    let report = run_batch(&fixture.config()).await.unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].engine_code, "bad");
    assert!(report.skipped[0].reason.contains("rejected by test"));

    let pool = fixture.pool().await;
    assert_eq!(count_rows_for_key(&pool, "acme", "z9").await.unwrap(), 1);
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_missing_source_location_aborts() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.source_dir = fixture.source_dir.join("absent");

    let result = run_batch(&config).await;
    assert!(matches!(result, Err(BatchError::SourceLocation(_))));
}

#[tokio::test]
async fn test_empty_source_location_completes() {
    let fixture = Fixture::new();

    let report = run_batch(&fixture.config()).await.unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.modules_loaded, 0);

    // Schema is still established
    let pool = fixture.pool().await;
    assert!(get_all_engine_slugs(&pool).await.unwrap().is_empty());
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_unreachable_store_is_connect_error() {
    let fixture = Fixture::new();
    fixture.write_module("acme.json", ACME);
    // Parent of the database path is a regular file
    let blocker = fixture.source_dir.join("blocker");
    fs::write(&blocker, "").unwrap();
    let mut config = fixture.config();
    config.database_url = format!("sqlite://{}", blocker.join("pages.db").display());

    let result = run_batch(&config).await;
    assert!(matches!(result, Err(BatchError::Connect(_))));
}

#[tokio::test]
async fn test_stored_documents_are_sanitized() {
    let fixture = Fixture::new();
    fixture.write_module(
        "bolt.json",
        r#"{
            "brands": {
                "bolt": {
                    "researchResources": {
                        "title": "Research",
                        "sections": [
                            {"title": "Manuals", "icon": {"component": {"$fn": "Book"}}, "children": "<ul/>"},
                            {"title": "Recalls", "icon": {"$fn": "Alert"}}
                        ]
                    },
                    "engines": {
                        "b1": {
                            "hero": {"years": "2023"},
                            "specs": {"table": {"$fn": "SpecTable"}, "kind": {"$symbol": "spec"}},
                            "metadata": {"updated": {"$date": "2024-02-03T04:05:06Z"}}
                        }
                    }
                }
            }
        }"#,
    );

    let report = run_batch(&fixture.config()).await.unwrap();
    assert_eq!(report.inserted, 1);

    let pool = fixture.pool().await;
    let page = get_engine_page_data(&pool, "bolt", "b1").await.unwrap().unwrap();
    assert_eq!(
        page.data,
        json!({
            "hero": {"years": "2023"},
            "specs": {"table": "[function]", "kind": "Symbol(spec)"},
            "metadata": {"updated": "2024-02-03T04:05:06.000Z"},
            "researchResources": {
                "title": "Research",
                "sections": [
                    {"title": "Manuals"},
                    {"title": "Recalls", "icon": "[function]"}
                ]
            }
        })
    );
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_brand_resources_in_unknown_form_reach_the_page() {
    let fixture = Fixture::new();
    fixture.write_module(
        "acme.json",
        r#"{
            "brands": {
                "acme": {
                    "researchResources": {"title": "Research", "resources": [{"label": "Manual", "url": "/m.pdf"}]},
                    "engines": {"x1": {"hero": {"years": "2020"}}}
                }
            }
        }"#,
    );

    let report = run_batch(&fixture.config()).await.unwrap();
    assert_eq!(report.inserted, 1);

    let pool = fixture.pool().await;
    let page = get_engine_page_data(&pool, "acme", "x1").await.unwrap().unwrap();
    let authored = json!({"title": "Research", "resources": [{"label": "Manual", "url": "/m.pdf"}]});
    assert_eq!(page.data["researchResources"], authored);
    assert_eq!(page.research_resources, ResearchResources::Other(authored));
    db::close(pool).await.unwrap();
}

#[tokio::test]
async fn test_progress_logged_every_upsert() {
    let fixture = Fixture::new();
    fixture.write_module(
        "acme.json",
        r#"{"brands": {"acme": {"engines": {"a1": {}, "a2": {}, "a3": {}}}}}"#,
    );
    let mut config = fixture.config();
    config.progress_interval = 1;

    let report = run_batch(&config).await.unwrap();
    assert_eq!(report.inserted, 3);
    assert!(report.skipped.is_empty());

    // A zero interval must not divide by zero
    config.progress_interval = 0;
    let report = run_batch(&config).await.unwrap();
    assert_eq!(report.inserted, 3);
}
