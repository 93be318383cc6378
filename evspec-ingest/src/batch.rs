//! Batch runner
//!
//! `CONNECT → ENSURE_SCHEMA → LOAD_SOURCES → (module → brand → engine:
//! ENRICH → SANITIZE → UPSERT) → CLOSE`. Anything that goes wrong below the
//! batch level becomes a skip in the report; only connection, schema, source
//! location and close failures abort. The store is closed on every path.

use crate::enricher::enrich;
use crate::error::BatchError;
use crate::sanitizer::sanitize;
use crate::source::{load_sources, BrandRecord, ModuleFailure, SourceModule};
use crate::store::PageStore;
use evspec_common::config::IngestConfig;
use serde::Serialize;
use tracing::{error, info, warn};

/// An engine that was not persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedEngine {
    pub brand: String,
    pub engine_code: String,
    pub reason: String,
}

/// A brand entry that could not be read, so none of its engines were tried
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBrand {
    pub module: String,
    pub brand: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Successful upserts, first writes and replacements alike
    pub inserted: usize,
    pub modules_loaded: usize,
    pub module_failures: Vec<ModuleFailure>,
    pub skipped_brands: Vec<SkippedBrand>,
    pub skipped: Vec<SkippedEngine>,
}

impl BatchReport {
    fn skip(&mut self, brand: &str, engine_code: &str, reason: String) {
        self.skipped.push(SkippedEngine {
            brand: brand.to_string(),
            engine_code: engine_code.to_string(),
            reason,
        });
    }

    pub fn log_summary(&self) {
        info!(
            inserted = self.inserted,
            modules_loaded = self.modules_loaded,
            modules_skipped = self.module_failures.len(),
            brands_skipped = self.skipped_brands.len(),
            engines_skipped = self.skipped.len(),
            "Batch complete"
        );
        for failure in &self.module_failures {
            warn!(module = %failure.module, "Module skipped: {}", failure.reason);
        }
        for skipped in &self.skipped_brands {
            warn!(module = %skipped.module, brand = %skipped.brand, "Brand skipped: {}", skipped.reason);
        }
        for skipped in &self.skipped {
            warn!(brand = %skipped.brand, engine_code = %skipped.engine_code, "Engine skipped: {}", skipped.reason);
        }
    }
}

/// Run one full ingestion batch
pub async fn run_batch(config: &IngestConfig) -> Result<BatchReport, BatchError> {
    info!(
        source_dir = %config.source_dir.display(),
        "Starting ingestion batch"
    );

    let store = PageStore::open(&config.database_url, config.max_lock_wait_ms)
        .await
        .map_err(BatchError::Connect)?;

    let outcome = run_with_store(&store, config).await;
    let closed = store.close().await;

    match (outcome, closed) {
        (Ok(report), Ok(())) => Ok(report),
        (Ok(_), Err(e)) => Err(BatchError::Close(e)),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                error!("Store close failed after batch error: {}", close_err);
            }
            Err(e)
        }
    }
}

async fn run_with_store(store: &PageStore, config: &IngestConfig) -> Result<BatchReport, BatchError> {
    store.ensure_schema().await.map_err(BatchError::Schema)?;

    let sources = load_sources(&config.source_dir)?;

    let mut report = BatchReport {
        modules_loaded: sources.modules.len(),
        module_failures: sources.failures,
        ..Default::default()
    };

    let progress_interval = config.progress_interval.max(1);
    for module in sources.modules {
        ingest_module(store, module, progress_interval, &mut report).await;
    }

    Ok(report)
}

async fn ingest_module(store: &PageStore, module: SourceModule, progress_interval: usize, report: &mut BatchReport) {
    for (brand_key, brand_value) in module.brands {
        let brand = match BrandRecord::from_value(&brand_key, brand_value) {
            Ok(brand) => brand,
            Err(e) => {
                warn!(module = %module.name, brand = %brand_key, "Skipping brand: {}", e);
                report.skipped_brands.push(SkippedBrand {
                    module: module.name.clone(),
                    brand: brand_key,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for (engine_code, engine) in &brand.engines {
            let enriched = match enrich(engine, &brand) {
                Ok(enriched) => enriched,
                Err(e) => {
                    warn!(brand = %brand.id, engine_code = %engine_code, "Skipping engine: {}", e);
                    report.skip(&brand.id, engine_code, e.to_string());
                    continue;
                }
            };

            let document = sanitize(&enriched.into_value());

            match store.upsert(&brand.id, engine_code, &document).await {
                Ok(()) => {
                    report.inserted += 1;
                    if report.inserted % progress_interval == 0 {
                        info!("Upserted {} engine pages", report.inserted);
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    report.skip(&brand.id, engine_code, e.source.to_string());
                }
            }
        }
    }
}
