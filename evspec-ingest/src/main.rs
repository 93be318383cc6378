//! evspec-ingest - batch ingestion of engine specification pages
//!
//! Runs one batch and exits. Exit code 0 when the batch completes, even if
//! individual modules or engines were skipped; non-zero on configuration,
//! connection, schema or source-location failure.

use anyhow::{Context, Result};
use clap::Parser;
use evspec_common::config::{ConfigOverrides, IngestConfig};
use std::path::PathBuf;
use tracing::{error, info};

/// Ingest engine specification source modules into the page store
#[derive(Debug, Parser)]
#[command(name = "evspec-ingest", version)]
struct Cli {
    /// Store connection string (overrides EVSPEC_DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Directory of source modules (overrides EVSPEC_SOURCE_DIR)
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// TOML config file (overrides EVSPEC_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    evspec_ingest::init_tracing();
    info!("Starting evspec-ingest v{}", env!("CARGO_PKG_VERSION"));

    let config = IngestConfig::resolve(&ConfigOverrides {
        database_url: cli.database_url,
        source_dir: cli.source_dir,
        config_file: cli.config,
    })
    .context("Failed to resolve configuration")?;

    let report = match evspec_ingest::run_batch(&config).await {
        Ok(report) => report,
        Err(e) => {
            error!("Batch failed: {}", e);
            return Err(e.into());
        }
    };

    report.log_summary();
    Ok(())
}
