//! evspec-lookup - read-only inspection of the page store
//!
//! Prints read API results as pretty JSON on stdout.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use evspec_common::config::{ConfigOverrides, IngestConfig};
use evspec_common::db;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "evspec-lookup", version)]
struct Cli {
    /// Store connection string (overrides EVSPEC_DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// TOML config file (overrides EVSPEC_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// All brands with engine counts
    Brands,
    /// Engines of one brand
    Engines { brand: String },
    /// Every (brand, engine code) pair
    Slugs,
    /// Full page document for one engine
    Page { brand: String, engine_code: String },
    /// Pages with a JSON scalar at a field path, e.g. `find hero.years '"2020"'`
    Find { path: String, value: String },
    /// Pages containing a JSON fragment, e.g. `contains '{"hero":{"years":"2020"}}'`
    Contains { fragment: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    evspec_ingest::init_tracing();

    let config = IngestConfig::resolve(&ConfigOverrides {
        database_url: cli.database_url,
        source_dir: None,
        config_file: cli.config,
    })
    .context("Failed to resolve configuration")?;

    let pool = db::connect_readonly(&config.database_url).await?;

    match cli.command {
        Command::Brands => print(&db::get_all_brands(&pool).await?)?,
        Command::Engines { brand } => print(&db::get_engines_for_brand(&pool, &brand).await?)?,
        Command::Slugs => print(&db::get_all_engine_slugs(&pool).await?)?,
        Command::Page { brand, engine_code } => {
            match db::get_engine_page_data(&pool, &brand, &engine_code).await? {
                Some(page) => print(&page)?,
                None => bail!("No page for ({}, {})", brand, engine_code),
            }
        }
        Command::Find { path, value } => {
            let value = serde_json::from_str(&value).context("value must be JSON, e.g. '\"2020\"' or 42")?;
            print(&db::find_pages_by_field(&pool, &path, &value).await?)?
        }
        Command::Contains { fragment } => {
            let fragment = serde_json::from_str(&fragment).context("fragment must be JSON")?;
            print(&db::find_pages_containing(&pool, &fragment).await?)?
        }
    }

    pool.close().await;
    Ok(())
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
