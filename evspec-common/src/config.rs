//! Configuration loading for the ingestion pipeline
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The store connection string has no compiled default. It is the one piece of
//! configuration the batch cannot run without.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Store connection string, e.g. `sqlite://./evspec.db`
pub const ENV_DATABASE_URL: &str = "EVSPEC_DATABASE_URL";
/// Directory holding the source modules
pub const ENV_SOURCE_DIR: &str = "EVSPEC_SOURCE_DIR";
/// Explicit TOML config file path
pub const ENV_CONFIG_FILE: &str = "EVSPEC_CONFIG";

pub const DEFAULT_SOURCE_DIR: &str = "content/engines";
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

/// Contents of an `evspec.toml` file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TomlConfig {
    pub database_url: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub progress_interval: Option<usize>,
    pub max_lock_wait_ms: Option<u64>,
}

impl TomlConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Locate and load the config file, degrading to an empty config.
    ///
    /// A missing or malformed file is a warning, never a failure.
    pub fn discover(explicit: Option<&Path>) -> Self {
        let Some(path) = locate_config_file(explicit) else {
            debug!("No config file found, using defaults");
            return Self::default();
        };

        match Self::load(&path) {
            Ok(config) => {
                info!("Loaded config file: {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_FILE) {
        return Some(PathBuf::from(path));
    }

    let local = PathBuf::from("evspec.toml");
    if local.exists() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|d| d.join("evspec").join("config.toml"))
        .filter(|p| p.exists())
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
}

/// Fully resolved pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct IngestConfig {
    pub database_url: String,
    pub source_dir: PathBuf,
    /// Log a running count every N successful upserts
    pub progress_interval: usize,
    /// Upper bound on retrying a locked database
    pub max_lock_wait_ms: u64,
}

impl IngestConfig {
    /// Configuration with compiled defaults for everything but the two locations
    pub fn new(database_url: impl Into<String>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            database_url: database_url.into(),
            source_dir: source_dir.into(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            max_lock_wait_ms: DEFAULT_MAX_LOCK_WAIT_MS,
        }
    }

    /// Resolve configuration from CLI overrides, environment and config file
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let toml_config = TomlConfig::discover(overrides.config_file.as_deref());
        Self::resolve_with(overrides, toml_config)
    }

    /// Resolve against an already loaded TOML config
    pub fn resolve_with(overrides: &ConfigOverrides, toml_config: TomlConfig) -> Result<Self> {
        let database_url = overrides
            .database_url
            .clone()
            .or_else(|| non_empty_env(ENV_DATABASE_URL))
            .or(toml_config.database_url)
            .ok_or_else(|| {
                Error::Config(format!(
                    "Store connection string not configured. Set {} or database_url in evspec.toml",
                    ENV_DATABASE_URL
                ))
            })?;

        let source_dir = overrides
            .source_dir
            .clone()
            .or_else(|| non_empty_env(ENV_SOURCE_DIR).map(PathBuf::from))
            .or(toml_config.source_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SOURCE_DIR));

        let progress_interval = match toml_config.progress_interval {
            Some(0) => {
                warn!("progress_interval = 0 is invalid, using {}", DEFAULT_PROGRESS_INTERVAL);
                DEFAULT_PROGRESS_INTERVAL
            }
            Some(n) => n,
            None => DEFAULT_PROGRESS_INTERVAL,
        };

        Ok(Self {
            database_url,
            source_dir,
            progress_interval,
            max_lock_wait_ms: toml_config.max_lock_wait_ms.unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS),
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
