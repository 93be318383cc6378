//! Source module discovery and loading
//!
//! A source module is a `.json` or `.toml` file whose root mapping exports
//! `brands`: brand key → brand record. Modules are independent; one that
//! fails to load is reported and the rest still load.

use super::value::SourceValue;
use crate::error::{BatchError, SourceLoadError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Name of the brand mapping inside a module
pub const BRANDS_EXPORT: &str = "brands";

const MODULE_EXTENSIONS: [&str; 2] = ["json", "toml"];

/// A successfully loaded module
#[derive(Debug, Clone)]
pub struct SourceModule {
    /// Path relative to the source location, `/`-separated
    pub name: String,
    pub path: PathBuf,
    pub brands: BTreeMap<String, SourceValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleFailure {
    pub module: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadedSources {
    pub modules: Vec<SourceModule>,
    pub failures: Vec<ModuleFailure>,
}

/// Load every module under `location`.
///
/// Only an unusable location is an error; module failures are collected.
pub fn load_sources(location: &Path) -> Result<LoadedSources, BatchError> {
    let paths = discover_modules(location)?;
    info!("Discovered {} source modules in {}", paths.len(), location.display());

    let mut loaded = LoadedSources::default();

    for path in paths {
        let name = module_name(location, &path);
        match load_module(&path) {
            Ok(brands) => {
                debug!(module = %name, brands = brands.len(), "Loaded source module");
                loaded.modules.push(SourceModule { name, path, brands });
            }
            Err(e) => {
                warn!(module = %name, "Skipping source module: {}", e);
                loaded.failures.push(ModuleFailure {
                    module: name,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(loaded)
}

/// Module files under `location`, sorted by path. Hidden entries are skipped.
pub fn discover_modules(location: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !location.is_dir() {
        return Err(BatchError::SourceLocation(location.to_path_buf()));
    }

    let mut paths = Vec::new();
    let walker = WalkDir::new(location)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && has_module_extension(entry.path()) {
                    paths.push(entry.into_path());
                }
            }
            Err(e) => {
                // Continue scanning, don't abort
                warn!("Error accessing source entry: {}", e);
            }
        }
    }

    paths.sort();
    Ok(paths)
}

/// Parse one module and extract its brand mapping.
///
/// A module without the export contributes zero brands.
pub fn load_module(path: &Path) -> Result<BTreeMap<String, SourceValue>, SourceLoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| SourceLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |message: String| SourceLoadError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let root = match extension(path).as_deref() {
        Some("toml") => {
            let value: toml::Value = toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
            SourceValue::from_toml(value)
        }
        _ => {
            let value: serde_json::Value =
                serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
            SourceValue::from_json(value)
        }
    };

    let mut exports = match root {
        SourceValue::Mapping(exports) => exports,
        other => {
            return Err(SourceLoadError::NotAMapping {
                path: path.to_path_buf(),
                kind: other.kind(),
            })
        }
    };

    match exports.remove(BRANDS_EXPORT) {
        Some(SourceValue::Mapping(brands)) => Ok(brands),
        None => {
            warn!("{} has no '{}' export, contributing no brands", path.display(), BRANDS_EXPORT);
            Ok(BTreeMap::new())
        }
        Some(other) => Err(SourceLoadError::ExportNotAMapping {
            path: path.to_path_buf(),
            kind: other.kind(),
        }),
    }
}

fn module_name(location: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(location).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn has_module_extension(path: &Path) -> bool {
    extension(path)
        .map(|e| MODULE_EXTENSIONS.contains(&e.as_str()))
        .unwrap_or(false)
}
