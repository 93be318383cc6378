//! Error types for evspec-ingest
//!
//! Per-module and per-key errors are recovered by the batch runner and end
//! up in the report. Only `BatchError` aborts a batch.

use std::path::PathBuf;
use thiserror::Error;

/// A source module that contributes nothing to the batch
#[derive(Debug, Error)]
pub enum SourceLoadError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("{path}: module root is {kind}, expected a mapping")]
    NotAMapping { path: PathBuf, kind: &'static str },

    #[error("{path}: brands export is {kind}, expected a mapping")]
    ExportNotAMapping { path: PathBuf, kind: &'static str },
}

/// A single upsert that did not land
#[derive(Debug, Error)]
#[error("upsert failed for ({brand}, {engine_code}): {source}")]
pub struct StoreError {
    pub brand: String,
    pub engine_code: String,
    #[source]
    pub source: evspec_common::Error,
}

/// Batch-level failure; nothing after it is attempted
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("source location {0} does not exist or is not a directory")]
    SourceLocation(PathBuf),

    #[error("cannot open store: {0}")]
    Connect(#[source] evspec_common::Error),

    #[error("cannot establish store schema: {0}")]
    Schema(#[source] evspec_common::Error),

    #[error("store connection did not close cleanly: {0}")]
    Close(#[source] evspec_common::Error),
}
