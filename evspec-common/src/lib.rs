//! # evspec Common Library
//!
//! Shared code for the engine specification pipeline:
//! - Error type and result alias
//! - Configuration resolution (CLI → ENV → TOML → defaults)
//! - Persisted models and the research-resources variant
//! - Database connection, schema management and the read API

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{ResearchResources, ResourceShape};
