//! evspec-ingest library interface
//!
//! Loads brand/engine source modules, merges brand defaults into each
//! engine, sanitizes the result and upserts it into the page store.

pub mod batch;
pub mod enricher;
pub mod error;
pub mod retry;
pub mod sanitizer;
pub mod source;
pub mod store;

pub use crate::batch::{run_batch, BatchReport, SkippedBrand, SkippedEngine};
pub use crate::error::{BatchError, SourceLoadError, StoreError};
pub use crate::store::PageStore;

/// Install the fmt subscriber shared by both binaries.
///
/// `RUST_LOG` directives are honored on top of an `info` default. Logs go
/// to stderr so `evspec-lookup` output stays machine-readable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();
}
