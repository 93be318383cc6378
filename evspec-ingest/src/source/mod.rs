//! Source modules: value model, brand records and discovery/loading

pub mod brand;
pub mod loader;
pub mod value;

pub use brand::{BrandRecord, BrandShapeError, SharedResources};
pub use loader::{load_sources, LoadedSources, ModuleFailure, SourceModule};
pub use value::{Opaque, SourceValue};
