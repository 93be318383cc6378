//! Database access: connection, schema management, field index and read API

pub mod field_index;
pub mod init;
pub mod pages;
pub mod schema_sync;
pub mod table_schemas;

pub use field_index::*;
pub use init::*;
pub use pages::*;
pub use table_schemas::*;
