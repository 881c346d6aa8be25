//! Schema registry for aeroql
//!
//! Maps a qualified record name (`schema.model`) to its ordered, typed field list.
//! The registry is read-only once loaded and may be shared across documents.

mod errors;
mod loader;
mod types;

pub use errors::{SchemaError, SchemaErrorCode, SchemaResult};
pub use loader::{Catalog, SchemaRegistry};
pub use types::{FieldDef, FieldType, QualifiedName, RecordType, Type};
