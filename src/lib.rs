//! aeroql - declarative nested queries over relational schemas
//!
//! Documents are parsed and resolved against a schema catalog, planned into a
//! job graph, then executed by a backend: the in-memory reference executor or
//! compiled PostgreSQL.

pub mod cli;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod executor;
pub mod expr;
pub mod observability;
pub mod planner;
pub mod schema;
pub mod sql;

pub use engine::{Engine, Prepared};
pub use error::{QlError, QlResult};
