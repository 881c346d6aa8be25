//! PostgreSQL compilation for aeroql
//!
//! Every root query job becomes one parameterized statement:
//!
//! - joined children add a FROM source and their filters to the parent's WHERE
//! - inlined children become correlated subqueries, aggregated to JSON
//!   (`jsonb_agg` for lists, `to_jsonb` for single records)
//! - `$name` parameters and `/root` references become positional `$n`
//!   placeholders, bound at execution time
//!
//! [`SqlBackend`] compiles the whole plan before sending the first statement,
//! so a compile failure never leaves a document half executed.

mod backend;
mod compiler;
mod context;
mod errors;

pub use backend::{SqlBackend, SqlConnection};
pub use compiler::{CompiledStatement, SqlCompiler};
pub use context::{CompileContext, ParamSource};
pub use errors::{
    CompileError, CompileErrorCode, CompileResult, ConnectionError, SqlBackendError,
};
