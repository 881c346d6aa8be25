//! Expression evaluator for aeroql
//!
//! Scalar expressions inside query documents are s-expressions:
//!
//! ```text
//! (and (eq .category ..id) (gt .price $min_price))
//! ```
//!
//! # Symbols
//!
//! - `.key`: field of the current record; each extra leading dot climbs one record up
//! - `/task.path`: result of a root task of the same document
//! - `$name`: external parameter supplied by the caller
//!
//! The planner and both backends only talk to the [`Evaluator`] trait; [`Builtin`]
//! is the implementation shipped with the crate.

mod ast;
mod errors;
mod eval;
mod parser;

pub use ast::{Expr, Operator, Symbol};
pub use errors::{ExprError, ExprErrorCode, ExprResult};
pub use eval::{apply, compare_values, Binding, Builtin, Environment, Evaluator, Resolution};
pub use parser::{is_identifier, parse, parse_sequence};

/// External parameter values bound to `$name` symbols
pub type Params = indexmap::IndexMap<String, serde_json::Value>;
