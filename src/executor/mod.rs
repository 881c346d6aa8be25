//! Execution subsystem for aeroql
//!
//! Defines the backend contract every executor implements and ships the
//! reference in-memory backend, the oracle the SQL path is tested against.
//!
//! # Execution Flow (strict order, per query)
//!
//! 1. Scan the subject table
//! 2. Filter: keep records whose where-conjunction is `true`
//! 3. Drop records whose joined children find nothing
//! 4. Sort (stable, multi-key)
//! 5. Paginate: offset, then limit
//! 6. Select fields, computed values and nested queries
//!
//! Root jobs run in dependency order; a failing job aborts the document.

mod backend;
mod errors;
mod executor;
mod filters;
mod result;
mod sorter;
mod store;

pub use backend::{Backend, ExecutionContext};
pub use errors::{ExecutorError, ExecutorErrorCode, ExecutorResult, Severity};
pub use executor::{evaluate_root_expression, paged_len, paginate, MemoryBackend};
pub use filters::{follow_path, FilterEvaluator, RecordEnv};
pub use result::{conform, ResultSlot};
pub use sorter::RecordSorter;
pub use store::MemoryStore;
