//! Observability subsystem for aeroql
//!
//! Structured, synchronous JSON-line logging for the document pipeline.
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes planning or execution
//! 2. No async or background threads
//! 3. Deterministic output (sorted keys, one event per line)
//!
//! # Usage
//!
//! ```ignore
//! use aeroql::observability::{Logger, ObservationScope};
//!
//! Logger::info("DOCUMENT_RESOLVED", &[("roots", "2")]);
//!
//! let scope = ObservationScope::new("PLAN");
//! // ... plan ...
//! scope.complete();
//! ```

mod logger;
mod scope;

pub use logger::{Logger, Severity};
pub use scope::ObservationScope;
