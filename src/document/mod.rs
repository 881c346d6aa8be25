//! Query documents for aeroql
//!
//! A document is either a single bare task or a list of `name: task`
//! declarations. Tasks are queries or expressions:
//!
//! ```text
//! groups: *shop.group :asc name
//!     +categories(*shop.category (eq .group_id ..id) -group_id)
//! cheapest: ?shop.product :asc price + name price
//! products: #shop.product
//! ```
//!
//! Sigils: `?` one record, `*` many records, `#` count.
//!
//! Processing is two-phase:
//! 1. [`parse`] turns text into a [`DocumentSyntax`] without touching the schema
//! 2. [`Resolver`] binds subjects, applies selection directives and tags, and
//!    types every task, producing an immutable [`Document`]

mod errors;
mod parser;
mod resolve;
mod syntax;
mod task;

pub use errors::{DocumentError, DocumentErrorCode, DocumentResult, Stage};
pub use parser::{parse, BARE_ROOT_NAME};
pub use resolve::{ResolveOptions, Resolver};
pub use syntax::{Declaration, Directive, DocumentSyntax, Item, QuerySyntax, TaskSyntax};
pub use task::{Cardinality, Document, OrderKey, Query, SubjectRef, Task, TaskId, TaskKind};
