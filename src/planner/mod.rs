//! Query planner subsystem for aeroql
//!
//! Turns a resolved [`Document`](crate::document::Document) into a [`Plan`]: one
//! job per root task, with every nested query classified as joined or inlined.
//!
//! # Design Principles
//!
//! - Deterministic: same document → same jobs, flags, columns and aliases
//! - Placement is a pure function of cardinality and dependency on the parent:
//!   a single-record child that reads its parent's record is joined, everything
//!   else is inlined (multi-record children aggregate into one value per parent row)
//! - Root jobs never join each other; `/name` references only order them

mod errors;
mod explain;
mod job;
mod planner;

pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::{ExplainPlan, JobExplain};
pub use job::{Column, Job, JobFlags, JobId, Plan};
pub use planner::Planner;
