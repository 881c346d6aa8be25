//! Backend execution contract

use super::errors::ExecutorError;
use super::result::ResultSlot;
use crate::document::Document;
use crate::expr::{Evaluator, Params};
use crate::planner::Plan;

/// Everything a backend needs to run one planned document
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    pub document: &'a Document,
    pub plan: &'a Plan,
    pub params: &'a Params,
    pub evaluator: &'a dyn Evaluator,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        document: &'a Document,
        plan: &'a Plan,
        params: &'a Params,
        evaluator: &'a dyn Evaluator,
    ) -> Self {
        Self {
            document,
            plan,
            params,
            evaluator,
        }
    }
}

/// A storage backend that executes plans
///
/// Implementations fill every root task of `slot`, running root jobs in
/// [`Plan::execution_order`]. A failing job aborts the whole document: the
/// caller must discard `slot` on error.
pub trait Backend {
    /// Backend failure; execution failures of any backend convert into it
    type Error: From<ExecutorError>;

    fn execute_plan(&mut self, ctx: &ExecutionContext<'_>, slot: &mut ResultSlot) -> Result<(), Self::Error>;
}
