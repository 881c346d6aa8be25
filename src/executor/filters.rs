//! Record environments and filter evaluation
//!
//! A record is kept iff every filter evaluates to `true`; `false` and `null`
//! both drop it.

use serde_json::{Map, Value};

use super::errors::{ExecutorError, ExecutorResult};
use super::result::ResultSlot;
use crate::expr::{Binding, Environment, Evaluator, Expr, Params, Symbol};

/// Symbol scope while executing a query
///
/// `chain[0]` is the current record, `chain[n]` the record `n` queries up.
pub struct RecordEnv<'a> {
    chain: &'a [&'a Map<String, Value>],
    roots: &'a ResultSlot,
    params: &'a Params,
}

impl<'a> RecordEnv<'a> {
    pub fn new(chain: &'a [&'a Map<String, Value>], roots: &'a ResultSlot, params: &'a Params) -> Self {
        Self {
            chain,
            roots,
            params,
        }
    }
}

impl Environment for RecordEnv<'_> {
    fn lookup(&self, symbol: &Symbol) -> Binding {
        match symbol {
            Symbol::Field { depth, key } => match self.chain.get(*depth) {
                Some(record) => Binding::Value(record.get(key).cloned().unwrap_or(Value::Null)),
                None => Binding::Unbound,
            },
            Symbol::Root { task, path } => match self.roots.get_by_name(task) {
                Some(value) => Binding::Value(follow_path(value, path)),
                None => Binding::Unbound,
            },
            Symbol::Param(name) => match self.params.get(name) {
                Some(value) => Binding::Value(value.clone()),
                None => Binding::Unbound,
            },
        }
    }
}

/// Walks `.a.b` into a root result; anything missing is `null`
pub fn follow_path(value: &Value, path: &[String]) -> Value {
    let mut current = value;
    for segment in path {
        match current.get(segment) {
            Some(next) => current = next,
            None => return Value::Null,
        }
    }
    current.clone()
}

/// Evaluates filter conjunctions against records
pub struct FilterEvaluator<'a> {
    evaluator: &'a dyn Evaluator,
    /// Task name used in error messages
    task: &'a str,
}

impl<'a> FilterEvaluator<'a> {
    pub fn new(evaluator: &'a dyn Evaluator, task: &'a str) -> Self {
        Self { evaluator, task }
    }

    /// Checks if the record in `env` passes every filter
    pub fn matches(&self, env: &RecordEnv<'_>, filters: &[Expr]) -> ExecutorResult<bool> {
        for filter in filters {
            let value = self
                .evaluator
                .eval(env, filter)
                .map_err(|e| ExecutorError::evaluation_failed(self.task, &e))?;
            if value != Value::Bool(true) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
