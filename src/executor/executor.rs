//! Reference executor over in-memory record collections
//!
//! Execution flow per query task (strict order):
//! 1. Scan the subject table
//! 2. Keep records whose filters all evaluate to `true`
//! 3. Drop records whose joined children find no record
//! 4. Sort by the order keys
//! 5. Drop `offset` records, then truncate to `limit`
//! 6. Build the selection of each surviving record
//!
//! Counts stop after step 2 and apply the offset/limit arithmetic to the
//! number of matching records.

use serde_json::{Map, Value};

use super::backend::{Backend, ExecutionContext};
use super::errors::{ExecutorError, ExecutorResult};
use super::filters::{FilterEvaluator, RecordEnv};
use super::result::ResultSlot;
use super::sorter::RecordSorter;
use super::store::MemoryStore;
use crate::document::{Cardinality, Query, Task, TaskId, TaskKind};

type Record = Map<String, Value>;

/// Backend that runs plans against a [`MemoryStore`]
pub struct MemoryBackend<'s> {
    store: &'s MemoryStore,
}

impl<'s> MemoryBackend<'s> {
    /// Creates a backend reading from `store`
    pub fn new(store: &'s MemoryStore) -> Self {
        Self { store }
    }
}

impl Backend for MemoryBackend<'_> {
    type Error = ExecutorError;

    fn execute_plan(&mut self, ctx: &ExecutionContext<'_>, slot: &mut ResultSlot) -> ExecutorResult<()> {
        for &job in ctx.plan.execution_order() {
            let task = ctx.document.task(ctx.plan.job(job).primary);
            let value = Run {
                ctx,
                store: self.store,
                slot,
            }
            .root(task)?;
            slot.fill(task.id, value)?;
        }
        Ok(())
    }
}

/// Execution of one root task
struct Run<'r, 's> {
    ctx: &'r ExecutionContext<'r>,
    store: &'s MemoryStore,
    slot: &'r ResultSlot,
}

impl<'r, 's> Run<'r, 's> {
    fn root(&self, task: &Task) -> ExecutorResult<Value> {
        match &task.kind {
            TaskKind::Query(_) => self.query(task.id, &[]),
            _ => evaluate_root_expression(self.ctx, self.slot, task),
        }
    }

    /// Runs a query task with `chain` holding the enclosing records, innermost first
    fn query(&self, id: TaskId, chain: &[&'s Record]) -> ExecutorResult<Value> {
        let task = self.ctx.document.task(id);
        let query = self.query_of(task)?;

        if query.cardinality == Cardinality::Count {
            let matching = self.filtered(task, query, chain)?.len() as u64;
            return Ok(Value::from(paged_len(matching, query.offset, query.limit)));
        }

        let records = self.records(task, query, chain)?;
        let mut selected = Vec::with_capacity(records.len());
        for record in records {
            selected.push(self.select(query, record, chain)?);
        }

        Ok(match query.cardinality {
            Cardinality::One => selected.into_iter().next().unwrap_or(Value::Null),
            _ => Value::Array(selected),
        })
    }

    fn query_of<'t>(&self, task: &'t Task) -> ExecutorResult<&'t Query> {
        task.query()
            .ok_or_else(|| ExecutorError::scan_mismatch(&task.name, "expected a query task"))
    }

    /// Steps 1-2
    fn filtered(&self, task: &Task, query: &Query, chain: &[&'s Record]) -> ExecutorResult<Vec<&'s Record>> {
        let rows = self
            .store
            .scan(&query.subject.record)
            .ok_or_else(|| ExecutorError::unknown_table(&task.name, &query.subject.record))?;

        let filter = FilterEvaluator::new(self.ctx.evaluator, &task.name);
        let mut kept = Vec::new();
        for row in rows {
            let scope = with_record(row, chain);
            let env = RecordEnv::new(&scope, self.slot, self.ctx.params);
            if filter.matches(&env, &query.filters)? {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    /// Steps 1-5
    fn records(&self, task: &Task, query: &Query, chain: &[&'s Record]) -> ExecutorResult<Vec<&'s Record>> {
        let mut rows = self.filtered(task, query, chain)?;

        let joined: Vec<TaskId> = query
            .selection
            .iter()
            .copied()
            .filter(|child| {
                self.ctx
                    .plan
                    .job_for(*child)
                    .map(|job| job.is_joined())
                    .unwrap_or(false)
            })
            .collect();
        if !joined.is_empty() {
            let mut kept = Vec::with_capacity(rows.len());
            for row in rows {
                if self.joins_all(row, chain, &joined)? {
                    kept.push(row);
                }
            }
            rows = kept;
        }

        RecordSorter::sort(&task.name, &mut rows, &query.order)?;
        Ok(paginate(rows, query.offset, query.limit))
    }

    fn joins_all(&self, row: &'s Record, chain: &[&'s Record], joined: &[TaskId]) -> ExecutorResult<bool> {
        let scope = with_record(row, chain);
        for &child in joined {
            let task = self.ctx.document.task(child);
            let query = self.query_of(task)?;
            if self.records(task, query, &scope)?.is_empty() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Step 6
    fn select(&self, query: &Query, row: &'s Record, chain: &[&'s Record]) -> ExecutorResult<Value> {
        if let Some(field) = &query.subject.field {
            return Ok(row.get(field).cloned().unwrap_or(Value::Null));
        }

        let scope = with_record(row, chain);
        let mut out = Map::new();
        for &child in &query.selection {
            let task = self.ctx.document.task(child);
            let value = match &task.kind {
                TaskKind::Field { key } => row.get(key).cloned().unwrap_or(Value::Null),
                TaskKind::Expression(expr) => {
                    let env = RecordEnv::new(&scope, self.slot, self.ctx.params);
                    self.ctx
                        .evaluator
                        .eval(&env, expr)
                        .map_err(|e| ExecutorError::evaluation_failed(&task.name, &e))?
                }
                TaskKind::Query(_) => self.query(child, &scope)?,
            };
            out.insert(task.name.clone(), value);
        }
        Ok(Value::Object(out))
    }
}

/// Evaluates a root expression task against the finished root results
///
/// Shared by every backend: root expressions read no table.
pub fn evaluate_root_expression(
    ctx: &ExecutionContext<'_>,
    slot: &ResultSlot,
    task: &Task,
) -> ExecutorResult<Value> {
    match &task.kind {
        TaskKind::Expression(expr) => {
            let env = RecordEnv::new(&[], slot, ctx.params);
            ctx.evaluator
                .eval(&env, expr)
                .map_err(|e| ExecutorError::evaluation_failed(&task.name, &e))
        }
        _ => Err(ExecutorError::scan_mismatch(
            &task.name,
            "expected a root expression task",
        )),
    }
}

fn with_record<'s>(row: &'s Record, chain: &[&'s Record]) -> Vec<&'s Record> {
    let mut scope = Vec::with_capacity(chain.len() + 1);
    scope.push(row);
    scope.extend_from_slice(chain);
    scope
}

/// Drops `offset` items (clamped), then keeps at most `limit` when positive
pub fn paginate<T>(items: Vec<T>, offset: u64, limit: u64) -> Vec<T> {
    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let iter = items.into_iter().skip(skip);
    if limit > 0 {
        iter.take(usize::try_from(limit).unwrap_or(usize::MAX)).collect()
    } else {
        iter.collect()
    }
}

/// Number of records [`paginate`] keeps out of `n`
pub fn paged_len(n: u64, offset: u64, limit: u64) -> u64 {
    let remaining = n.saturating_sub(offset);
    if limit > 0 {
        remaining.min(limit)
    } else {
        remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{parse, Resolver};
    use crate::expr::{Builtin, Params};
    use crate::planner::Planner;
    use crate::schema::Catalog;
    use serde_json::json;

    const CATALOG: &str = r#"{"records": {
        "shop.group": [
            {"name": "id", "type": "int", "primary_key": true, "nullable": false},
            {"name": "name", "type": "string"}
        ],
        "shop.category": [
            {"name": "id", "type": "int", "primary_key": true, "nullable": false},
            {"name": "name", "type": "string"},
            {"name": "group_id", "type": "int"}
        ],
        "shop.product": [
            {"name": "id", "type": "int", "primary_key": true, "nullable": false},
            {"name": "name", "type": "string"},
            {"name": "category", "type": "int"},
            {"name": "price", "type": "float"}
        ]
    }}"#;

    fn store() -> MemoryStore {
        MemoryStore::from_value(json!({
            "shop.group": [
                {"id": 1, "name": "Media"},
                {"id": 2, "name": "Home"}
            ],
            "shop.category": [
                {"id": 1, "name": "Music", "group_id": 1},
                {"id": 2, "name": "Books", "group_id": 1},
                {"id": 3, "name": "Garden", "group_id": 2},
                {"id": 4, "name": "Attic", "group_id": null}
            ],
            "shop.product": [
                {"id": 1, "name": "Rake", "category": 3, "price": 12.5},
                {"id": 2, "name": "Novel", "category": 2, "price": 9},
                {"id": 3, "name": "Hose", "category": 3, "price": 30.0},
                {"id": 4, "name": "Album", "category": 1, "price": null}
            ]
        }))
        .unwrap()
    }

    fn run_with(text: &str, params: &Params) -> ExecutorResult<Value> {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let document = Resolver::new(&catalog, &Builtin, params)
            .resolve(parse(text).unwrap())
            .unwrap();
        let plan = Planner::new(&document).plan().unwrap();
        let store = store();
        let ctx = ExecutionContext::new(&document, &plan, params, &Builtin);
        let mut slot = ResultSlot::new(&document);
        MemoryBackend::new(&store).execute_plan(&ctx, &mut slot)?;
        slot.into_value()
    }

    fn run(text: &str) -> Value {
        run_with(text, &Params::new()).unwrap()
    }

    #[test]
    fn test_one_returns_first_in_natural_order() {
        assert_eq!(
            run("?shop.category"),
            json!({"id": 1, "name": "Music", "group_id": 1})
        );
        assert_eq!(run("?shop.category (gt .id 10)"), Value::Null);
    }

    #[test]
    fn test_order_and_paginate() {
        assert_eq!(
            run("*shop.category :asc name :offset 1 :limit 2 + name"),
            json!([{"name": "Books"}, {"name": "Garden"}])
        );
        assert_eq!(run("*shop.category :offset 9 + id"), json!([]));
    }

    #[test]
    fn test_count_laws() {
        assert_eq!(run("#shop.product (eq .category 3)"), json!(2));
        assert_eq!(run("#shop.product :offset 1 :limit 2"), json!(2));
        assert_eq!(run("#shop.product :offset 3 :limit 2"), json!(1));
        assert_eq!(run("#shop.product :offset 7"), json!(0));
    }

    #[test]
    fn test_scalar_query() {
        assert_eq!(
            run("*shop.product.name :desc name"),
            json!(["Rake", "Novel", "Hose", "Album"])
        );
    }

    #[test]
    fn test_nested_inlined_many() {
        let value = run(
            "*shop.category (le .id 3) :asc name + name \
             +products(*shop.product (eq .category ..id) :desc price + name)",
        );
        assert_eq!(
            value,
            json!([
                {"name": "Books", "products": [{"name": "Novel"}]},
                {"name": "Garden", "products": [{"name": "Hose"}, {"name": "Rake"}]},
                {"name": "Music", "products": [{"name": "Album"}]}
            ])
        );
    }

    #[test]
    fn test_joined_child_drops_unmatched_parent() {
        let value = run(
            "*shop.category + name +grp(?shop.group.name (eq .id ..group_id))",
        );
        assert_eq!(
            value,
            json!([
                {"name": "Music", "grp": "Media"},
                {"name": "Books", "grp": "Media"},
                {"name": "Garden", "grp": "Home"}
            ])
        );
    }

    #[test]
    fn test_independent_single_child_keeps_parent() {
        let value = run("*shop.category (eq .id 4) + name +first(?shop.group + name)");
        assert_eq!(value, json!([{"name": "Attic", "first": {"name": "Media"}}]));
    }

    #[test]
    fn test_computed_fields_and_params() {
        let mut params = Params::new();
        params.insert("min".into(), json!(10));
        let value = run_with(
            "*shop.product (ge .price $min) :asc id - +label(concat .name \"!\") +double(* .price 2)",
            &params,
        )
        .unwrap();
        assert_eq!(
            value,
            json!([
                {"label": "Rake!", "double": 25.0},
                {"label": "Hose!", "double": 60.0}
            ])
        );
    }

    #[test]
    fn test_root_expression_runs_after_dependency() {
        let value = run("total: (+ /n 1)\nn: #shop.product");
        assert_eq!(value, json!({"total": 5, "n": 4}));
    }

    #[test]
    fn test_root_reference_in_filter() {
        let value = run("top: ?shop.category :asc name\nmatching: *shop.product.name (eq .category /top.id)");
        assert_eq!(value["top"]["name"], json!("Attic"));
        assert_eq!(value["matching"], json!([]));

        let value = run(
            "top: ?shop.category :asc name :offset 1\nmatching: *shop.product.name (eq .category /top.id)",
        );
        assert_eq!(value["top"]["name"], json!("Books"));
        assert_eq!(value["matching"], json!(["Novel"]));
    }

    #[test]
    fn test_not_orderable() {
        let mut store = store();
        store
            .insert(
                &crate::schema::QualifiedName::new("shop", "group"),
                json!({"id": "three", "name": "Odd"}),
            )
            .unwrap();
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let params = Params::new();
        let document = Resolver::new(&catalog, &Builtin, &params)
            .resolve(parse("*shop.group :asc id").unwrap())
            .unwrap();
        let plan = Planner::new(&document).plan().unwrap();
        let ctx = ExecutionContext::new(&document, &plan, &params, &Builtin);
        let mut slot = ResultSlot::new(&document);
        let err = MemoryBackend::new(&store)
            .execute_plan(&ctx, &mut slot)
            .unwrap_err();
        assert_eq!(err.code().code(), "AEROQL_NOT_ORDERABLE");
    }

    #[test]
    fn test_unknown_table() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let params = Params::new();
        let document = Resolver::new(&catalog, &Builtin, &params)
            .resolve(parse("*shop.group").unwrap())
            .unwrap();
        let plan = Planner::new(&document).plan().unwrap();
        let empty = MemoryStore::new();
        let ctx = ExecutionContext::new(&document, &plan, &params, &Builtin);
        let mut slot = ResultSlot::new(&document);
        let err = MemoryBackend::new(&empty)
            .execute_plan(&ctx, &mut slot)
            .unwrap_err();
        assert_eq!(err.code().code(), "AEROQL_UNKNOWN_TABLE");
    }

    #[test]
    fn test_evaluation_failure_aborts() {
        let err = run_with("#shop.product (eq (/ .id 0) 1)", &Params::new()).unwrap_err();
        assert_eq!(err.code().code(), "AEROQL_EVALUATION_FAILED");
    }

    #[test]
    fn test_paginate_law() {
        for n in 0..6u64 {
            for offset in 0..7u64 {
                for limit in 0..7u64 {
                    let items: Vec<u64> = (0..n).collect();
                    let paged = paginate(items, offset, limit);
                    assert_eq!(paged.len() as u64, paged_len(n, offset, limit));
                    let first = if paged.is_empty() { None } else { Some(offset) };
                    assert_eq!(paged.first().copied(), first);
                }
            }
        }
    }
}
