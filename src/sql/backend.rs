//! SQL backend: compiled statements over a relational connection

use serde_json::{Map, Value};

use super::compiler::{CompiledStatement, SqlCompiler};
use super::context::ParamSource;
use super::errors::{CompileResult, ConnectionError, SqlBackendError};
use crate::config::SqlConfig;
use crate::document::{Cardinality, Query, Task, TaskKind};
use crate::executor::{
    evaluate_root_expression, follow_path, Backend, ExecutionContext, ExecutorError, ExecutorResult,
    ResultSlot,
};
use crate::expr::Params;
use crate::observability::Logger;

/// A relational connection
///
/// Returns every row of the statement as a list of column values; JSON
/// columns arrive as parsed JSON.
pub trait SqlConnection {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, ConnectionError>;
}

impl<C: SqlConnection + ?Sized> SqlConnection for &mut C {
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, ConnectionError> {
        (**self).query(sql, params)
    }
}

/// Backend compiling every root query to one statement
pub struct SqlBackend<C: SqlConnection> {
    connection: C,
    config: SqlConfig,
}

impl<C: SqlConnection> SqlBackend<C> {
    pub fn new(connection: C, config: SqlConfig) -> Self {
        Self { connection, config }
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Compiles every root query job of the plan
    pub fn compile(&self, ctx: &ExecutionContext<'_>) -> CompileResult<Vec<CompiledStatement>> {
        SqlCompiler::new(ctx.document, ctx.plan, ctx.params, &self.config).compile_plan()
    }
}

impl<C: SqlConnection> Backend for SqlBackend<C> {
    type Error = SqlBackendError;

    /// Compiles everything before sending anything, then runs root jobs in
    /// dependency order
    fn execute_plan(&mut self, ctx: &ExecutionContext<'_>, slot: &mut ResultSlot) -> Result<(), SqlBackendError> {
        let statements = self.compile(ctx)?;

        for &job in ctx.plan.execution_order() {
            let task = ctx.document.task(ctx.plan.job(job).primary);
            let value = match &task.kind {
                TaskKind::Query(query) => {
                    let statement = statements
                        .iter()
                        .find(|s| s.task == task.id)
                        .ok_or_else(|| ExecutorError::scan_mismatch(&task.name, "no statement compiled"))?;
                    let values = bind(statement, ctx.params, slot)?;

                    let bound = values.len().to_string();
                    Logger::trace(
                        "SQL_STATEMENT",
                        &[
                            ("task", task.name.as_str()),
                            ("sql", statement.sql.as_str()),
                            ("params", bound.as_str()),
                        ],
                    );
                    let rows = self
                        .connection
                        .query(&statement.sql, &values)
                        .map_err(|e| ExecutorError::connection_failed(e.message))?;
                    decode(task, query, statement, rows)?
                }
                _ => evaluate_root_expression(ctx, slot, task)?,
            };
            slot.fill(task.id, value)?;
        }
        Ok(())
    }
}

/// Parameter values in placeholder order
fn bind(statement: &CompiledStatement, params: &Params, slot: &ResultSlot) -> ExecutorResult<Vec<Value>> {
    statement
        .params
        .iter()
        .map(|source| match source {
            ParamSource::External(name) => params.get(name).cloned().ok_or_else(|| {
                ExecutorError::scan_mismatch(&statement.task.to_string(), format!("parameter {} is not bound", source))
            }),
            ParamSource::RootResult { task, path } => slot
                .get_by_name(task)
                .map(|value| follow_path(value, path))
                .ok_or_else(|| {
                    ExecutorError::scan_mismatch(task, format!("{} read before it finished", source))
                }),
        })
        .collect()
}

/// Rebuilds a task result from statement rows
fn decode(task: &Task, query: &Query, statement: &CompiledStatement, rows: Vec<Vec<Value>>) -> ExecutorResult<Value> {
    let width = if statement.columns.is_empty() {
        1
    } else {
        statement.columns.len()
    };
    if let Some(row) = rows.iter().find(|row| row.len() != width) {
        return Err(ExecutorError::scan_mismatch(
            &task.name,
            format!("expected {} columns, got {}", width, row.len()),
        ));
    }

    if query.cardinality == Cardinality::Count {
        return match rows.into_iter().next().and_then(|row| row.into_iter().next()) {
            Some(count) => Ok(count),
            None => Err(ExecutorError::scan_mismatch(&task.name, "count returned no row")),
        };
    }

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        if statement.columns.is_empty() {
            values.extend(row.into_iter().next());
        } else {
            let record: Map<String, Value> = statement.columns.iter().cloned().zip(row).collect();
            values.push(Value::Object(record));
        }
    }

    Ok(match query.cardinality {
        Cardinality::One => values.into_iter().next().unwrap_or(Value::Null),
        _ => Value::Array(values),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{parse, Resolver};
    use crate::expr::Builtin;
    use crate::planner::Planner;
    use crate::schema::Catalog;
    use serde_json::json;

    const CATALOG: &str = r#"{"records": {
        "shop.category": [
            {"name": "id", "type": "int", "primary_key": true, "nullable": false},
            {"name": "name", "type": "string"}
        ],
        "shop.product": [
            {"name": "id", "type": "int", "primary_key": true, "nullable": false},
            {"name": "category", "type": "int"},
            {"name": "price", "type": "float"}
        ]
    }}"#;

    /// Replays canned rows and records every call
    struct Scripted {
        rows: Vec<Vec<Vec<Value>>>,
        calls: Vec<(String, Vec<Value>)>,
    }

    impl SqlConnection for Scripted {
        fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Vec<Value>>, ConnectionError> {
            self.calls.push((sql.to_string(), params.to_vec()));
            if self.rows.is_empty() {
                return Err(ConnectionError::new("no more rows scripted"));
            }
            Ok(self.rows.remove(0))
        }
    }

    fn execute(text: &str, params: &Params, rows: Vec<Vec<Vec<Value>>>) -> (Result<Value, SqlBackendError>, Scripted) {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let document = Resolver::new(&catalog, &Builtin, params)
            .resolve(parse(text).unwrap())
            .unwrap();
        let plan = Planner::new(&document).plan().unwrap();
        let ctx = ExecutionContext::new(&document, &plan, params, &Builtin);
        let mut slot = ResultSlot::new(&document);
        let mut backend = SqlBackend::new(
            Scripted {
                rows,
                calls: Vec::new(),
            },
            SqlConfig::default(),
        );
        let result = backend
            .execute_plan(&ctx, &mut slot)
            .and_then(|_| slot.into_value().map_err(SqlBackendError::from));
        (result, backend.into_connection())
    }

    #[test]
    fn test_decode_records_in_type_order() {
        let (result, conn) = execute(
            "*shop.category + name +products(*shop.product (eq .category ..id) + id price)",
            &Params::new(),
            vec![vec![
                vec![json!("Books"), json!([{"price": 9, "id": 2}])],
                vec![json!("Toys"), json!([])],
            ]],
        );
        let value = result.unwrap();
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            r#"[{"name":"Books","products":[{"id":2,"price":9.0}]},{"name":"Toys","products":[]}]"#
        );
        assert_eq!(conn.calls.len(), 1);
    }

    #[test]
    fn test_root_results_bound_as_parameters() {
        let mut params = Params::new();
        params.insert("min".into(), json!(5));
        let (result, conn) = execute(
            "top: ?shop.category\nn: #shop.product (eq .category /top.id) (gt .price $min)\nm: (+ /n 1)",
            &params,
            vec![
                vec![vec![json!(3), json!("Garden")]],
                vec![vec![json!(2)]],
            ],
        );
        assert_eq!(
            result.unwrap(),
            json!({"top": {"id": 3, "name": "Garden"}, "n": 2, "m": 3})
        );
        assert_eq!(conn.calls[1].1, vec![json!(3), json!(5)]);
    }

    #[test]
    fn test_one_without_rows_is_null() {
        let (result, _) = execute("?shop.category", &Params::new(), vec![vec![]]);
        assert_eq!(result.unwrap(), Value::Null);
    }

    #[test]
    fn test_compile_errors_precede_any_statement() {
        let (result, conn) = execute(
            "a: #shop.category\nb: *shop.product (gt .price $missing)",
            &Params::new(),
            vec![vec![vec![json!(1)]]],
        );
        let err = result.unwrap_err();
        assert_eq!(err.code(), "AEROQL_UNRESOLVED_EXTERNAL_SYMBOL");
        assert!(conn.calls.is_empty());
    }

    #[test]
    fn test_connection_failure_aborts() {
        let (result, _) = execute("#shop.category", &Params::new(), vec![]);
        assert_eq!(result.unwrap_err().code(), "AEROQL_CONNECTION_FAILED");
    }

    #[test]
    fn test_row_width_mismatch() {
        let (result, _) = execute("*shop.category", &Params::new(), vec![vec![vec![json!(1)]]]);
        assert_eq!(result.unwrap_err().code(), "AEROQL_SCAN_MISMATCH");
    }
}
