//! Pipeline facade
//!
//! Owns the configuration, the schema catalog and the expression evaluator,
//! and drives a document through parse, resolve, plan and execute. Each stage
//! is wrapped in an [`ObservationScope`].

use serde_json::Value;

use crate::config::EngineConfig;
use crate::document::{parse, Document, Resolver};
use crate::error::{QlError, QlResult};
use crate::executor::{
    Backend, ExecutionContext, ExecutorError, MemoryBackend, MemoryStore, ResultSlot,
};
use crate::expr::{Builtin, Evaluator, Params};
use crate::observability::{Logger, ObservationScope};
use crate::planner::{ExplainPlan, Plan, Planner};
use crate::schema::Catalog;
use crate::sql::{CompiledStatement, SqlBackend, SqlCompiler, SqlConnection};

/// A resolved and planned document, ready to execute any number of times
#[derive(Debug, Clone)]
pub struct Prepared {
    document: Document,
    plan: Plan,
    params: Params,
}

impl Prepared {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

/// Query engine
pub struct Engine {
    config: EngineConfig,
    catalog: Catalog,
    evaluator: Box<dyn Evaluator>,
}

impl Engine {
    /// Creates an engine; the configured log level becomes the process-wide threshold
    pub fn new(catalog: Catalog, config: EngineConfig) -> Self {
        Logger::set_min_severity(config.min_severity());
        Self {
            config,
            catalog,
            evaluator: Box::new(Builtin),
        }
    }

    /// Replaces the built-in operator set
    pub fn with_evaluator(mut self, evaluator: Box<dyn Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Parses, resolves and plans `text`
    pub fn prepare(&self, text: &str, params: Params) -> QlResult<Prepared> {
        let scope = ObservationScope::new("DOCUMENT_PARSE");
        let document = finish(scope, self.resolve(text, &params))?;

        let roots = document.roots().len().to_string();
        let scope = ObservationScope::with_fields("PLAN", &[("roots", roots.as_str())]);
        let plan = finish(scope, Planner::new(&document).plan().map_err(QlError::from))?;

        Ok(Prepared {
            document,
            plan,
            params,
        })
    }

    fn resolve(&self, text: &str, params: &Params) -> QlResult<Document> {
        let syntax = parse(text)?;
        let document = Resolver::new(&self.catalog, self.evaluator.as_ref(), params)
            .with_options(self.config.resolve_options())
            .resolve(syntax)?;
        Ok(document)
    }

    /// Runs a prepared document on `backend`
    ///
    /// All or nothing: a failing job discards every result already computed.
    pub fn execute<B>(&self, prepared: &Prepared, backend: &mut B) -> QlResult<Value>
    where
        B: Backend,
        QlError: From<B::Error>,
    {
        let jobs = prepared.plan.jobs().len().to_string();
        let scope = ObservationScope::with_fields("EXECUTE", &[("jobs", jobs.as_str())]);

        let ctx = ExecutionContext::new(
            &prepared.document,
            &prepared.plan,
            &prepared.params,
            self.evaluator.as_ref(),
        );
        let mut slot = ResultSlot::new(&prepared.document);
        let result = backend
            .execute_plan(&ctx, &mut slot)
            .map_err(QlError::from)
            .and_then(|_| {
                slot.into_value()
                    .map_err(<QlError as From<ExecutorError>>::from)
            });
        finish(scope, result)
    }

    /// Prepares and runs `text` against an in-memory store
    pub fn query(&self, text: &str, params: Params, store: &MemoryStore) -> QlResult<Value> {
        let prepared = self.prepare(text, params)?;
        self.execute(&prepared, &mut MemoryBackend::new(store))
    }

    /// Runs a prepared document over a relational connection
    pub fn query_sql<C: SqlConnection>(&self, prepared: &Prepared, connection: C) -> QlResult<Value> {
        let mut backend = SqlBackend::new(connection, self.config.sql.clone());
        self.execute(prepared, &mut backend)
    }

    /// Compiles every root query of a prepared document to SQL
    pub fn compile_sql(&self, prepared: &Prepared) -> QlResult<Vec<CompiledStatement>> {
        let scope = ObservationScope::new("SQL_COMPILE");
        let result = SqlCompiler::new(
            &prepared.document,
            &prepared.plan,
            &prepared.params,
            &self.config.sql,
        )
        .compile_plan()
        .map_err(QlError::from);
        finish(scope, result)
    }

    pub fn explain(&self, prepared: &Prepared) -> ExplainPlan {
        ExplainPlan::from_plan(&prepared.plan, &prepared.document)
    }
}

/// Closes `scope` according to `result`
fn finish<T>(scope: ObservationScope<'_>, result: QlResult<T>) -> QlResult<T> {
    match &result {
        Ok(_) => scope.complete(),
        Err(err) => scope.fail(err.code(), &err.message()),
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> Engine {
        let catalog = Catalog::from_json(
            r#"{"records": {
                "shop.category": [
                    {"name": "id", "type": "int", "primary_key": true, "nullable": false},
                    {"name": "name", "type": "string"}
                ]
            }}"#,
        )
        .unwrap();
        let config = EngineConfig {
            default_schema: Some("shop".into()),
            ..EngineConfig::default()
        };
        Engine::new(catalog, config)
    }

    fn store() -> MemoryStore {
        MemoryStore::from_value(json!({
            "shop.category": [{"id": 2, "name": "Books"}, {"id": 1, "name": "Music"}]
        }))
        .unwrap()
    }

    #[test]
    fn test_query_with_default_schema() {
        let value = engine()
            .query("*category :asc id + name", Params::new(), &store())
            .unwrap();
        assert_eq!(value, json!([{"name": "Music"}, {"name": "Books"}]));
    }

    #[test]
    fn test_prepared_document_runs_twice() {
        let engine = engine();
        let prepared = engine.prepare("n: #category\nfirst: ?category", Params::new()).unwrap();
        let store = store();
        let a = engine.execute(&prepared, &mut MemoryBackend::new(&store)).unwrap();
        let b = engine.execute(&prepared, &mut MemoryBackend::new(&store)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a["n"], json!(2));
    }

    #[test]
    fn test_stage_errors_keep_their_codes() {
        let engine = engine();
        let err = engine.prepare("*category (", Params::new()).unwrap_err();
        assert_eq!(err.stage(), "parse");

        let err = engine.prepare("*shop.missing", Params::new()).unwrap_err();
        assert_eq!(err.code(), "AEROQL_MISSING_MODEL");

        let err = engine.prepare("a: (+ /b 1)\nb: (+ /a 1)", Params::new()).unwrap_err();
        assert_eq!(err.code(), "AEROQL_CYCLIC_DEPENDENCY");
    }

    #[test]
    fn test_compile_sql() {
        let engine = engine();
        let prepared = engine.prepare("*category :asc name + name", Params::new()).unwrap();
        let statements = engine.compile_sql(&prepared).unwrap();
        assert_eq!(
            statements[0].sql,
            "SELECT c.name FROM shop.category c ORDER BY c.name COLLATE \"C\" ASC"
        );
    }

    #[test]
    fn test_explain() {
        let engine = engine();
        let prepared = engine.prepare("*category", Params::new()).unwrap();
        let explain = engine.explain(&prepared);
        assert!(explain.accepted);
        assert_eq!(explain.execution_order, vec!["result".to_string()]);
    }
}
