//! SQL compiler
//!
//! Renders one root job, with its joined and inlined children, into one
//! parameterized PostgreSQL statement:
//!
//! - joined children become `CROSS JOIN LATERAL` subqueries in the parent's
//!   FROM clause, keeping their own order and paging
//! - inlined children become correlated subqueries in the select list,
//!   aggregated into JSON when they yield more than one value
//! - `$name` and `/task` symbols become positional parameters

use serde_json::Value;

use super::context::{CompileContext, ParamSource};
use super::errors::{CompileError, CompileResult};
use crate::config::SqlConfig;
use crate::document::{Cardinality, Document, Query, TaskId, TaskKind};
use crate::expr::{Expr, Operator, Params, Symbol};
use crate::planner::{JobFlags, JobId, Plan};
use crate::schema::FieldType;

/// Column holding the value of a joined child's lateral subquery
const JOINED_VALUE: &str = "value";

/// One compiled root query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledStatement {
    /// Root task the statement computes
    pub task: TaskId,
    pub sql: String,
    /// Source of each positional parameter; `$1` is the first
    pub params: Vec<ParamSource>,
    /// Output keys of a record query in select order; empty for counts and field paths
    pub columns: Vec<String>,
}

/// A rendered select-list item
struct SelectItem {
    name: String,
    sql: String,
    /// A bare `alias.key` column already named `name`
    plain: bool,
}

/// Compiles the root jobs of one plan
pub struct SqlCompiler<'a> {
    document: &'a Document,
    plan: &'a Plan,
    params: &'a Params,
    config: &'a SqlConfig,
}

impl<'a> SqlCompiler<'a> {
    pub fn new(document: &'a Document, plan: &'a Plan, params: &'a Params, config: &'a SqlConfig) -> Self {
        Self {
            document,
            plan,
            params,
            config,
        }
    }

    /// Compiles every root query job, in execution order
    ///
    /// Root expression jobs read no table and are not compiled.
    pub fn compile_plan(&self) -> CompileResult<Vec<CompiledStatement>> {
        self.plan
            .execution_order()
            .iter()
            .filter(|job| !self.plan.job(**job).is_expression())
            .map(|job| self.compile(*job))
            .collect()
    }

    /// Compiles one query job into a standalone statement
    pub fn compile(&self, job: JobId) -> CompileResult<CompiledStatement> {
        let task = self.plan.job(job).primary;
        let query = self.query(task)?;

        let mut ctx = CompileContext::new();
        let sql = self.select(job, &mut ctx)?;

        let columns = if query.cardinality == Cardinality::Count || query.is_scalar() {
            Vec::new()
        } else {
            query
                .selection
                .iter()
                .map(|child| self.document.task(*child).name.clone())
                .collect()
        };

        Ok(CompiledStatement {
            task,
            sql,
            params: ctx.into_params(),
            columns,
        })
    }

    fn query(&self, task: TaskId) -> CompileResult<&'a Query> {
        let document = self.document;
        let task = document.task(task);
        task.query()
            .ok_or_else(|| CompileError::unsupported_operator(&task.name, "a bare expression as a query"))
    }

    fn alias(&self, task: TaskId) -> CompileResult<&'a str> {
        let plan = self.plan;
        plan.alias(task).ok_or_else(|| {
            let name = &self.document.task(task).name;
            CompileError::unresolved_external_symbol(name, format!("alias of '{}'", name))
        })
    }

    /// `SELECT ... FROM ... [WHERE] [ORDER BY] [LIMIT] [OFFSET]` for a query job
    fn select(&self, id: JobId, ctx: &mut CompileContext) -> CompileResult<String> {
        let primary = self.plan.job(id).primary;
        let task = self.document.task(primary);
        let query = self.query(primary)?;
        let alias = self.alias(primary)?;

        if query.is_scalar()
            && (!self.config.allow_field_queries || query.cardinality == Cardinality::Count)
        {
            return Err(CompileError::field_query_not_supported(&task.name, &query.subject));
        }

        let items = match (&query.subject.field, query.cardinality) {
            (_, Cardinality::Count) => "COUNT(*)".to_string(),
            (Some(field), _) => format!("{}.{}", alias, field),
            (None, _) => self
                .items(primary, ctx)?
                .into_iter()
                .map(|item| {
                    if item.plain {
                        item.sql
                    } else {
                        format!("{} AS \"{}\"", item.sql, item.name)
                    }
                })
                .collect::<Vec<_>>()
                .join(", "),
        };
        self.statement(primary, &items, ctx)
    }

    /// A joined single child as a lateral subquery yielding its value in one column
    ///
    /// The subquery keeps the child's own order and paging; an empty result
    /// drops the parent row.
    fn joined(&self, child: TaskId, ctx: &mut CompileContext) -> CompileResult<String> {
        let name = &self.document.task(child).name;
        let query = self.query(child)?;
        let alias = self.alias(child)?;

        let value = match &query.subject.field {
            Some(field) => {
                if !self.config.allow_field_queries {
                    return Err(CompileError::field_query_not_supported(name, &query.subject));
                }
                format!("{}.{}", alias, field)
            }
            None => {
                let pairs: Vec<String> = self
                    .items(child, ctx)?
                    .into_iter()
                    .map(|item| format!("{}, {}", quote(&item.name), item.sql))
                    .collect();
                format!("{}({})", self.config.build_object_function, pairs.join(", "))
            }
        };
        self.statement(child, &format!("{} AS {}", value, JOINED_VALUE), ctx)
    }

    /// Wraps select-list `items` in the FROM, WHERE, ORDER BY and paging of a query task
    fn statement(&self, task: TaskId, items: &str, ctx: &mut CompileContext) -> CompileResult<String> {
        let name = &self.document.task(task).name;
        let query = self.query(task)?;
        let alias = self.alias(task)?;
        let counted = query.cardinality == Cardinality::Count;

        let mut body = format!("FROM {} {}", query.subject.record, alias);
        if !counted {
            for child in self.joined_children(query) {
                let lateral = self.joined(child, ctx)?;
                body.push_str(&format!(" CROSS JOIN LATERAL ({}) {}", lateral, self.alias(child)?));
            }
        }

        let mut conjuncts = Vec::with_capacity(query.filters.len());
        for filter in &query.filters {
            conjuncts.push(self.expression(filter, Some(task), name, ctx)?);
        }
        if !conjuncts.is_empty() {
            body.push_str(" WHERE ");
            body.push_str(&conjuncts.join(" AND "));
        }

        let mut paging = String::new();
        if query.limit > 0 {
            paging.push_str(&format!(" LIMIT {}", query.limit));
        }
        if query.offset > 0 {
            paging.push_str(&format!(" OFFSET {}", query.offset));
        }

        if counted {
            if paging.is_empty() {
                return Ok(format!("SELECT COUNT(*) {}", body));
            }
            let rows = ctx.row_alias();
            return Ok(format!("SELECT COUNT(*) FROM (SELECT 1 {}{}) {}", body, paging, rows));
        }

        let mut sql = format!("SELECT {} {}", items, body);
        if !query.order.is_empty() {
            let keys: Vec<String> = query
                .order
                .iter()
                .map(|o| {
                    format!(
                        "{}.{}{} {}",
                        alias,
                        o.key,
                        self.collation(query, &o.key),
                        if o.descending { "DESC" } else { "ASC" }
                    )
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }
        sql.push_str(&paging);
        Ok(sql)
    }

    /// Selected children placed in the parent's FROM clause
    fn joined_children(&self, query: &Query) -> Vec<TaskId> {
        query
            .selection
            .iter()
            .copied()
            .filter(|child| {
                self.plan
                    .job_for(*child)
                    .map(|job| job.is_joined())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// `COLLATE` clause for a string order key
    fn collation(&self, query: &Query, key: &str) -> String {
        let is_string = query
            .subject_type
            .field(key)
            .map(|def| def.field_type == FieldType::String)
            .unwrap_or(false);
        match &self.config.string_collation {
            Some(collation) if is_string => format!(" COLLATE \"{}\"", collation),
            _ => String::new(),
        }
    }

    /// Select-list items of a record query, in selection order
    ///
    /// Joined children read the value column of their lateral subquery.
    fn items(&self, task: TaskId, ctx: &mut CompileContext) -> CompileResult<Vec<SelectItem>> {
        let query = self.query(task)?;
        let alias = self.alias(task)?;

        let mut items = Vec::with_capacity(query.selection.len());
        for &child in &query.selection {
            let child_task = self.document.task(child);
            let name = child_task.name.clone();
            let item = match &child_task.kind {
                TaskKind::Field { key } => SelectItem {
                    plain: *key == name,
                    sql: format!("{}.{}", alias, key),
                    name,
                },
                TaskKind::Expression(expr) => SelectItem {
                    sql: self.expression(expr, Some(task), &name, ctx)?,
                    name,
                    plain: false,
                },
                TaskKind::Query(_) => {
                    let job = self.plan.job_for(child).ok_or_else(|| {
                        CompileError::unresolved_external_symbol(&name, format!("job of '{}'", name))
                    })?;
                    let sql = if job.is_joined() {
                        format!("{}.{}", self.alias(child)?, JOINED_VALUE)
                    } else {
                        self.inline(job.id, ctx)?
                    };
                    SelectItem {
                        name,
                        sql,
                        plain: false,
                    }
                }
            };
            items.push(item);
        }
        Ok(items)
    }

    /// A correlated subquery yielding one value per parent row
    fn inline(&self, id: JobId, ctx: &mut CompileContext) -> CompileResult<String> {
        let job = self.plan.job(id);
        let query = self.query(job.primary)?;

        if job.flags.contains(JobFlags::AGGREGATE_AS_DOCUMENT) {
            let rows = ctx.row_alias();
            let inner = self.select(id, ctx)?;
            let element = match &query.subject.field {
                Some(field) => format!("{}.{}", rows, field),
                None => format!("{}.*", rows),
            };
            return Ok(format!(
                "(SELECT COALESCE({}({}), '[]'::jsonb) FROM ({}) {})",
                self.config.aggregate_function, element, inner, rows
            ));
        }

        if query.cardinality == Cardinality::One && !query.is_scalar() {
            let rows = ctx.row_alias();
            let inner = self.select(id, ctx)?;
            return Ok(format!(
                "(SELECT {}({}.*) FROM ({}) {})",
                self.config.object_function, rows, inner, rows
            ));
        }

        Ok(format!("({})", self.select(id, ctx)?))
    }

    /// Translates a scalar expression; `context` is the query whose record `.key` names
    fn expression(
        &self,
        expr: &Expr,
        context: Option<TaskId>,
        task: &str,
        ctx: &mut CompileContext,
    ) -> CompileResult<String> {
        self.render(expr, context, task, ctx, false)
    }

    fn render(
        &self,
        expr: &Expr,
        context: Option<TaskId>,
        task: &str,
        ctx: &mut CompileContext,
        nested: bool,
    ) -> CompileResult<String> {
        match expr {
            Expr::Literal(value) => literal(value).ok_or_else(|| {
                CompileError::unsupported_operator(task, format!("the literal {}", value))
            }),
            Expr::Symbol(symbol) => self.symbol(symbol, context, task, ctx),
            Expr::Call { op, args } => {
                let mut rendered = Vec::with_capacity(args.len());
                for arg in args {
                    rendered.push(self.render(arg, context, task, ctx, true)?);
                }
                let arity = |ok: bool| {
                    if ok {
                        Ok(())
                    } else {
                        Err(CompileError::unsupported_operator(
                            task,
                            format!("'{}' with {} operands", op.name(), args.len()),
                        ))
                    }
                };

                let sql = match op {
                    Operator::Coalesce => {
                        arity(!rendered.is_empty())?;
                        return Ok(format!("COALESCE({})", rendered.join(", ")));
                    }
                    Operator::Not => {
                        arity(rendered.len() == 1)?;
                        format!("NOT {}", rendered[0])
                    }
                    Operator::Sub if rendered.len() == 1 => format!("-{}", rendered[0]),
                    op if op.is_comparison() => {
                        arity(rendered.len() == 2)?;
                        format!("{} {} {}", rendered[0], infix(*op), rendered[1])
                    }
                    Operator::And | Operator::Or | Operator::Concat => {
                        arity(!rendered.is_empty())?;
                        rendered.join(&format!(" {} ", infix(*op)))
                    }
                    _ => {
                        arity(rendered.len() >= 2)?;
                        rendered.join(&format!(" {} ", infix(*op)))
                    }
                };
                Ok(if nested { format!("({})", sql) } else { sql })
            }
        }
    }

    fn symbol(
        &self,
        symbol: &Symbol,
        context: Option<TaskId>,
        task: &str,
        ctx: &mut CompileContext,
    ) -> CompileResult<String> {
        match symbol {
            Symbol::Field { depth, key } => {
                let alias = context
                    .and_then(|c| self.document.ancestor(c, *depth))
                    .and_then(|t| self.plan.alias(t))
                    .ok_or_else(|| CompileError::unresolved_external_symbol(task, symbol))?;
                Ok(format!("{}.{}", alias, key))
            }
            Symbol::Root { task: root, path } => {
                if self.document.root_by_name(root).is_none() {
                    return Err(CompileError::unresolved_external_symbol(task, symbol));
                }
                Ok(ctx.bind(ParamSource::RootResult {
                    task: root.clone(),
                    path: path.clone(),
                }))
            }
            Symbol::Param(name) => {
                if !self.params.contains_key(name) {
                    return Err(CompileError::unresolved_external_symbol(task, symbol));
                }
                Ok(ctx.bind(ParamSource::External(name.clone())))
            }
        }
    }
}

fn infix(op: Operator) -> &'static str {
    match op {
        Operator::Eq => "=",
        Operator::Ne => "<>",
        Operator::Lt => "<",
        Operator::Le => "<=",
        Operator::Gt => ">",
        Operator::Ge => ">=",
        Operator::And => "AND",
        Operator::Or => "OR",
        Operator::Not => "NOT",
        Operator::Add => "+",
        Operator::Sub => "-",
        Operator::Mul => "*",
        Operator::Div => "/",
        Operator::Concat => "||",
        Operator::Coalesce => "COALESCE",
    }
}

/// Inline SQL for a scalar literal
fn literal(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("NULL".to_string()),
        Value::Bool(true) => Some("TRUE".to_string()),
        Value::Bool(false) => Some("FALSE".to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(quote(s)),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// `'text'` with embedded quotes doubled
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}
