//! Explain plan output
//!
//! Produces deterministic, human-readable explain output for a planned document.

use std::fmt;

use serde_json::{json, Value};

use super::errors::PlannerError;
use super::job::{JobId, Plan};
use crate::document::Document;

/// Description of one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobExplain {
    /// Nesting depth; root jobs are 0
    pub depth: usize,
    pub id: JobId,
    /// Name of the primary task
    pub task: String,
    pub flags: String,
    /// `schema.model[.field] AS alias`, absent for expression jobs
    pub subject: Option<String>,
    /// Aliases of every FROM source
    pub tables: Vec<String>,
    /// `key` or `key <- jN` for columns computed by another job
    pub columns: Vec<String>,
    pub filters: Vec<String>,
    pub order: Vec<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub dependencies: Vec<String>,
    /// Residual expression of a root expression job
    pub expression: Option<String>,
}

/// Explain plan output
#[derive(Debug, Clone)]
pub struct ExplainPlan {
    /// Whether planning succeeded
    pub accepted: bool,
    /// Root task names in execution order
    pub execution_order: Vec<String>,
    /// Jobs in pre-order, roots in declaration order
    pub jobs: Vec<JobExplain>,
    /// Rejection reason (if rejected)
    pub rejection_reason: Option<String>,
    /// Rejection error code (if rejected)
    pub rejection_code: Option<String>,
}

impl ExplainPlan {
    /// Creates an explain plan from a successful plan
    pub fn from_plan(plan: &Plan, document: &Document) -> Self {
        let mut jobs = Vec::new();
        for &root in plan.roots() {
            describe(plan, document, root, 0, &mut jobs);
        }

        let execution_order = plan
            .execution_order()
            .iter()
            .map(|job| document.task(plan.job(*job).primary).name.clone())
            .collect();

        Self {
            accepted: true,
            execution_order,
            jobs,
            rejection_reason: None,
            rejection_code: None,
        }
    }

    /// Creates an explain plan from a planning error
    pub fn from_error(err: &PlannerError) -> Self {
        Self::rejected(err.code().code(), err.message())
    }

    /// Creates an explain plan for a document rejected at any stage
    pub fn rejected(code: &str, reason: &str) -> Self {
        Self {
            accepted: false,
            execution_order: Vec::new(),
            jobs: Vec::new(),
            rejection_reason: Some(reason.to_string()),
            rejection_code: Some(code.to_string()),
        }
    }
}

impl ExplainPlan {
    /// Structured form of the explain output
    pub fn to_json(&self) -> Value {
        if !self.accepted {
            return json!({
                "accepted": false,
                "code": self.rejection_code,
                "reason": self.rejection_reason,
            });
        }
        let jobs: Vec<Value> = self
            .jobs
            .iter()
            .map(|job| {
                json!({
                    "job": job.id.to_string(),
                    "task": job.task,
                    "depth": job.depth,
                    "flags": job.flags,
                    "subject": job.subject,
                    "tables": job.tables,
                    "columns": job.columns,
                    "filters": job.filters,
                    "order": job.order,
                    "limit": job.limit,
                    "offset": job.offset,
                    "dependencies": job.dependencies,
                    "expression": job.expression,
                })
            })
            .collect();
        json!({
            "accepted": true,
            "execution_order": self.execution_order,
            "jobs": jobs,
        })
    }
}

fn describe(plan: &Plan, document: &Document, id: JobId, depth: usize, out: &mut Vec<JobExplain>) {
    let job = plan.job(id);
    let task = document.task(job.primary);
    let query = task.query();

    let alias_of = |task| plan.alias(task).unwrap_or("?").to_string();

    let columns = job
        .columns
        .iter()
        .map(|c| {
            if c.producing_job == id {
                c.key.clone()
            } else {
                format!("{} <- {}", c.key, c.producing_job)
            }
        })
        .collect();

    let dependencies = job
        .dependencies
        .iter()
        .map(|d| {
            let name = &document.task(*d).name;
            match plan.alias(*d) {
                Some(alias) => format!("{} ({})", name, alias),
                None => name.clone(),
            }
        })
        .collect();

    out.push(JobExplain {
        depth,
        id,
        task: task.name.clone(),
        flags: job.flags.names(),
        subject: query.map(|q| format!("{} AS {}", q.subject, alias_of(job.primary))),
        tables: job.tables.iter().map(|t| alias_of(*t)).collect(),
        columns,
        filters: query
            .map(|q| q.filters.iter().map(|f| f.to_string()).collect())
            .unwrap_or_default(),
        order: query
            .map(|q| {
                q.order
                    .iter()
                    .map(|o| format!("{} {}", o.key, if o.descending { "DESC" } else { "ASC" }))
                    .collect()
            })
            .unwrap_or_default(),
        limit: query.map(|q| q.limit).filter(|l| *l > 0),
        offset: query.map(|q| q.offset).filter(|o| *o > 0),
        dependencies,
        expression: match &task.kind {
            crate::document::TaskKind::Expression(expr) => Some(expr.to_string()),
            _ => None,
        },
    });

    for &child in &job.children {
        describe(plan, document, child, depth + 1, out);
    }
}

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== EXPLAIN PLAN ===")?;

        if !self.accepted {
            writeln!(f, "Status: REJECTED")?;
            if let Some(code) = &self.rejection_code {
                writeln!(f, "Error Code: {}", code)?;
            }
            if let Some(reason) = &self.rejection_reason {
                writeln!(f, "Reason: {}", reason)?;
            }
            return Ok(());
        }

        writeln!(f, "Status: ACCEPTED")?;
        writeln!(f, "Execution Order: {}", self.execution_order.join(", "))?;
        for job in &self.jobs {
            let pad = "  ".repeat(job.depth);
            writeln!(f, "{}Job {} [{}] {}", pad, job.id, job.task, job.flags)?;
            if let Some(subject) = &job.subject {
                writeln!(f, "{}  Subject: {}", pad, subject)?;
            }
            if let Some(expr) = &job.expression {
                writeln!(f, "{}  Expression: {}", pad, expr)?;
            }
            if job.tables.len() > 1 {
                writeln!(f, "{}  Tables: {}", pad, job.tables.join(", "))?;
            }
            if !job.columns.is_empty() {
                writeln!(f, "{}  Columns: {}", pad, job.columns.join(", "))?;
            }
            for filter in &job.filters {
                writeln!(f, "{}  Where: {}", pad, filter)?;
            }
            if !job.order.is_empty() {
                writeln!(f, "{}  Order: {}", pad, job.order.join(", "))?;
            }
            if let Some(limit) = job.limit {
                writeln!(f, "{}  Limit: {}", pad, limit)?;
            }
            if let Some(offset) = job.offset {
                writeln!(f, "{}  Offset: {}", pad, offset)?;
            }
            if !job.dependencies.is_empty() {
                writeln!(f, "{}  Depends On: {}", pad, job.dependencies.join(", "))?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{parse, Resolver};
    use crate::expr::{Builtin, Params};
    use crate::planner::Planner;
    use crate::schema::Catalog;

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

    fn explain(text: &str) -> String {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let params = Params::new();
        let document = Resolver::new(&catalog, &Builtin, &params)
            .resolve(parse(text).unwrap())
            .unwrap();
        let plan = Planner::new(&document).plan().unwrap();
        ExplainPlan::from_plan(&plan, &document).to_string()
    }

    #[test]
    fn test_explain_nested_plan() {
        let output = explain("*shop.category :asc name +products(*shop.product (eq .category ..id) :desc price)");
        let expected = "\
=== EXPLAIN PLAN ===
Status: ACCEPTED
Execution Order: result
Job j0 [result] MULTI|INLINING
  Subject: shop.category AS c
  Columns: id, name, products <- j1
  Order: name ASC
  Job j1 [products] MULTI|INLINED|AGGREGATE_AS_DOCUMENT
    Subject: shop.product AS p
    Columns: id, category, price
    Where: (eq .category ..id)
    Order: price DESC
    Depends On: result (c)
";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_explain_json() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        let params = Params::new();
        let document = Resolver::new(&catalog, &Builtin, &params)
            .resolve(parse("*shop.category +n(#shop.product (eq .category ..id))").unwrap())
            .unwrap();
        let plan = Planner::new(&document).plan().unwrap();
        let value = ExplainPlan::from_plan(&plan, &document).to_json();

        assert_eq!(value["accepted"], true);
        assert_eq!(value["jobs"][0]["job"], "j0");
        assert_eq!(value["jobs"][1]["task"], "n");
        assert_eq!(value["jobs"][1]["depth"], 1);
        assert_eq!(value["jobs"][0]["limit"], Value::Null);
    }

    #[test]
    fn test_explain_rejected_plan() {
        let err = PlannerError::cyclic_dependency(&["a", "b"]);
        let explain = ExplainPlan::from_error(&err);

        assert!(!explain.accepted);
        assert_eq!(
            explain.rejection_code,
            Some("AEROQL_CYCLIC_DEPENDENCY".into())
        );

        let output = format!("{}", explain);
        assert!(output.contains("REJECTED"));
        assert!(output.contains("a, b"));
    }

    #[test]
    fn test_explain_deterministic() {
        let text = "n: #shop.product :limit 3\nm: (+ /n 1)";
        assert_eq!(explain(text), explain(text));
        assert!(explain(text).contains("Depends On: n (p)"));
    }
}
