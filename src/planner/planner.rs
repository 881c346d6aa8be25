//! Job graph construction
//!
//! Planning steps, per document:
//! 1. Assign an alias to every query task (pre-order, roots in declaration order)
//! 2. Create one job per root task and classify it from its cardinality
//! 3. Collect each job's dependencies from its filters and computed fields
//! 4. Plan nested queries recursively and place each child: joined into the
//!    parent's FROM clause, or inlined as a subquery in the parent's select list
//! 5. Order root jobs so referenced roots run first
//!
//! The planner is a pure function of the resolved document: the same document
//! always yields the same plan.

use indexmap::IndexMap;

use super::errors::{PlannerError, PlannerResult};
use super::job::{Column, Job, JobFlags, JobId, Plan};
use crate::document::{Cardinality, Document, TaskId, TaskKind};
use crate::expr::{Expr, Symbol};

/// Highest digit suffix tried when allocating an alias
const MAX_ALIAS_SUFFIX: u32 = 9;

/// PostgreSQL keywords that cannot name a table alias
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end",
    "except", "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant",
    "group", "having", "ilike", "in", "initially", "inner", "intersect", "into", "is",
    "isnull", "join", "lateral", "leading", "left", "like", "limit", "localtime",
    "localtimestamp", "natural", "not", "notnull", "null", "offset", "on", "only", "or",
    "order", "outer", "overlaps", "placing", "primary", "references", "returning", "right",
    "select", "session_user", "similar", "some", "symmetric", "system_user", "table",
    "tablesample", "then", "to", "trailing", "true", "union", "unique", "user", "using",
    "variadic", "verbose", "when", "where", "window", "with",
];

fn is_reserved(alias: &str) -> bool {
    RESERVED_WORDS.contains(&alias.to_ascii_lowercase().as_str())
}

/// Builds the job graph of one resolved document
pub struct Planner<'d> {
    document: &'d Document,
    jobs: Vec<Job>,
    aliases: IndexMap<TaskId, String>,
    task_jobs: IndexMap<TaskId, JobId>,
    /// Root tasks referenced through `/name`, per root task
    absolute: IndexMap<TaskId, Vec<TaskId>>,
}

impl<'d> Planner<'d> {
    /// Creates a planner for a resolved document
    pub fn new(document: &'d Document) -> Self {
        Self {
            document,
            jobs: Vec::new(),
            aliases: IndexMap::new(),
            task_jobs: IndexMap::new(),
            absolute: IndexMap::new(),
        }
    }

    /// Plans the document
    pub fn plan(mut self) -> PlannerResult<Plan> {
        let document = self.document;
        self.allocate_aliases()?;

        let mut roots = Vec::with_capacity(document.roots().len());
        for &root in document.roots() {
            self.absolute.insert(root, Vec::new());
            let job = match &document.task(root).kind {
                TaskKind::Query(_) => self.plan_query(root, root, None)?,
                TaskKind::Expression(_) | TaskKind::Field { .. } => self.plan_expression(root)?,
            };
            roots.push(job);
        }

        let order = self.order_roots(&roots)?;

        Ok(Plan {
            jobs: self.jobs,
            roots,
            order,
            aliases: self.aliases,
            task_jobs: self.task_jobs,
        })
    }

    /// First letter of the model, then the model name, then model1..model9
    ///
    /// Reserved SQL keywords are skipped.
    fn allocate_aliases(&mut self) -> PlannerResult<()> {
        let document = self.document;
        for &root in document.roots() {
            for id in document.subtree(root) {
                let query = match document.query(id) {
                    Some(q) => q,
                    None => continue,
                };
                let model = query.subject.record.model.as_str();
                let mut candidates: Vec<String> = Vec::new();
                if let Some(first) = model.chars().next() {
                    candidates.push(first.to_string());
                }
                candidates.push(model.to_string());
                candidates.extend((1..=MAX_ALIAS_SUFFIX).map(|n| format!("{}{}", model, n)));

                let taken = |alias: &String| self.aliases.values().any(|a| a == alias);
                let alias = candidates
                    .into_iter()
                    .find(|c| !taken(c) && !is_reserved(c))
                    .ok_or_else(|| PlannerError::alias_exhausted(model))?;
                self.aliases.insert(id, alias);
            }
        }
        Ok(())
    }

    fn push_job(&mut self, primary: TaskId, flags: JobFlags, parent_job: Option<JobId>) -> JobId {
        let id = JobId(self.jobs.len());
        let tables = match self.document.task(primary).kind {
            TaskKind::Query(_) => vec![primary],
            _ => Vec::new(),
        };
        self.jobs.push(Job {
            id,
            primary,
            flags,
            columns: Vec::new(),
            tables,
            parent_job,
            children: Vec::new(),
            dependencies: Vec::new(),
        });
        self.task_jobs.insert(primary, id);
        id
    }

    fn plan_expression(&mut self, id: TaskId) -> PlannerResult<JobId> {
        let document = self.document;
        let task = document.task(id);
        let job = self.push_job(id, JobFlags::SCALAR, None);

        let mut dependencies = Vec::new();
        if let TaskKind::Expression(expr) = &task.kind {
            self.collect_dependencies(id, None, &task.name, expr, &mut dependencies)?;
        }
        let slot = &mut self.jobs[job.0];
        slot.dependencies = dependencies;
        slot.columns.push(Column {
            task: id,
            key: task.name.clone(),
            producing_job: job,
        });
        Ok(job)
    }

    fn plan_query(&mut self, root: TaskId, id: TaskId, parent_job: Option<JobId>) -> PlannerResult<JobId> {
        let document = self.document;
        let task = document.task(id);
        let query = match task.query() {
            Some(q) => q,
            None => return self.plan_expression(id),
        };

        let record = &query.subject.record;
        if record.schema.is_empty() || record.model.is_empty() {
            return Err(PlannerError::unqualified_subject(&task.name, &query.subject));
        }

        let mut flags = match query.cardinality {
            Cardinality::One => JobFlags::SINGLE,
            Cardinality::Many => JobFlags::MULTI,
            Cardinality::Count => JobFlags::COUNT,
        };
        if query.is_scalar() {
            flags |= JobFlags::SCALAR;
        }
        let job = self.push_job(id, flags, parent_job);

        let mut dependencies = Vec::new();
        for filter in &query.filters {
            self.collect_dependencies(root, Some(id), &task.name, filter, &mut dependencies)?;
        }
        let counted = query.cardinality == Cardinality::Count;
        if !counted {
            for &child in &query.selection {
                let child_task = document.task(child);
                if let TaskKind::Expression(expr) = &child_task.kind {
                    self.collect_dependencies(root, Some(id), &child_task.name, expr, &mut dependencies)?;
                }
            }
        }
        self.jobs[job.0].dependencies = dependencies;

        if let Some(field) = &query.subject.field {
            self.jobs[job.0].columns.push(Column {
                task: id,
                key: field.clone(),
                producing_job: job,
            });
            return Ok(job);
        }
        if counted {
            return Ok(job);
        }

        for &child in &query.selection {
            let child_task = document.task(child);
            match child_task.kind {
                TaskKind::Field { .. } | TaskKind::Expression(_) => {
                    self.jobs[job.0].columns.push(Column {
                        task: child,
                        key: child_task.name.clone(),
                        producing_job: job,
                    });
                }
                TaskKind::Query(_) => {
                    let child_job = self.plan_query(root, child, Some(job))?;
                    self.jobs[job.0].children.push(child_job);
                    self.place(job, child_job);
                }
            }
        }
        Ok(job)
    }

    /// Joins a single child that reads its parent's record; inlines everything else
    fn place(&mut self, parent: JobId, child: JobId) {
        let parent_task = self.jobs[parent.0].primary;
        let child_task = self.jobs[child.0].primary;
        let key = self.document.task(child_task).name.clone();
        let child_flags = self.jobs[child.0].flags;
        let depends_on_parent = self.jobs[child.0].dependencies.contains(&parent_task);

        if child_flags.intersects(JobFlags::MULTI | JobFlags::COUNT) || !depends_on_parent {
            let mut flags = JobFlags::INLINED;
            if child_flags.contains(JobFlags::MULTI) {
                flags |= JobFlags::AGGREGATE_AS_DOCUMENT;
            }
            self.jobs[child.0].flags |= flags;
            let parent_job = &mut self.jobs[parent.0];
            parent_job.flags |= JobFlags::INLINING;
            parent_job.columns.push(Column {
                task: child_task,
                key,
                producing_job: child,
            });
            return;
        }

        self.jobs[child.0].flags |= JobFlags::JOINED;
        let tables = self.jobs[child.0].tables.clone();
        let moved = if child_flags.contains(JobFlags::SCALAR) {
            vec![Column {
                task: child_task,
                key,
                producing_job: child,
            }]
        } else {
            std::mem::take(&mut self.jobs[child.0].columns)
        };

        let parent_job = &mut self.jobs[parent.0];
        parent_job.flags |= JobFlags::JOINING;
        parent_job.tables.extend(tables);
        parent_job.columns.extend(moved);
    }

    /// Adds the tasks an expression reads to `out`
    ///
    /// `context` is the query whose record `.key` names; `None` for root
    /// expressions, where any relative symbol is out of range.
    fn collect_dependencies(
        &mut self,
        root: TaskId,
        context: Option<TaskId>,
        task_name: &str,
        expr: &Expr,
        out: &mut Vec<TaskId>,
    ) -> PlannerResult<()> {
        for symbol in expr.symbols() {
            match symbol {
                Symbol::Param(_) => {}
                Symbol::Field { depth, .. } => {
                    let ancestor = context
                        .and_then(|c| self.document.ancestor(c, *depth))
                        .ok_or_else(|| PlannerError::relative_symbol_out_of_range(task_name, symbol))?;
                    if *depth > 0 && !out.contains(&ancestor) {
                        out.push(ancestor);
                    }
                }
                Symbol::Root { task, .. } => {
                    let target = self
                        .document
                        .root_by_name(task)
                        .ok_or_else(|| PlannerError::unknown_root_task(task_name, task))?;
                    if !out.contains(&target) {
                        out.push(target);
                    }
                    let absolute = self.absolute.entry(root).or_default();
                    if !absolute.contains(&target) {
                        absolute.push(target);
                    }
                }
            }
        }
        Ok(())
    }

    /// Declaration order, except that a root waits for the roots it references
    fn order_roots(&self, roots: &[JobId]) -> PlannerResult<Vec<JobId>> {
        let mut done: Vec<TaskId> = Vec::with_capacity(roots.len());
        let mut order = Vec::with_capacity(roots.len());

        while order.len() < roots.len() {
            let next = roots.iter().copied().find(|job| {
                let task = self.jobs[job.0].primary;
                !done.contains(&task)
                    && self
                        .absolute
                        .get(&task)
                        .map(|deps| deps.iter().all(|d| done.contains(d)))
                        .unwrap_or(true)
            });
            match next {
                Some(job) => {
                    done.push(self.jobs[job.0].primary);
                    order.push(job);
                }
                None => {
                    let stuck: Vec<&str> = roots
                        .iter()
                        .map(|job| self.jobs[job.0].primary)
                        .filter(|task| !done.contains(task))
                        .map(|task| self.document.task(task).name.as_str())
                        .collect();
                    return Err(PlannerError::cyclic_dependency(&stuck));
                }
            }
        }
        Ok(order)
    }
}
