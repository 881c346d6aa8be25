//! Resolved task tree
//!
//! Tasks live in an arena owned by [`Document`]; parents and selections are
//! [`TaskId`] indices, so the tree can be walked both ways without shared ownership.

use std::fmt;

use crate::expr::Expr;
use crate::schema::{QualifiedName, RecordType, Type};

/// Index of a task in its document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub usize);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// How many records a query yields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// `?`: at most one record
    One,
    /// `*`: a list of records
    Many,
    /// `#`: the number of matching records
    Count,
}

impl Cardinality {
    pub fn from_sigil(sigil: char) -> Option<Self> {
        match sigil {
            '?' => Some(Cardinality::One),
            '*' => Some(Cardinality::Many),
            '#' => Some(Cardinality::Count),
            _ => None,
        }
    }

    pub fn sigil(&self) -> char {
        match self {
            Cardinality::One => '?',
            Cardinality::Many => '*',
            Cardinality::Count => '#',
        }
    }
}

/// Resolved subject of a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRef {
    pub record: QualifiedName,
    /// Set for field-path queries (`schema.model.field`)
    pub field: Option<String>,
}

impl SubjectRef {
    pub fn is_scalar(&self) -> bool {
        self.field.is_some()
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record)?;
        if let Some(field) = &self.field {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

/// One ordering key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub key: String,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            descending: false,
        }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            descending: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub cardinality: Cardinality,
    pub subject: SubjectRef,
    pub subject_type: RecordType,
    /// Conjuncts; all must hold
    pub filters: Vec<Expr>,
    pub order: Vec<OrderKey>,
    /// 0 means unset
    pub limit: u64,
    /// 0 means unset
    pub offset: u64,
    /// Selected child tasks in output order
    pub selection: Vec<TaskId>,
}

impl Query {
    /// Field-path queries yield a bare value per record
    pub fn is_scalar(&self) -> bool {
        self.subject.is_scalar()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    /// Computed value; a residual when some symbols were deferred
    Expression(Expr),
    /// Subject field copied as is
    Field { key: String },
    Query(Query),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub kind: TaskKind,
    pub result_type: Type,
    pub parent: Option<TaskId>,
}

impl Task {
    pub fn query(&self) -> Option<&Query> {
        match &self.kind {
            TaskKind::Query(q) => Some(q),
            _ => None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A resolved document: task arena plus ordered roots
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub(crate) tasks: Vec<Task>,
    pub(crate) roots: Vec<TaskId>,
    pub(crate) bare: bool,
}

impl Document {
    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[id.0]
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Root tasks in declaration order
    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    /// True if the document was a single bare task
    pub fn is_bare(&self) -> bool {
        self.bare
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn query(&self, id: TaskId) -> Option<&Query> {
        self.task(id).query()
    }

    pub fn root_by_name(&self, name: &str) -> Option<TaskId> {
        self.roots
            .iter()
            .copied()
            .find(|id| self.task(*id).name == name)
    }

    /// The query task whose record `.key` refers to inside `id`
    ///
    /// Filters of a query see the query's own record; computed fields see the
    /// record of the query that selects them. Root expressions have none.
    pub fn record_context(&self, id: TaskId) -> Option<TaskId> {
        let task = self.task(id);
        match task.kind {
            TaskKind::Query(_) => Some(id),
            _ => task.parent,
        }
    }

    /// Climbs `levels` query ancestors from a record context
    pub fn ancestor(&self, context: TaskId, levels: usize) -> Option<TaskId> {
        let mut current = context;
        for _ in 0..levels {
            current = self.task(current).parent?;
        }
        Some(current)
    }

    /// The root task a task belongs to
    pub fn root_of(&self, id: TaskId) -> TaskId {
        let mut current = id;
        while let Some(parent) = self.task(current).parent {
            current = parent;
        }
        current
    }

    /// Pre-order walk of the subtree under `id`, `id` first
    pub fn subtree(&self, id: TaskId) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some(q) = self.query(current) {
                stack.extend(q.selection.iter().rev().copied());
            }
        }
        out
    }
}
