//! Jobs and plans
//!
//! A job is one unit of backend work. Joined and inlined children stay in the
//! job arena so flags and dependencies remain inspectable, but they execute as
//! part of their parent's statement.

use std::fmt;

use indexmap::IndexMap;

use crate::document::TaskId;

/// Index of a job in its plan arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub usize);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "j{}", self.0)
    }
}

bitflags::bitflags! {
    /// Placement and shape flags of a job.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct JobFlags: u16 {
        /// At most one record.
        const SINGLE = 0b0000_0000_0001;
        /// A list of records.
        const MULTI = 0b0000_0000_0010;
        /// A record count.
        const COUNT = 0b0000_0000_0100;
        /// One bare value per record instead of a record.
        const SCALAR = 0b0000_0000_1000;
        /// Merged into the parent's FROM clause.
        const JOINED = 0b0000_0001_0000;
        /// Has at least one joined child.
        const JOINING = 0b0000_0010_0000;
        /// Embedded as a subquery in the parent's select list.
        const INLINED = 0b0000_0100_0000;
        /// Has at least one inlined child.
        const INLINING = 0b0000_1000_0000;
        /// Rows collapse into one aggregate value per parent row.
        const AGGREGATE_AS_DOCUMENT = 0b0001_0000_0000;
    }
}

impl JobFlags {
    /// `MULTI|INLINED|...` in declaration order
    pub fn names(&self) -> String {
        let names: Vec<&str> = self.iter_names().map(|(name, _)| name).collect();
        if names.is_empty() {
            "-".to_string()
        } else {
            names.join("|")
        }
    }
}

/// One entry of a job's select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Task whose value fills this column
    pub task: TaskId,
    /// Output key
    pub key: String,
    /// Job that computes the value; differs from the owner for joined and inlined children
    pub producing_job: JobId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    /// Task this job computes
    pub primary: TaskId,
    pub flags: JobFlags,
    pub columns: Vec<Column>,
    /// Query tasks contributing a FROM source, primary first
    pub tables: Vec<TaskId>,
    pub parent_job: Option<JobId>,
    /// Nested child jobs in selection order
    pub children: Vec<JobId>,
    /// Tasks this job's own expressions reference
    pub dependencies: Vec<TaskId>,
}

impl Job {
    pub fn is_joined(&self) -> bool {
        self.flags.contains(JobFlags::JOINED)
    }

    pub fn is_inlined(&self) -> bool {
        self.flags.contains(JobFlags::INLINED)
    }

    pub fn is_scalar(&self) -> bool {
        self.flags.contains(JobFlags::SCALAR)
    }

    pub fn is_count(&self) -> bool {
        self.flags.contains(JobFlags::COUNT)
    }

    /// True for root expression jobs, which read no table
    pub fn is_expression(&self) -> bool {
        self.tables.is_empty()
    }
}

/// The planned job graph of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub(crate) jobs: Vec<Job>,
    /// One job per root task, declaration order
    pub(crate) roots: Vec<JobId>,
    /// Root jobs in dependency order
    pub(crate) order: Vec<JobId>,
    /// Subject alias per query task; scoped to this plan
    pub(crate) aliases: IndexMap<TaskId, String>,
    pub(crate) task_jobs: IndexMap<TaskId, JobId>,
}

impl Plan {
    pub fn job(&self, id: JobId) -> &Job {
        &self.jobs[id.0]
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn roots(&self) -> &[JobId] {
        &self.roots
    }

    /// Root jobs such that every job runs after the roots it references
    pub fn execution_order(&self) -> &[JobId] {
        &self.order
    }

    pub fn alias(&self, task: TaskId) -> Option<&str> {
        self.aliases.get(&task).map(String::as_str)
    }

    pub fn aliases(&self) -> &IndexMap<TaskId, String> {
        &self.aliases
    }

    /// Job computing a query task or a root expression task
    pub fn job_for(&self, task: TaskId) -> Option<&Job> {
        self.task_jobs.get(&task).map(|id| self.job(*id))
    }

    /// Column of `owner` filled by `task`
    pub fn column(&self, owner: JobId, task: TaskId) -> Option<&Column> {
        self.job(owner).columns.iter().find(|c| c.task == task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_names() {
        let flags = JobFlags::MULTI | JobFlags::INLINED | JobFlags::AGGREGATE_AS_DOCUMENT;
        assert_eq!(flags.names(), "MULTI|INLINED|AGGREGATE_AS_DOCUMENT");
        assert_eq!(JobFlags::empty().names(), "-");
    }
}
