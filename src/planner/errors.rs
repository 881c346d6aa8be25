//! Planner error types
//!
//! Error codes:
//! - AEROQL_ALIAS_EXHAUSTED (FATAL)
//! - AEROQL_RELATIVE_SYMBOL_OUT_OF_RANGE (REJECT)
//! - AEROQL_UNQUALIFIED_SUBJECT (REJECT)
//! - AEROQL_UNKNOWN_ROOT_TASK (REJECT)
//! - AEROQL_CYCLIC_DEPENDENCY (REJECT)

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Document rejected
    Reject,
    /// Planning cannot proceed for any document of this shape
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Planner error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// No alias candidate left for a subject record
    AliasExhausted,
    /// Relative symbol climbs past the outermost query
    RelativeSymbolOutOfRange,
    /// Subject cannot be split into schema and model
    UnqualifiedSubject,
    /// Absolute symbol names no root task
    UnknownRootTask,
    /// Root tasks depend on each other in a cycle
    CyclicDependency,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::AliasExhausted => "AEROQL_ALIAS_EXHAUSTED",
            PlannerErrorCode::RelativeSymbolOutOfRange => "AEROQL_RELATIVE_SYMBOL_OUT_OF_RANGE",
            PlannerErrorCode::UnqualifiedSubject => "AEROQL_UNQUALIFIED_SUBJECT",
            PlannerErrorCode::UnknownRootTask => "AEROQL_UNKNOWN_ROOT_TASK",
            PlannerErrorCode::CyclicDependency => "AEROQL_CYCLIC_DEPENDENCY",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            PlannerErrorCode::AliasExhausted => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    /// Error code
    code: PlannerErrorCode,
    /// Human-readable message
    message: String,
    /// Name of the task being planned, if applicable
    task: Option<String>,
}

impl PlannerError {
    /// Create an alias exhausted error
    pub fn alias_exhausted(model: &str) -> Self {
        Self {
            code: PlannerErrorCode::AliasExhausted,
            message: format!("No free alias left for model '{}'", model),
            task: None,
        }
    }

    /// Create a relative symbol out of range error
    pub fn relative_symbol_out_of_range(task: &str, symbol: impl fmt::Display) -> Self {
        Self {
            code: PlannerErrorCode::RelativeSymbolOutOfRange,
            message: format!("Symbol '{}' in '{}' climbs past the outermost record", symbol, task),
            task: Some(task.to_string()),
        }
    }

    /// Create an unqualified subject error
    pub fn unqualified_subject(task: &str, subject: impl fmt::Display) -> Self {
        Self {
            code: PlannerErrorCode::UnqualifiedSubject,
            message: format!("Subject '{}' of '{}' is not schema-qualified", subject, task),
            task: Some(task.to_string()),
        }
    }

    /// Create an unknown root task error
    pub fn unknown_root_task(task: &str, root: &str) -> Self {
        Self {
            code: PlannerErrorCode::UnknownRootTask,
            message: format!("'{}' refers to unknown root task '/{}'", task, root),
            task: Some(task.to_string()),
        }
    }

    /// Create a cyclic dependency error
    pub fn cyclic_dependency(roots: &[&str]) -> Self {
        Self {
            code: PlannerErrorCode::CyclicDependency,
            message: format!("Root tasks depend on each other: {}", roots.join(", ")),
            task: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the task name if applicable
    pub fn task(&self) -> Option<&str> {
        self.task.as_deref()
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            PlannerErrorCode::AliasExhausted.code(),
            "AEROQL_ALIAS_EXHAUSTED"
        );
        assert_eq!(
            PlannerErrorCode::CyclicDependency.code(),
            "AEROQL_CYCLIC_DEPENDENCY"
        );
        assert_eq!(PlannerErrorCode::AliasExhausted.severity(), Severity::Fatal);
        assert_eq!(
            PlannerErrorCode::UnknownRootTask.severity(),
            Severity::Reject
        );
    }

    #[test]
    fn test_error_display() {
        let err = PlannerError::relative_symbol_out_of_range("products", "...id");
        let display = format!("{}", err);
        assert!(display.starts_with("[REJECT] AEROQL_RELATIVE_SYMBOL_OUT_OF_RANGE"));
        assert!(display.contains("...id"));
        assert_eq!(err.task(), Some("products"));
    }
}
