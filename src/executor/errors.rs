//! Executor error types
//!
//! Error codes:
//! - AEROQL_NOT_ORDERABLE (ERROR)
//! - AEROQL_UNKNOWN_TABLE (ERROR)
//! - AEROQL_EVALUATION_FAILED (ERROR)
//! - AEROQL_CONNECTION_FAILED (ERROR)
//! - AEROQL_SCAN_MISMATCH (FATAL)

use std::fmt;

use crate::expr::ExprError;

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The document failed; the backend is healthy
    Error,
    /// The backend returned data that does not fit the plan
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Executor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// Two order key values cannot be compared
    NotOrderable,
    /// The store has no collection for a subject record
    UnknownTable,
    /// A filter or computed field failed to evaluate
    EvaluationFailed,
    /// The backend connection reported a failure
    ConnectionFailed,
    /// Returned rows do not match the expected shape
    ScanMismatch,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::NotOrderable => "AEROQL_NOT_ORDERABLE",
            ExecutorErrorCode::UnknownTable => "AEROQL_UNKNOWN_TABLE",
            ExecutorErrorCode::EvaluationFailed => "AEROQL_EVALUATION_FAILED",
            ExecutorErrorCode::ConnectionFailed => "AEROQL_CONNECTION_FAILED",
            ExecutorErrorCode::ScanMismatch => "AEROQL_SCAN_MISMATCH",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::ScanMismatch => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug, Clone)]
pub struct ExecutorError {
    /// Error code
    code: ExecutorErrorCode,
    /// Human-readable message
    message: String,
    /// Name of the task being executed, if applicable
    task: Option<String>,
}

impl ExecutorError {
    /// Create a not orderable error
    pub fn not_orderable(task: &str, key: &str, left: impl fmt::Display, right: impl fmt::Display) -> Self {
        Self {
            code: ExecutorErrorCode::NotOrderable,
            message: format!(
                "Cannot order '{}' by '{}': {} and {} are not comparable",
                task, key, left, right
            ),
            task: Some(task.to_string()),
        }
    }

    /// Create an unknown table error
    pub fn unknown_table(task: &str, table: impl fmt::Display) -> Self {
        Self {
            code: ExecutorErrorCode::UnknownTable,
            message: format!("'{}' reads unknown table '{}'", task, table),
            task: Some(task.to_string()),
        }
    }

    /// Create an evaluation failed error
    pub fn evaluation_failed(task: &str, err: &ExprError) -> Self {
        Self {
            code: ExecutorErrorCode::EvaluationFailed,
            message: format!("Evaluating '{}' failed: {}", task, err.message()),
            task: Some(task.to_string()),
        }
    }

    /// Create a connection failed error
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::ConnectionFailed,
            message: reason.into(),
            task: None,
        }
    }

    /// Create a scan mismatch error
    pub fn scan_mismatch(task: &str, reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::ScanMismatch,
            message: format!("'{}': {}", task, reason.into()),
            task: Some(task.to_string()),
        }
    }

    /// Create a scan mismatch error for store contents that are not records
    pub fn invalid_store(reason: impl Into<String>) -> Self {
        Self {
            code: ExecutorErrorCode::ScanMismatch,
            message: reason.into(),
            task: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
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

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
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

impl std::error::Error for ExecutorError {}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ExecutorErrorCode::NotOrderable.code(), "AEROQL_NOT_ORDERABLE");
        assert_eq!(ExecutorErrorCode::UnknownTable.code(), "AEROQL_UNKNOWN_TABLE");
        assert_eq!(
            ExecutorErrorCode::ConnectionFailed.code(),
            "AEROQL_CONNECTION_FAILED"
        );
    }

    #[test]
    fn test_scan_mismatch_is_fatal() {
        let err = ExecutorError::scan_mismatch("result", "expected 1 column, got 3");
        assert!(err.is_fatal());
        assert_eq!(err.task(), Some("result"));
    }

    #[test]
    fn test_error_display() {
        let err = ExecutorError::not_orderable("result", "name", "1", "\"a\"");
        let display = format!("{}", err);
        assert!(display.starts_with("[ERROR] AEROQL_NOT_ORDERABLE"));
        assert!(display.contains("'name'"));
        assert!(!err.is_fatal());
    }
}
