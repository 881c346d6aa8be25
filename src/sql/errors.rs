//! SQL compilation and SQL backend error types
//!
//! Error codes:
//! - AEROQL_FIELD_QUERY_NOT_SUPPORTED (REJECT)
//! - AEROQL_UNRESOLVED_EXTERNAL_SYMBOL (REJECT)
//! - AEROQL_UNSUPPORTED_OPERATOR (REJECT)

use std::fmt;

use thiserror::Error;

use crate::executor::ExecutorError;

/// Compilation error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorCode {
    /// Field-path query the backend cannot project
    FieldQueryNotSupported,
    /// Symbol that binds to neither a column nor a parameter
    UnresolvedExternalSymbol,
    /// Expression the SQL dialect cannot express
    UnsupportedOperator,
}

impl CompileErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorCode::FieldQueryNotSupported => "AEROQL_FIELD_QUERY_NOT_SUPPORTED",
            CompileErrorCode::UnresolvedExternalSymbol => "AEROQL_UNRESOLVED_EXTERNAL_SYMBOL",
            CompileErrorCode::UnsupportedOperator => "AEROQL_UNSUPPORTED_OPERATOR",
        }
    }
}

impl fmt::Display for CompileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Compilation error; always raised before any statement is sent
#[derive(Debug, Clone)]
pub struct CompileError {
    code: CompileErrorCode,
    message: String,
    task: String,
}

impl CompileError {
    /// Create a field query not supported error
    pub fn field_query_not_supported(task: &str, subject: impl fmt::Display) -> Self {
        Self {
            code: CompileErrorCode::FieldQueryNotSupported,
            message: format!("'{}' projects field path '{}', which this backend cannot compile", task, subject),
            task: task.to_string(),
        }
    }

    /// Create an unresolved external symbol error
    pub fn unresolved_external_symbol(task: &str, symbol: impl fmt::Display) -> Self {
        Self {
            code: CompileErrorCode::UnresolvedExternalSymbol,
            message: format!("Symbol '{}' in '{}' binds to no column or parameter", symbol, task),
            task: task.to_string(),
        }
    }

    /// Create an unsupported operator error
    pub fn unsupported_operator(task: &str, detail: impl fmt::Display) -> Self {
        Self {
            code: CompileErrorCode::UnsupportedOperator,
            message: format!("'{}' uses {}, which has no SQL rendering", task, detail),
            task: task.to_string(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> CompileErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the task being compiled
    pub fn task(&self) -> &str {
        &self.task
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CompileError {}

/// Result type for compilation
pub type CompileResult<T> = Result<T, CompileError>;

/// Failure reported by a [`SqlConnection`](super::SqlConnection)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConnectionError {
    pub message: String,
}

impl ConnectionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors of the SQL backend: compilation happens before execution
#[derive(Debug, Clone, Error)]
pub enum SqlBackendError {
    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error("{0}")]
    Execute(#[from] ExecutorError),
}

impl SqlBackendError {
    /// The stage error code
    pub fn code(&self) -> &'static str {
        match self {
            SqlBackendError::Compile(e) => e.code().code(),
            SqlBackendError::Execute(e) => e.code().code(),
        }
    }
}
