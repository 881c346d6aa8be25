//! Unified error type for aeroql
//!
//! Every stage keeps its own error with its own codes; `QlError` only wraps
//! them so callers driving the whole pipeline can use `?` throughout.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::document::{DocumentError, Stage};
use crate::executor::ExecutorError;
use crate::expr::ExprError;
use crate::planner::PlannerError;
use crate::schema::SchemaError;
use crate::sql::{CompileError, SqlBackendError};

/// Result type for pipeline operations
pub type QlResult<T> = Result<T, QlError>;

/// Any failure between document text and result tree
#[derive(Debug, Error)]
pub enum QlError {
    /// Parse or resolution failure
    #[error("{0}")]
    Document(#[from] DocumentError),

    /// Expression outside a document
    #[error("{0}")]
    Expr(#[from] ExprError),

    #[error("{0}")]
    Schema(#[from] SchemaError),

    #[error("{0}")]
    Planner(#[from] PlannerError),

    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error("{0}")]
    Executor(#[from] ExecutorError),

    #[error("{0}")]
    Config(#[from] ConfigError),

    /// Reading a document, schema or store
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl From<SqlBackendError> for QlError {
    fn from(err: SqlBackendError) -> Self {
        match err {
            SqlBackendError::Compile(e) => QlError::Compile(e),
            SqlBackendError::Execute(e) => QlError::Executor(e),
        }
    }
}

impl QlError {
    /// The `AEROQL_` code of the underlying failure
    pub fn code(&self) -> &'static str {
        match self {
            QlError::Document(e) => e.code().code(),
            QlError::Expr(e) => e.code().code(),
            QlError::Schema(e) => e.code().code(),
            QlError::Planner(e) => e.code().code(),
            QlError::Compile(e) => e.code().code(),
            QlError::Executor(e) => e.code().code(),
            QlError::Config(e) => e.code(),
            QlError::Io(_) => "AEROQL_IO_ERROR",
        }
    }

    /// Pipeline stage that failed
    pub fn stage(&self) -> &'static str {
        match self {
            QlError::Document(e) => match e.stage() {
                Stage::Parse => "parse",
                Stage::Resolution => "resolution",
            },
            QlError::Expr(_) => "expression",
            QlError::Schema(_) => "schema",
            QlError::Planner(_) => "planning",
            QlError::Compile(_) => "compilation",
            QlError::Executor(_) => "execution",
            QlError::Config(_) => "configuration",
            QlError::Io(_) => "io",
        }
    }

    /// Error message without the severity and code prefix
    pub fn message(&self) -> String {
        match self {
            QlError::Document(e) => e.message().to_string(),
            QlError::Expr(e) => e.message().to_string(),
            QlError::Schema(e) => e.message().to_string(),
            QlError::Planner(e) => e.message().to_string(),
            QlError::Compile(e) => e.message().to_string(),
            QlError::Executor(e) => e.message().to_string(),
            QlError::Config(e) => e.to_string(),
            QlError::Io(e) => e.to_string(),
        }
    }
}
