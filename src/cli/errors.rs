//! CLI-specific error types

use std::io;

use thiserror::Error;

use crate::error::QlError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    /// The document was rejected or failed at some pipeline stage
    #[error("{0}")]
    Pipeline(#[from] QlError),

    /// A `--param` value is not `name=<json>`
    #[error("Invalid parameter '{0}': {1}")]
    InvalidParam(String, String),

    /// Reading input or writing output failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Pipeline(e) => e.code(),
            CliError::InvalidParam(..) => "AEROQL_CLI_INVALID_PARAM",
            CliError::Io(_) => "AEROQL_CLI_IO_ERROR",
        }
    }

    /// Get the error message
    pub fn message(&self) -> String {
        match self {
            CliError::Pipeline(e) => e.message(),
            other => other.to_string(),
        }
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Io(format!("JSON error: {}", e))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
