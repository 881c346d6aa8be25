//! Schema catalog error types
//!
//! Error codes:
//! - AEROQL_SCHEMA_MALFORMED (FATAL)
//! - AEROQL_SCHEMA_DUPLICATE_RECORD (REJECT)

use std::fmt;

/// Severity levels for schema errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Registration rejected
    Reject,
    /// The catalog cannot be loaded at all
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

/// Schema catalog error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorCode {
    /// Catalog file unreadable, invalid JSON, or structurally invalid record
    Malformed,
    /// Record registered twice
    DuplicateRecord,
}

impl SchemaErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            SchemaErrorCode::Malformed => "AEROQL_SCHEMA_MALFORMED",
            SchemaErrorCode::DuplicateRecord => "AEROQL_SCHEMA_DUPLICATE_RECORD",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            SchemaErrorCode::Malformed => Severity::Fatal,
            SchemaErrorCode::DuplicateRecord => Severity::Reject,
        }
    }
}

impl fmt::Display for SchemaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Schema catalog error with context
#[derive(Debug, Clone)]
pub struct SchemaError {
    code: SchemaErrorCode,
    message: String,
    /// Source location (file path or `<in-memory>`)
    source_name: String,
}

impl SchemaError {
    /// Create a malformed catalog error
    pub fn malformed(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            code: SchemaErrorCode::Malformed,
            message: reason.into(),
            source_name: source_name.into(),
        }
    }

    /// Create a duplicate record error
    pub fn duplicate_record(source_name: impl Into<String>, record: impl fmt::Display) -> Self {
        Self {
            code: SchemaErrorCode::DuplicateRecord,
            message: format!("Record '{}' is already registered", record),
            source_name: source_name.into(),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> SchemaErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns where the failing definition came from
    pub fn source_name(&self) -> &str {
        &self.source_name
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.code.severity(),
            self.code.code(),
            self.message,
            self.source_name
        )
    }
}

impl std::error::Error for SchemaError {}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(SchemaErrorCode::Malformed.code(), "AEROQL_SCHEMA_MALFORMED");
        assert_eq!(SchemaErrorCode::Malformed.severity(), Severity::Fatal);
        assert_eq!(SchemaErrorCode::DuplicateRecord.severity(), Severity::Reject);
    }

    #[test]
    fn test_error_display() {
        let err = SchemaError::malformed("catalog.json", "Invalid JSON");
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("catalog.json"));
    }
}
