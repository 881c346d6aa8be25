//! Document error types
//!
//! Parse errors:
//! - AEROQL_PARSE_ERROR
//!
//! Resolution errors (all REJECT, raised before any execution):
//! - AEROQL_MISSING_MODEL
//! - AEROQL_AMBIGUOUS_SELECTION
//! - AEROQL_NO_INFERRED_TYPE
//! - AEROQL_UNQUALIFIED_SUBJECT
//! - AEROQL_EMPTY_QUERY_REFERENCE
//! - AEROQL_UNKNOWN_DIRECTIVE
//! - AEROQL_UNKNOWN_FIELD
//! - AEROQL_INVALID_TAG_VALUE
//! - AEROQL_INVALID_EXPRESSION
//! - AEROQL_DUPLICATE_NAME
//! - AEROQL_SCALAR_SELECTION
//! - AEROQL_NESTING_TOO_DEEP

use std::fmt;

use crate::expr::ExprError;

/// Which stage rejected the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Resolution,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Parse => write!(f, "PARSE"),
            Stage::Resolution => write!(f, "RESOLUTION"),
        }
    }
}

/// Document error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentErrorCode {
    /// Malformed document syntax
    Parse,
    /// Subject reference names no registered record
    MissingModel,
    /// Selection directive names a key that is already selected
    AmbiguousSelection,
    /// Deferred expression without a static result type
    NoInferredType,
    /// Subject reference cannot be split into schema and model
    UnqualifiedSubject,
    /// Zero-length subject reference
    EmptyQueryReference,
    /// Unknown tag or misplaced directive
    UnknownDirective,
    /// Field not declared by the subject record (or not selected, for removal)
    UnknownField,
    /// `:limit` / `:offset` value is not a non-negative integer
    InvalidTagValue,
    /// Expression failed during partial evaluation
    InvalidExpression,
    /// Two sibling tasks share a name
    DuplicateName,
    /// Selection directives on a field-path query
    ScalarSelection,
    /// Nested queries deeper than the configured limit
    NestingTooDeep,
}

impl DocumentErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            DocumentErrorCode::Parse => "AEROQL_PARSE_ERROR",
            DocumentErrorCode::MissingModel => "AEROQL_MISSING_MODEL",
            DocumentErrorCode::AmbiguousSelection => "AEROQL_AMBIGUOUS_SELECTION",
            DocumentErrorCode::NoInferredType => "AEROQL_NO_INFERRED_TYPE",
            DocumentErrorCode::UnqualifiedSubject => "AEROQL_UNQUALIFIED_SUBJECT",
            DocumentErrorCode::EmptyQueryReference => "AEROQL_EMPTY_QUERY_REFERENCE",
            DocumentErrorCode::UnknownDirective => "AEROQL_UNKNOWN_DIRECTIVE",
            DocumentErrorCode::UnknownField => "AEROQL_UNKNOWN_FIELD",
            DocumentErrorCode::InvalidTagValue => "AEROQL_INVALID_TAG_VALUE",
            DocumentErrorCode::InvalidExpression => "AEROQL_INVALID_EXPRESSION",
            DocumentErrorCode::DuplicateName => "AEROQL_DUPLICATE_NAME",
            DocumentErrorCode::ScalarSelection => "AEROQL_SCALAR_SELECTION",
            DocumentErrorCode::NestingTooDeep => "AEROQL_NESTING_TOO_DEEP",
        }
    }

    /// Returns the stage that raises this code
    pub fn stage(&self) -> Stage {
        match self {
            DocumentErrorCode::Parse => Stage::Parse,
            _ => Stage::Resolution,
        }
    }
}

impl fmt::Display for DocumentErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Document error with context
#[derive(Debug, Clone)]
pub struct DocumentError {
    code: DocumentErrorCode,
    message: String,
    /// Byte offset into the document text, for parse errors
    offset: Option<usize>,
}

impl DocumentError {
    fn new(code: DocumentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            offset: None,
        }
    }

    /// Create a parse error at a byte offset
    pub fn parse(offset: usize, reason: impl Into<String>) -> Self {
        Self {
            code: DocumentErrorCode::Parse,
            message: format!("{} at offset {}", reason.into(), offset),
            offset: Some(offset),
        }
    }

    /// Create a parse error from an expression syntax error
    pub fn expression_syntax(offset: usize, err: &ExprError) -> Self {
        Self::parse(offset, err.message())
    }

    pub fn missing_model(reference: impl fmt::Display) -> Self {
        Self::new(
            DocumentErrorCode::MissingModel,
            format!("Record '{}' is not registered", reference),
        )
    }

    pub fn ambiguous_selection(key: &str) -> Self {
        Self::new(
            DocumentErrorCode::AmbiguousSelection,
            format!("'{}' is already selected; remove it first", key),
        )
    }

    pub fn no_inferred_type(task: &str, expr: impl fmt::Display) -> Self {
        Self::new(
            DocumentErrorCode::NoInferredType,
            format!("Cannot infer a type for '{}' from {}", task, expr),
        )
    }

    pub fn unqualified_subject(reference: &str) -> Self {
        Self::new(
            DocumentErrorCode::UnqualifiedSubject,
            format!(
                "Subject '{}' has no schema and no default schema is configured",
                reference
            ),
        )
    }

    pub fn empty_query_reference() -> Self {
        Self::new(
            DocumentErrorCode::EmptyQueryReference,
            "Query has an empty subject reference",
        )
    }

    pub fn unknown_directive(directive: impl Into<String>) -> Self {
        Self::new(DocumentErrorCode::UnknownDirective, directive)
    }

    pub fn unknown_field(record: impl fmt::Display, key: &str) -> Self {
        Self::new(
            DocumentErrorCode::UnknownField,
            format!("Record '{}' has no field '{}'", record, key),
        )
    }

    pub fn not_selected(key: &str) -> Self {
        Self::new(
            DocumentErrorCode::UnknownField,
            format!("Cannot remove '{}': it is not selected", key),
        )
    }

    pub fn invalid_tag_value(tag: &str, reason: impl Into<String>) -> Self {
        Self::new(
            DocumentErrorCode::InvalidTagValue,
            format!(":{} {}", tag, reason.into()),
        )
    }

    pub fn invalid_expression(task: &str, err: &ExprError) -> Self {
        Self::new(
            DocumentErrorCode::InvalidExpression,
            format!("In '{}': {}", task, err.message()),
        )
    }

    pub fn duplicate_name(name: &str) -> Self {
        Self::new(
            DocumentErrorCode::DuplicateName,
            format!("Task name '{}' is used twice among siblings", name),
        )
    }

    pub fn scalar_selection(reference: impl fmt::Display) -> Self {
        Self::new(
            DocumentErrorCode::ScalarSelection,
            format!("Field query '{}' takes no selection directives", reference),
        )
    }

    pub fn nesting_too_deep(max_depth: usize) -> Self {
        Self::new(
            DocumentErrorCode::NestingTooDeep,
            format!("Queries nest deeper than {} levels", max_depth),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> DocumentErrorCode {
        self.code
    }

    /// Returns the stage that rejected the document
    pub fn stage(&self) -> Stage {
        self.code.stage()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the byte offset for parse errors
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage(), self.code.code(), self.message)
    }
}

impl std::error::Error for DocumentError {}

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;
