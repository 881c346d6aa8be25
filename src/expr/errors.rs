//! Expression error types
//!
//! Error codes:
//! - AEROQL_EXPR_SYNTAX (REJECT)
//! - AEROQL_EXPR_TYPE_MISMATCH (ERROR)
//! - AEROQL_EXPR_UNKNOWN_OPERATOR (REJECT)
//! - AEROQL_EXPR_ARITY (REJECT)
//! - AEROQL_EXPR_UNBOUND_SYMBOL (ERROR)
//! - AEROQL_EXPR_DIVISION_BY_ZERO (ERROR)
//! - AEROQL_EXPR_OVERFLOW (ERROR)

use std::fmt;

/// Severity levels for expression errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Malformed expression, rejected before planning
    Reject,
    /// Evaluation failed against concrete values
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Expression error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprErrorCode {
    /// Unbalanced parentheses, bad literal, unknown atom
    Syntax,
    /// Operand types do not fit the operator
    TypeMismatch,
    /// Call head is not a known operator
    UnknownOperator,
    /// Wrong number of operands
    Arity,
    /// Symbol has no binding in the environment
    UnboundSymbol,
    /// Division by zero
    DivisionByZero,
    /// Integer overflow
    Overflow,
}

impl ExprErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExprErrorCode::Syntax => "AEROQL_EXPR_SYNTAX",
            ExprErrorCode::TypeMismatch => "AEROQL_EXPR_TYPE_MISMATCH",
            ExprErrorCode::UnknownOperator => "AEROQL_EXPR_UNKNOWN_OPERATOR",
            ExprErrorCode::Arity => "AEROQL_EXPR_ARITY",
            ExprErrorCode::UnboundSymbol => "AEROQL_EXPR_UNBOUND_SYMBOL",
            ExprErrorCode::DivisionByZero => "AEROQL_EXPR_DIVISION_BY_ZERO",
            ExprErrorCode::Overflow => "AEROQL_EXPR_OVERFLOW",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExprErrorCode::Syntax | ExprErrorCode::UnknownOperator | ExprErrorCode::Arity => {
                Severity::Reject
            }
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExprErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Expression error with context
#[derive(Debug, Clone, PartialEq)]
pub struct ExprError {
    code: ExprErrorCode,
    message: String,
}

impl ExprError {
    pub fn syntax(reason: impl Into<String>) -> Self {
        Self {
            code: ExprErrorCode::Syntax,
            message: reason.into(),
        }
    }

    pub fn type_mismatch(op: &str, detail: impl Into<String>) -> Self {
        Self {
            code: ExprErrorCode::TypeMismatch,
            message: format!("Operator '{}' {}", op, detail.into()),
        }
    }

    pub fn unknown_operator(op: impl Into<String>) -> Self {
        Self {
            code: ExprErrorCode::UnknownOperator,
            message: format!("Unknown operator '{}'", op.into()),
        }
    }

    pub fn arity(op: &str, expected: &str, got: usize) -> Self {
        Self {
            code: ExprErrorCode::Arity,
            message: format!("Operator '{}' expects {} operands, got {}", op, expected, got),
        }
    }

    pub fn unbound_symbol(symbol: impl fmt::Display) -> Self {
        Self {
            code: ExprErrorCode::UnboundSymbol,
            message: format!("Symbol '{}' is not bound", symbol),
        }
    }

    pub fn division_by_zero() -> Self {
        Self {
            code: ExprErrorCode::DivisionByZero,
            message: "Division by zero".into(),
        }
    }

    pub fn overflow(op: &str) -> Self {
        Self {
            code: ExprErrorCode::Overflow,
            message: format!("Integer overflow in '{}'", op),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ExprErrorCode {
        self.code
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ExprError {
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

impl std::error::Error for ExprError {}

/// Result type for expression operations
pub type ExprResult<T> = Result<T, ExprError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(ExprErrorCode::Syntax.code(), "AEROQL_EXPR_SYNTAX");
        assert_eq!(
            ExprErrorCode::DivisionByZero.code(),
            "AEROQL_EXPR_DIVISION_BY_ZERO"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ExprError::arity("not", "1", 2);
        let display = format!("{}", err);
        assert!(display.contains("REJECT"));
        assert!(display.contains("AEROQL_EXPR_ARITY"));
        assert!(display.contains("'not'"));
    }
}
