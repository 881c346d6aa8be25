//! Surface syntax tree produced by the document parser
//!
//! Nothing here has been checked against a schema; the resolver turns it into
//! a typed [`Document`](super::Document).

use crate::expr::Expr;

/// A parsed, unresolved document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSyntax {
    /// Root declarations in source order
    pub declarations: Vec<Declaration>,
    /// True if the document was a single bare task
    pub bare: bool,
}

/// `name: task`
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub task: TaskSyntax,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskSyntax {
    Query(QuerySyntax),
    Expression(Expr),
}

/// `sigil subject item*`
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySyntax {
    /// Byte offset of the sigil in the document text
    pub offset: usize,
    pub sigil: char,
    pub subject: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// `(expr)` conjunct
    Where(Expr),
    /// `:name value`; the value text is interpreted per tag by the resolver
    Tag {
        name: String,
        value: String,
        /// Byte offset of the value in the document text
        offset: usize,
    },
    Directive(Directive),
}

/// Selection directives, applied left to right
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// bare `-`
    Clear,
    /// `-key`
    Remove(String),
    /// bare `+` followed by keys
    Reset(Vec<String>),
    /// `+key`
    Include(String),
    /// `+name(expr)`
    Computed { name: String, expr: Expr },
    /// `+name(query)`
    Nested { name: String, query: QuerySyntax },
}

impl Directive {
    /// Short label for error messages
    pub fn label(&self) -> String {
        match self {
            Directive::Clear => "-".to_string(),
            Directive::Remove(key) => format!("-{}", key),
            Directive::Reset(_) => "+".to_string(),
            Directive::Include(key) => format!("+{}", key),
            Directive::Computed { name, .. } | Directive::Nested { name, .. } => {
                format!("+{}(...)", name)
            }
        }
    }
}
