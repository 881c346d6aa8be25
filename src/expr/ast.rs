//! Expression AST
//!
//! Scalar expressions are s-expressions over literals, symbols and operator calls.

use std::fmt;

use serde_json::Value;

/// Built-in operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    Concat,
    Coalesce,
}

impl Operator {
    /// Looks up an operator by its surface name
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "eq" | "=" => Operator::Eq,
            "ne" | "!=" => Operator::Ne,
            "lt" | "<" => Operator::Lt,
            "le" | "<=" => Operator::Le,
            "gt" | ">" => Operator::Gt,
            "ge" | ">=" => Operator::Ge,
            "and" => Operator::And,
            "or" => Operator::Or,
            "not" => Operator::Not,
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "concat" => Operator::Concat,
            "coalesce" => Operator::Coalesce,
            _ => return None,
        };
        Some(op)
    }

    /// Canonical surface name
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Concat => "concat",
            Operator::Coalesce => "coalesce",
        }
    }

    /// Returns true for comparison operators
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge
        )
    }

    /// Returns true for arithmetic operators
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div
        )
    }
}

/// A symbol inside an expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// `.key` (depth 0) refers to the current record; each extra dot climbs one record up
    Field { depth: usize, key: String },
    /// `/task.path` refers to the result of a root task
    Root { task: String, path: Vec<String> },
    /// `$name` refers to an external parameter
    Param(String),
}

impl Symbol {
    pub fn field(key: impl Into<String>) -> Self {
        Symbol::Field {
            depth: 0,
            key: key.into(),
        }
    }

    pub fn parent_field(depth: usize, key: impl Into<String>) -> Self {
        Symbol::Field {
            depth,
            key: key.into(),
        }
    }

    pub fn root(task: impl Into<String>) -> Self {
        Symbol::Root {
            task: task.into(),
            path: Vec::new(),
        }
    }

    pub fn param(name: impl Into<String>) -> Self {
        Symbol::Param(name.into())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Field { depth, key } => {
                for _ in 0..=*depth {
                    write!(f, ".")?;
                }
                write!(f, "{}", key)
            }
            Symbol::Root { task, path } => {
                write!(f, "/{}", task)?;
                for segment in path {
                    write!(f, ".{}", segment)?;
                }
                Ok(())
            }
            Symbol::Param(name) => write!(f, "${}", name),
        }
    }
}

/// Expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Symbol(Symbol),
    Call { op: Operator, args: Vec<Expr> },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn symbol(symbol: Symbol) -> Self {
        Expr::Symbol(symbol)
    }

    pub fn call(op: Operator, args: Vec<Expr>) -> Self {
        Expr::Call { op, args }
    }

    /// Returns true if the expression is already a literal
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    /// Collects every symbol in left-to-right order
    pub fn symbols(&self) -> Vec<&Symbol> {
        let mut out = Vec::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols<'a>(&'a self, out: &mut Vec<&'a Symbol>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Symbol(symbol) => out.push(symbol),
            Expr::Call { args, .. } => {
                for arg in args {
                    arg.collect_symbols(out);
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Symbol(symbol) => write!(f, "{}", symbol),
            Expr::Call { op, args } => {
                write!(f, "({}", op.name())?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_symbol_display() {
        assert_eq!(Symbol::field("name").to_string(), ".name");
        assert_eq!(Symbol::parent_field(2, "id").to_string(), "...id");
        assert_eq!(Symbol::param("n").to_string(), "$n");
        let root = Symbol::Root {
            task: "top".into(),
            path: vec!["id".into()],
        };
        assert_eq!(root.to_string(), "/top.id");
    }

    #[test]
    fn test_expr_display_roundtrips_shape() {
        let expr = Expr::call(
            Operator::Eq,
            vec![Expr::symbol(Symbol::field("category")), Expr::literal(json!(3))],
        );
        assert_eq!(expr.to_string(), "(eq .category 3)");
    }

    #[test]
    fn test_symbols_in_order() {
        let expr = Expr::call(
            Operator::And,
            vec![
                Expr::call(
                    Operator::Eq,
                    vec![
                        Expr::symbol(Symbol::field("a")),
                        Expr::symbol(Symbol::parent_field(1, "b")),
                    ],
                ),
                Expr::symbol(Symbol::param("c")),
            ],
        );
        let names: Vec<String> = expr.symbols().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec![".a", "..b", "$c"]);
    }

    #[test]
    fn test_operator_aliases() {
        assert_eq!(Operator::from_name("="), Some(Operator::Eq));
        assert_eq!(Operator::from_name("le"), Some(Operator::Le));
        assert_eq!(Operator::from_name("like"), None);
    }
}
