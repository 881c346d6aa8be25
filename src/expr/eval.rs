//! Expression evaluation contract and the built-in evaluator
//!
//! Null semantics follow SQL: comparisons and arithmetic involving null yield
//! null, `and`/`or` are three-valued, and a filter keeps a record only on `true`.

use std::cmp::Ordering;

use serde_json::{Number, Value};

use super::ast::{Expr, Operator, Symbol};
use super::errors::{ExprError, ExprResult};
use crate::schema::Type;

/// What a symbol is bound to in an environment
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Known now
    Value(Value),
    /// Known only after a later stage (a record field, an unfinished root task)
    Deferred(Type),
    /// Not in scope at all
    Unbound,
}

/// Scoped symbol lookup
pub trait Environment {
    fn lookup(&self, symbol: &Symbol) -> Binding;
}

/// Outcome of partial evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Literal(Value),
    /// Some symbols are deferred; bound sub-trees are folded into the residual
    Unresolved(Expr),
}

/// Typed scalar expression evaluator
pub trait Evaluator: Send + Sync {
    /// Partially evaluates `expr`, folding every sub-tree whose symbols are bound
    fn resolve(&self, env: &dyn Environment, expr: &Expr) -> ExprResult<Resolution>;

    /// Fully evaluates `expr`; deferred symbols are an error
    fn eval(&self, env: &dyn Environment, expr: &Expr) -> ExprResult<Value>;

    /// Infers the static result type of `expr`, if its signature allows
    fn infer(&self, env: &dyn Environment, expr: &Expr) -> Option<Type>;
}

/// The built-in s-expression evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct Builtin;

impl Evaluator for Builtin {
    fn resolve(&self, env: &dyn Environment, expr: &Expr) -> ExprResult<Resolution> {
        match expr {
            Expr::Literal(v) => Ok(Resolution::Literal(v.clone())),
            Expr::Symbol(symbol) => match env.lookup(symbol) {
                Binding::Value(v) => Ok(Resolution::Literal(v)),
                Binding::Deferred(_) => Ok(Resolution::Unresolved(expr.clone())),
                Binding::Unbound => Err(ExprError::unbound_symbol(symbol)),
            },
            Expr::Call { op, args } => {
                let mut folded = Vec::with_capacity(args.len());
                let mut all_literal = true;
                for arg in args {
                    match self.resolve(env, arg)? {
                        Resolution::Literal(v) => folded.push(Expr::Literal(v)),
                        Resolution::Unresolved(residual) => {
                            all_literal = false;
                            folded.push(residual);
                        }
                    }
                }
                if all_literal {
                    let values: Vec<Value> = folded
                        .into_iter()
                        .map(|e| match e {
                            Expr::Literal(v) => v,
                            _ => Value::Null,
                        })
                        .collect();
                    apply(*op, &values).map(Resolution::Literal)
                } else {
                    Ok(Resolution::Unresolved(Expr::Call {
                        op: *op,
                        args: folded,
                    }))
                }
            }
        }
    }

    fn eval(&self, env: &dyn Environment, expr: &Expr) -> ExprResult<Value> {
        match self.resolve(env, expr)? {
            Resolution::Literal(v) => Ok(v),
            Resolution::Unresolved(residual) => {
                let symbol = residual
                    .symbols()
                    .first()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| residual.to_string());
                Err(ExprError::unbound_symbol(symbol))
            }
        }
    }

    fn infer(&self, env: &dyn Environment, expr: &Expr) -> Option<Type> {
        match expr {
            Expr::Literal(v) => Some(Type::of_value(v)),
            Expr::Symbol(symbol) => match env.lookup(symbol) {
                Binding::Value(v) => Some(Type::of_value(&v)),
                Binding::Deferred(Type::Any) | Binding::Unbound => None,
                Binding::Deferred(t) => Some(t),
            },
            Expr::Call { op, args } => match op {
                op if op.is_comparison() => Some(Type::Bool),
                Operator::And | Operator::Or | Operator::Not => Some(Type::Bool),
                Operator::Concat => Some(Type::String),
                Operator::Coalesce => args
                    .iter()
                    .filter_map(|a| self.infer(env, a))
                    .find(|t| *t != Type::Null),
                _ => {
                    let mut result = Type::Int;
                    for arg in args {
                        match self.infer(env, arg)? {
                            Type::Int | Type::Null => {}
                            Type::Float => result = Type::Float,
                            _ => return None,
                        }
                    }
                    Some(result)
                }
            },
        }
    }
}

/// Orders two non-null scalar values; `None` when the pair is not comparable
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return Some(a.cmp(&b));
    }
    let a = x.as_f64()?;
    let b = y.as_f64()?;
    a.partial_cmp(&b)
}

/// Applies an operator to fully evaluated operands
pub fn apply(op: Operator, args: &[Value]) -> ExprResult<Value> {
    let name = op.name();
    match op {
        Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
            if args.len() != 2 {
                return Err(ExprError::arity(name, "2", args.len()));
            }
            let (a, b) = (&args[0], &args[1]);
            if a.is_null() || b.is_null() {
                return Ok(Value::Null);
            }
            let ordering = match compare_values(a, b) {
                Some(o) => o,
                None if matches!(op, Operator::Eq | Operator::Ne)
                    && std::mem::discriminant(a) == std::mem::discriminant(b) =>
                {
                    if a == b {
                        Ordering::Equal
                    } else {
                        Ordering::Less
                    }
                }
                None => {
                    return Err(ExprError::type_mismatch(
                        name,
                        format!("cannot compare {} with {}", a, b),
                    ))
                }
            };
            let result = match op {
                Operator::Eq => ordering == Ordering::Equal,
                Operator::Ne => ordering != Ordering::Equal,
                Operator::Lt => ordering == Ordering::Less,
                Operator::Le => ordering != Ordering::Greater,
                Operator::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(result))
        }
        Operator::And | Operator::Or => {
            if args.is_empty() {
                return Err(ExprError::arity(name, "at least 1", 0));
            }
            let decisive = op == Operator::Or;
            let mut saw_null = false;
            for arg in args {
                match arg {
                    Value::Bool(b) if *b == decisive => return Ok(Value::Bool(decisive)),
                    Value::Bool(_) => {}
                    Value::Null => saw_null = true,
                    other => {
                        return Err(ExprError::type_mismatch(
                            name,
                            format!("expects booleans, got {}", other),
                        ))
                    }
                }
            }
            Ok(if saw_null {
                Value::Null
            } else {
                Value::Bool(!decisive)
            })
        }
        Operator::Not => {
            if args.len() != 1 {
                return Err(ExprError::arity(name, "1", args.len()));
            }
            match &args[0] {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                Value::Null => Ok(Value::Null),
                other => Err(ExprError::type_mismatch(
                    name,
                    format!("expects a boolean, got {}", other),
                )),
            }
        }
        Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => arithmetic(op, args),
        Operator::Concat => {
            if args.is_empty() {
                return Err(ExprError::arity(name, "at least 1", 0));
            }
            let mut out = String::new();
            for arg in args {
                match arg {
                    Value::Null => return Ok(Value::Null),
                    Value::String(s) => out.push_str(s),
                    Value::Number(n) => out.push_str(&n.to_string()),
                    Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
                    other => {
                        return Err(ExprError::type_mismatch(
                            name,
                            format!("cannot stringify {}", other),
                        ))
                    }
                }
            }
            Ok(Value::String(out))
        }
        Operator::Coalesce => {
            if args.is_empty() {
                return Err(ExprError::arity(name, "at least 1", 0));
            }
            Ok(args
                .iter()
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null))
        }
    }
}

fn arithmetic(op: Operator, args: &[Value]) -> ExprResult<Value> {
    let name = op.name();
    if op == Operator::Sub && args.len() == 1 {
        return arithmetic(op, &[Value::Number(0.into()), args[0].clone()]);
    }
    if args.len() < 2 {
        return Err(ExprError::arity(name, "at least 2", args.len()));
    }

    let mut acc = args[0].clone();
    for rhs in &args[1..] {
        acc = binary_arithmetic(op, &acc, rhs)?;
        if acc.is_null() {
            return Ok(Value::Null);
        }
    }
    Ok(acc)
}

fn binary_arithmetic(op: Operator, a: &Value, b: &Value) -> ExprResult<Value> {
    let name = op.name();
    let (x, y) = match (a, b) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
        (Value::Number(x), Value::Number(y)) => (x, y),
        _ => {
            return Err(ExprError::type_mismatch(
                name,
                format!("expects numbers, got {} and {}", a, b),
            ))
        }
    };

    if let (Some(i), Some(j)) = (x.as_i64(), y.as_i64()) {
        let result = match op {
            Operator::Add => i.checked_add(j),
            Operator::Sub => i.checked_sub(j),
            Operator::Mul => i.checked_mul(j),
            _ => {
                if j == 0 {
                    return Err(ExprError::division_by_zero());
                }
                i.checked_div(j)
            }
        };
        return result
            .map(|v| Value::Number(v.into()))
            .ok_or_else(|| ExprError::overflow(name));
    }

    let (i, j) = match (x.as_f64(), y.as_f64()) {
        (Some(i), Some(j)) => (i, j),
        _ => return Err(ExprError::type_mismatch(name, "operand out of range")),
    };
    let result = match op {
        Operator::Add => i + j,
        Operator::Sub => i - j,
        Operator::Mul => i * j,
        _ => {
            if j == 0.0 {
                return Err(ExprError::division_by_zero());
            }
            i / j
        }
    };
    Number::from_f64(result)
        .map(Value::Number)
        .ok_or_else(|| ExprError::overflow(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::errors::ExprErrorCode;
    use crate::expr::parser::parse;
    use serde_json::json;

    /// `.x` = 10, `$p` = 2, `/later` deferred as int
    struct TestEnv;

    impl Environment for TestEnv {
        fn lookup(&self, symbol: &Symbol) -> Binding {
            match symbol {
                Symbol::Field { depth: 0, key } if key == "x" => Binding::Value(json!(10)),
                Symbol::Field { depth: 0, key } if key == "name" => {
                    Binding::Deferred(Type::String)
                }
                Symbol::Param(p) if p == "p" => Binding::Value(json!(2)),
                Symbol::Root { task, .. } if task == "later" => Binding::Deferred(Type::Int),
                _ => Binding::Unbound,
            }
        }
    }

    fn eval(text: &str) -> ExprResult<Value> {
        Builtin.eval(&TestEnv, &parse(text).unwrap())
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("(eq .x 10)").unwrap(), json!(true));
        assert_eq!(eval("(eq .x 10.0)").unwrap(), json!(true));
        assert_eq!(eval("(lt \"apple\" \"banana\")").unwrap(), json!(true));
        assert_eq!(eval("(ge $p 3)").unwrap(), json!(false));
        assert_eq!(eval("(eq null 1)").unwrap(), Value::Null);
        assert_eq!(
            eval("(lt 1 \"a\")").unwrap_err().code(),
            ExprErrorCode::TypeMismatch
        );
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval("(and true null)").unwrap(), Value::Null);
        assert_eq!(eval("(and false null)").unwrap(), json!(false));
        assert_eq!(eval("(or true null)").unwrap(), json!(true));
        assert_eq!(eval("(or false null)").unwrap(), Value::Null);
        assert_eq!(eval("(not null)").unwrap(), Value::Null);
        assert_eq!(eval("(not (eq .x 10))").unwrap(), json!(false));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("(+ .x $p 1)").unwrap(), json!(13));
        assert_eq!(eval("(- 5)").unwrap(), json!(-5));
        assert_eq!(eval("(/ 7 2)").unwrap(), json!(3));
        assert_eq!(eval("(/ 7.0 2)").unwrap(), json!(3.5));
        assert_eq!(eval("(* null 2)").unwrap(), Value::Null);
        assert_eq!(
            eval("(/ 1 0)").unwrap_err().code(),
            ExprErrorCode::DivisionByZero
        );
        assert_eq!(
            eval("(* 9223372036854775807 2)").unwrap_err().code(),
            ExprErrorCode::Overflow
        );
    }

    #[test]
    fn test_concat_and_coalesce() {
        assert_eq!(eval("(concat \"n=\" .x)").unwrap(), json!("n=10"));
        assert_eq!(eval("(concat \"a\" null)").unwrap(), Value::Null);
        assert_eq!(eval("(coalesce null $p)").unwrap(), json!(2));
    }

    #[test]
    fn test_resolve_folds_bound_subtrees() {
        let expr = parse("(+ /later (* $p 3))").unwrap();
        let resolution = Builtin.resolve(&TestEnv, &expr).unwrap();
        match resolution {
            Resolution::Unresolved(residual) => {
                assert_eq!(residual.to_string(), "(+ /later 6)")
            }
            other => panic!("expected residual, got {:?}", other),
        }
    }

    #[test]
    fn test_eval_rejects_deferred() {
        let err = eval("(+ /later 1)").unwrap_err();
        assert_eq!(err.code(), ExprErrorCode::UnboundSymbol);
        assert!(err.message().contains("/later"));
    }

    #[test]
    fn test_unbound_symbol() {
        assert_eq!(
            eval("(eq .missing 1)").unwrap_err().code(),
            ExprErrorCode::UnboundSymbol
        );
    }

    #[test]
    fn test_infer_signatures() {
        let infer = |text: &str| Builtin.infer(&TestEnv, &parse(text).unwrap());
        assert_eq!(infer("(eq .x 1)"), Some(Type::Bool));
        assert_eq!(infer("(concat .name \"!\")"), Some(Type::String));
        assert_eq!(infer("(+ /later 1)"), Some(Type::Int));
        assert_eq!(infer("(+ /later 1.5)"), Some(Type::Float));
        assert_eq!(infer("(+ .name 1)"), None);
        assert_eq!(infer("/later"), Some(Type::Int));
        assert_eq!(infer(".unknown"), None);
    }
}
