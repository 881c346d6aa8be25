//! S-expression parser for scalar expressions

use serde_json::{Number, Value};

use super::ast::{Expr, Operator, Symbol};
use super::errors::{ExprError, ExprResult};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Str(String),
    Word(String),
}

fn tokenize(text: &str) -> ExprResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '"' => {
                            closed = true;
                            break;
                        }
                        '\\' => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some('"') => s.push('"'),
                            Some('\\') => s.push('\\'),
                            Some(other) => {
                                return Err(ExprError::syntax(format!(
                                    "Unknown escape '\\{}'",
                                    other
                                )))
                            }
                            None => break,
                        },
                        c => s.push(c),
                    }
                }
                if !closed {
                    return Err(ExprError::syntax("Unterminated string literal"));
                }
                tokens.push(Token::Str(s));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    Ok(tokens)
}

/// Parses exactly one expression
pub fn parse(text: &str) -> ExprResult<Expr> {
    let mut exprs = parse_sequence(text)?;
    match exprs.len() {
        1 => Ok(exprs.remove(0)),
        0 => Err(ExprError::syntax("Empty expression")),
        n => Err(ExprError::syntax(format!(
            "Expected one expression, found {}",
            n
        ))),
    }
}

/// Parses a whitespace-separated sequence of expressions
pub fn parse_sequence(text: &str) -> ExprResult<Vec<Expr>> {
    let tokens = tokenize(text)?;
    let mut pos = 0;
    let mut exprs = Vec::new();
    while pos < tokens.len() {
        exprs.push(parse_expr(&tokens, &mut pos)?);
    }
    Ok(exprs)
}

fn parse_expr(tokens: &[Token], pos: &mut usize) -> ExprResult<Expr> {
    let token = tokens
        .get(*pos)
        .ok_or_else(|| ExprError::syntax("Unexpected end of expression"))?;
    *pos += 1;

    match token {
        Token::Str(s) => Ok(Expr::Literal(Value::String(s.clone()))),
        Token::Word(w) => parse_atom(w),
        Token::RParen => Err(ExprError::syntax("Unexpected ')'")),
        Token::LParen => {
            let head = match tokens.get(*pos) {
                Some(Token::Word(w)) => w.clone(),
                Some(Token::RParen) => return Err(ExprError::syntax("Empty call '()'")),
                Some(_) => return Err(ExprError::syntax("Call head must be an operator")),
                None => return Err(ExprError::syntax("Unbalanced '('")),
            };
            *pos += 1;
            let op = Operator::from_name(&head).ok_or_else(|| ExprError::unknown_operator(&head))?;

            let mut args = Vec::new();
            loop {
                match tokens.get(*pos) {
                    Some(Token::RParen) => {
                        *pos += 1;
                        break;
                    }
                    Some(_) => args.push(parse_expr(tokens, pos)?),
                    None => return Err(ExprError::syntax("Unbalanced '('")),
                }
            }
            Ok(Expr::Call { op, args })
        }
    }
}

/// Returns true if `s` is a valid identifier
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_atom(word: &str) -> ExprResult<Expr> {
    match word {
        "true" => return Ok(Expr::Literal(Value::Bool(true))),
        "false" => return Ok(Expr::Literal(Value::Bool(false))),
        "null" => return Ok(Expr::Literal(Value::Null)),
        _ => {}
    }

    if let Some(stripped) = word.strip_prefix('.') {
        let extra = stripped.chars().take_while(|c| *c == '.').count();
        let key = &stripped[extra..];
        if !is_identifier(key) {
            return Err(ExprError::syntax(format!("Invalid field symbol '{}'", word)));
        }
        return Ok(Expr::Symbol(Symbol::Field {
            depth: extra,
            key: key.to_string(),
        }));
    }

    if let Some(rest) = word.strip_prefix('/') {
        let mut segments = rest.split('.');
        let task = segments.next().unwrap_or_default();
        let path: Vec<String> = segments.map(str::to_string).collect();
        if !is_identifier(task) || path.iter().any(|p| !is_identifier(p)) {
            return Err(ExprError::syntax(format!("Invalid root symbol '{}'", word)));
        }
        return Ok(Expr::Symbol(Symbol::Root {
            task: task.to_string(),
            path,
        }));
    }

    if let Some(name) = word.strip_prefix('$') {
        if !is_identifier(name) {
            return Err(ExprError::syntax(format!("Invalid parameter '{}'", word)));
        }
        return Ok(Expr::Symbol(Symbol::Param(name.to_string())));
    }

    if let Ok(i) = word.parse::<i64>() {
        return Ok(Expr::Literal(Value::Number(i.into())));
    }
    if word.contains(['.', 'e', 'E']) {
        if let Ok(f) = word.parse::<f64>() {
            if let Some(n) = Number::from_f64(f) {
                return Ok(Expr::Literal(Value::Number(n)));
            }
        }
    }

    Err(ExprError::syntax(format!("Unknown atom '{}'", word)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::errors::ExprErrorCode;
    use serde_json::json;

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("42").unwrap(), Expr::literal(json!(42)));
        assert_eq!(parse("-3").unwrap(), Expr::literal(json!(-3)));
        assert_eq!(parse("1.5").unwrap(), Expr::literal(json!(1.5)));
        assert_eq!(parse("\"a \\\"b\\\"\"").unwrap(), Expr::literal(json!("a \"b\"")));
        assert_eq!(parse("null").unwrap(), Expr::Literal(Value::Null));
    }

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse(".name").unwrap(), Expr::symbol(Symbol::field("name")));
        assert_eq!(
            parse("...id").unwrap(),
            Expr::symbol(Symbol::parent_field(2, "id"))
        );
        assert_eq!(parse("$limit").unwrap(), Expr::symbol(Symbol::param("limit")));
        assert_eq!(
            parse("/top.id").unwrap(),
            Expr::symbol(Symbol::Root {
                task: "top".into(),
                path: vec!["id".into()]
            })
        );
    }

    #[test]
    fn test_parse_nested_call() {
        let expr = parse("(and (eq .category 3) (gt .price 1.5))").unwrap();
        assert_eq!(expr.to_string(), "(and (eq .category 3) (gt .price 1.5))");
    }

    #[test]
    fn test_parse_sequence_multiple() {
        let exprs = parse_sequence(".name \"!\" (concat .name \"!\")").unwrap();
        assert_eq!(exprs.len(), 3);
        assert_eq!(exprs[0], Expr::symbol(Symbol::field("name")));
        assert_eq!(exprs[2].to_string(), "(concat .name \"!\")");

        let err = parse_sequence("concat .name \"!\"").unwrap_err();
        assert_eq!(err.code(), ExprErrorCode::Syntax);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse("(eq .a").unwrap_err().code(), ExprErrorCode::Syntax);
        assert_eq!(parse("()").unwrap_err().code(), ExprErrorCode::Syntax);
        assert_eq!(
            parse("(like .a \"x\")").unwrap_err().code(),
            ExprErrorCode::UnknownOperator
        );
        assert_eq!(parse("bare").unwrap_err().code(), ExprErrorCode::Syntax);
        assert_eq!(parse(".").unwrap_err().code(), ExprErrorCode::Syntax);
        assert_eq!(parse("1 2").unwrap_err().code(), ExprErrorCode::Syntax);
    }
}
