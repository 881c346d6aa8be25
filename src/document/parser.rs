//! Document parser
//!
//! Scans the query document text into [`DocumentSyntax`]. Expression bodies
//! (parenthesised groups) are handed to the expression parser whole.

use super::errors::{DocumentError, DocumentResult};
use super::syntax::{Declaration, Directive, DocumentSyntax, Item, QuerySyntax, TaskSyntax};
use crate::expr::{self, Expr};

/// Root name given to the task of a bare single-task document
pub const BARE_ROOT_NAME: &str = "result";

/// Parses document text
pub fn parse(text: &str) -> DocumentResult<DocumentSyntax> {
    let mut scanner = Scanner::new(text);
    scanner.skip_ws();
    if scanner.at_end() {
        return Err(DocumentError::parse(0, "Empty document"));
    }

    if scanner.at_declaration() {
        let mut declarations = Vec::new();
        while !scanner.at_end() {
            let start = scanner.pos;
            let name = match scanner.ident() {
                Some(name) if scanner.at_declaration_colon() => name.to_string(),
                _ => return Err(DocumentError::parse(start, "Expected 'name:' declaration")),
            };
            scanner.skip_ws();
            scanner.pos += 1; // ':'
            let task = scanner.task(Mode::Declarations)?;
            declarations.push(Declaration { name, task });
            scanner.skip_ws();
        }
        return Ok(DocumentSyntax {
            declarations,
            bare: false,
        });
    }

    let task = scanner.task(Mode::Bare)?;
    scanner.skip_ws();
    if !scanner.at_end() {
        return Err(DocumentError::parse(scanner.pos, "Trailing input after task"));
    }
    Ok(DocumentSyntax {
        declarations: vec![Declaration {
            name: BARE_ROOT_NAME.to_string(),
            task,
        }],
        bare: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Single task; nothing may follow it
    Bare,
    /// `name:` starts the next declaration
    Declarations,
    /// Inside `+name( ... )`; `)` ends the query
    Nested,
}

fn is_sigil(b: u8) -> bool {
    matches!(b, b'?' | b'*' | b'#')
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        let start = self.pos;
        if !matches!(self.peek(), Some(b) if is_ident_start(b)) {
            return None;
        }
        while matches!(self.peek(), Some(b) if is_ident_char(b)) {
            self.pos += 1;
        }
        Some(&self.src[start..self.pos])
    }

    /// True if the cursor sits on `IDENT ws* ':'`
    fn at_declaration(&self) -> bool {
        if !matches!(self.peek(), Some(b) if is_ident_start(b)) {
            return false;
        }
        let mut i = self.pos;
        while matches!(self.bytes.get(i), Some(b) if is_ident_char(*b)) {
            i += 1;
        }
        self.colon_follows(i)
    }

    /// True if the cursor sits on a sigil directly followed by a subject
    ///
    /// `*shop.product` opens a query; `* .price 2` is a multiplication.
    fn at_query(&self) -> bool {
        matches!(self.peek(), Some(b) if is_sigil(b))
            && matches!(self.bytes.get(self.pos + 1), Some(b) if is_ident_start(*b))
    }

    /// True if `ws* ':'` follows the cursor
    fn at_declaration_colon(&self) -> bool {
        self.colon_follows(self.pos)
    }

    fn colon_follows(&self, mut i: usize) -> bool {
        while matches!(self.bytes.get(i), Some(b) if b.is_ascii_whitespace()) {
            i += 1;
        }
        self.bytes.get(i) == Some(&b':')
    }

    /// Consumes a balanced `( ... )` group and returns it including the parens
    fn group(&mut self) -> DocumentResult<&'a str> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&self.src[start..self.pos]);
                    }
                }
                b'"' => self.skip_string_body(start)?,
                _ => {}
            }
        }
        Err(DocumentError::parse(start, "Unbalanced '('"))
    }

    /// Skips a string literal body; the opening quote is already consumed
    fn skip_string_body(&mut self, start: usize) -> DocumentResult<()> {
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'\\' => self.pos += 1,
                b'"' => return Ok(()),
                _ => {}
            }
        }
        Err(DocumentError::parse(start, "Unterminated string literal"))
    }

    /// A single value unit: a group, a string literal or a bare word
    fn value(&mut self) -> DocumentResult<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(b'(') => self.group(),
            Some(b'"') => {
                self.pos += 1;
                self.skip_string_body(start)?;
                Ok(&self.src[start..self.pos])
            }
            _ => {
                while matches!(self.peek(), Some(b) if !b.is_ascii_whitespace() && b != b'(' && b != b')')
                {
                    self.pos += 1;
                }
                Ok(&self.src[start..self.pos])
            }
        }
    }

    fn expression(&mut self) -> DocumentResult<Expr> {
        let start = self.pos;
        let text = self.value()?;
        if text.is_empty() {
            return Err(DocumentError::parse(start, "Expected an expression"));
        }
        expr::parse(text).map_err(|e| DocumentError::expression_syntax(start, &e))
    }

    fn task(&mut self, mode: Mode) -> DocumentResult<TaskSyntax> {
        self.skip_ws();
        match self.peek() {
            Some(_) if self.at_query() => Ok(TaskSyntax::Query(self.query(mode)?)),
            Some(_) => Ok(TaskSyntax::Expression(self.expression()?)),
            None => Err(DocumentError::parse(self.pos, "Expected a task")),
        }
    }

    fn query(&mut self, mode: Mode) -> DocumentResult<QuerySyntax> {
        let offset = self.pos;
        let sigil = char::from(self.bytes[self.pos]);
        self.pos += 1;

        let subject_start = self.pos;
        while matches!(self.peek(), Some(b) if is_ident_char(b) || b == b'.') {
            self.pos += 1;
        }
        let subject = self.src[subject_start..self.pos].to_string();

        let mut items = Vec::new();
        loop {
            self.skip_ws();
            let start = self.pos;
            let b = match self.peek() {
                None => break,
                Some(b) => b,
            };
            match b {
                b')' if mode == Mode::Nested => break,
                b')' => return Err(DocumentError::parse(start, "Unexpected ')'")),
                b'(' => {
                    let text = self.group()?;
                    let expr =
                        expr::parse(text).map_err(|e| DocumentError::expression_syntax(start, &e))?;
                    items.push(Item::Where(expr));
                }
                b':' => {
                    self.pos += 1;
                    let name = self
                        .ident()
                        .ok_or_else(|| DocumentError::parse(start, "Expected a tag name after ':'"))?
                        .to_string();
                    self.skip_ws();
                    let value_start = self.pos;
                    let value = self.value()?;
                    if value.is_empty() {
                        return Err(DocumentError::parse(
                            value_start,
                            format!("Tag ':{}' needs a value", name),
                        ));
                    }
                    items.push(Item::Tag {
                        name,
                        value: value.to_string(),
                        offset: value_start,
                    });
                }
                b'-' => {
                    self.pos += 1;
                    let directive = match self.ident() {
                        Some(key) => Directive::Remove(key.to_string()),
                        None => Directive::Clear,
                    };
                    items.push(Item::Directive(directive));
                }
                b'+' => {
                    self.pos += 1;
                    items.push(Item::Directive(self.include(mode)?));
                }
                b if is_ident_start(b) && mode == Mode::Declarations && self.at_declaration() => {
                    break
                }
                _ => {
                    return Err(DocumentError::parse(
                        start,
                        format!("Unexpected '{}' in query", char::from(b)),
                    ))
                }
            }
        }

        Ok(QuerySyntax {
            offset,
            sigil,
            subject,
            items,
        })
    }

    /// Parses what follows a `+`
    fn include(&mut self, mode: Mode) -> DocumentResult<Directive> {
        let name = match self.ident() {
            Some(name) => name.to_string(),
            None => return Ok(Directive::Reset(self.reset_keys(mode))),
        };
        if self.peek() != Some(b'(') {
            return Ok(Directive::Include(name));
        }

        let open = self.pos;
        self.pos += 1;
        self.skip_ws();
        if self.at_query() {
            let query = self.query(Mode::Nested)?;
            self.skip_ws();
            if self.peek() != Some(b')') {
                return Err(DocumentError::parse(self.pos, "Expected ')' after nested query"));
            }
            self.pos += 1;
            return Ok(Directive::Nested { name, query });
        }

        self.pos = open;
        let text = self.group()?;
        let expr = computed_body(text).map_err(|e| DocumentError::expression_syntax(open, &e))?;
        Ok(Directive::Computed { name, expr })
    }

    /// Bare keys after a lone `+`
    fn reset_keys(&mut self, mode: Mode) -> Vec<String> {
        let mut keys = Vec::new();
        loop {
            let saved = self.pos;
            self.skip_ws();
            let key = match self.ident() {
                Some(key) => key,
                None => {
                    self.pos = saved;
                    break;
                }
            };
            let starts_declaration = mode == Mode::Declarations && self.at_declaration_colon();
            if starts_declaration || self.peek() == Some(b'(') {
                self.pos = saved;
                break;
            }
            keys.push(key.to_string());
        }
        keys
    }
}

/// `+name(eq .a 1)` reads as a call, `+name(.a)` as a single expression
fn computed_body(group: &str) -> expr::ExprResult<Expr> {
    match expr::parse(group) {
        Ok(expr) => Ok(expr),
        Err(call_err) => {
            let inner = &group[1..group.len() - 1];
            expr::parse(inner).map_err(|_| call_err)
        }
    }
}
