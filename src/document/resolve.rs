//! Document resolution
//!
//! Binds every query to its record type, applies selection directives and tags,
//! and types every task. Expression tasks are partially evaluated: whatever is
//! bound now is folded, symbols that only a later stage can supply stay in the
//! residual.
//!
//! Root tasks are resolved in reference order so that `/name` sees the type of
//! the root it names; roots caught in a cycle fall back to declaration order and
//! the planner reports the cycle.

use std::collections::HashSet;

use serde_json::Value;

use super::errors::{DocumentError, DocumentResult};
use super::syntax::{Directive, DocumentSyntax, Item, QuerySyntax, TaskSyntax};
use super::task::{
    Cardinality, Document, OrderKey, Query, SubjectRef, Task, TaskId, TaskKind,
};
use crate::expr::{self, Binding, Environment, Evaluator, Expr, Params, Resolution, Symbol};
use crate::schema::{QualifiedName, RecordType, SchemaRegistry, Type};

/// Resolution settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Schema used for single-segment subject references
    pub default_schema: Option<String>,
    /// Deepest allowed query nesting; a root query is depth 1
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            default_schema: None,
            max_depth: 8,
        }
    }
}

/// Resolves parsed documents against a schema registry
pub struct Resolver<'a> {
    registry: &'a dyn SchemaRegistry,
    evaluator: &'a dyn Evaluator,
    params: &'a Params,
    options: ResolveOptions,
}

/// Task arena under construction
struct Arena {
    tasks: Vec<Task>,
    root_count: usize,
    resolved: Vec<bool>,
}

impl Arena {
    fn push_placeholder(&mut self, name: &str, parent: Option<TaskId>) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks.push(Task {
            id,
            name: name.to_string(),
            kind: TaskKind::Expression(Expr::Literal(Value::Null)),
            result_type: Type::Any,
            parent,
        });
        id
    }

    fn set(&mut self, id: TaskId, kind: TaskKind, result_type: Type) {
        let task = &mut self.tasks[id.0];
        task.kind = kind;
        task.result_type = result_type;
    }
}

enum Selected {
    Field(String),
    Computed(String, Expr),
    Nested(String, QuerySyntax),
}

impl Selected {
    fn name(&self) -> &str {
        match self {
            Selected::Field(name) | Selected::Computed(name, _) | Selected::Nested(name, _) => {
                name
            }
        }
    }
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a dyn SchemaRegistry,
        evaluator: &'a dyn Evaluator,
        params: &'a Params,
    ) -> Self {
        Self {
            registry,
            evaluator,
            params,
            options: ResolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolves a parsed document into a typed task tree
    pub fn resolve(&self, syntax: DocumentSyntax) -> DocumentResult<Document> {
        let mut seen = HashSet::new();
        for decl in &syntax.declarations {
            if !seen.insert(decl.name.as_str()) {
                return Err(DocumentError::duplicate_name(&decl.name));
            }
        }

        let root_count = syntax.declarations.len();
        let mut arena = Arena {
            tasks: Vec::new(),
            root_count,
            resolved: vec![false; root_count],
        };
        for decl in &syntax.declarations {
            arena.push_placeholder(&decl.name, None);
        }

        let names: Vec<String> = syntax.declarations.iter().map(|d| d.name.clone()).collect();
        let order = resolution_order(&syntax, &names);

        let mut pending: Vec<Option<TaskSyntax>> = syntax
            .declarations
            .into_iter()
            .map(|d| Some(d.task))
            .collect();

        for index in order {
            let id = TaskId(index);
            match pending[index].take() {
                Some(TaskSyntax::Query(query)) => {
                    let mut scopes = Vec::new();
                    self.resolve_query(&mut arena, id, query, &mut scopes, 1)?;
                }
                Some(TaskSyntax::Expression(expr)) => {
                    self.resolve_expression(&mut arena, id, &expr, &[])?;
                }
                None => {}
            }
            arena.resolved[index] = true;
        }

        Ok(Document {
            tasks: arena.tasks,
            roots: (0..root_count).map(TaskId).collect(),
            bare: syntax.bare,
        })
    }

    fn subject(&self, reference: &str) -> DocumentResult<(SubjectRef, &'a RecordType)> {
        if reference.is_empty() {
            return Err(DocumentError::empty_query_reference());
        }
        let segments: Vec<&str> = reference.split('.').collect();
        if segments.iter().any(|s| !expr::is_identifier(s)) {
            return Err(DocumentError::unqualified_subject(reference));
        }

        let (record, field) = match segments.as_slice() {
            [model] => match &self.options.default_schema {
                Some(schema) => (QualifiedName::new(schema.as_str(), *model), None),
                None => return Err(DocumentError::unqualified_subject(reference)),
            },
            [schema, model] => (QualifiedName::new(*schema, *model), None),
            [schema, model, field] => (QualifiedName::new(*schema, *model), Some(*field)),
            [schema, model, _, rest @ ..] => {
                let name = QualifiedName::new(*schema, *model);
                let path = rest.join(".");
                return Err(match self.registry.lookup(&name) {
                    Some(_) => DocumentError::unknown_field(&name, &format!("{}.{}", segments[2], path)),
                    None => DocumentError::missing_model(&name),
                });
            }
            [] => return Err(DocumentError::empty_query_reference()),
        };

        let record_type = self
            .registry
            .lookup(&record)
            .ok_or_else(|| DocumentError::missing_model(&record))?;

        if let Some(field) = field {
            if record_type.field(field).is_none() {
                return Err(DocumentError::unknown_field(&record, field));
            }
        }

        Ok((
            SubjectRef {
                record,
                field: field.map(str::to_string),
            },
            record_type,
        ))
    }

    fn resolve_query(
        &self,
        arena: &mut Arena,
        id: TaskId,
        syntax: QuerySyntax,
        scopes: &mut Vec<&'a RecordType>,
        depth: usize,
    ) -> DocumentResult<()> {
        if depth > self.options.max_depth {
            return Err(DocumentError::nesting_too_deep(self.options.max_depth));
        }
        let cardinality = Cardinality::from_sigil(syntax.sigil).ok_or_else(|| {
            DocumentError::parse(
                syntax.offset,
                format!("Unknown query sigil '{}'", syntax.sigil),
            )
        })?;
        let (subject, record) = self.subject(&syntax.subject)?;
        scopes.push(record);

        let mut filters = Vec::new();
        let mut order = Vec::new();
        let mut limit = 0u64;
        let mut offset = 0u64;
        let mut selection: Vec<Selected> = if subject.is_scalar() {
            Vec::new()
        } else {
            record
                .field_names()
                .map(|name| Selected::Field(name.to_string()))
                .collect()
        };
        let mut directive_count = 0usize;

        for item in syntax.items {
            match item {
                Item::Where(expr) => {
                    check_fields(&expr, scopes)?;
                    filters.push(expr);
                }
                Item::Tag {
                    name,
                    value,
                    offset: at,
                } => match name.as_str() {
                    "where" => {
                        let expr = expr::parse(&value)
                            .map_err(|e| DocumentError::expression_syntax(at, &e))?;
                        check_fields(&expr, scopes)?;
                        filters.push(expr);
                    }
                    "limit" => limit = self.count_tag(arena, scopes, &name, &value, at)?,
                    "offset" => offset = self.count_tag(arena, scopes, &name, &value, at)?,
                    "asc" | "desc" | "order" => {
                        let (key, descending) = match (name.as_str(), value.strip_prefix('-')) {
                            ("order", Some(key)) => (key, true),
                            ("desc", _) => (value.as_str(), true),
                            _ => (value.as_str(), false),
                        };
                        if !expr::is_identifier(key) {
                            return Err(DocumentError::invalid_tag_value(
                                &name,
                                format!("expects a field name, got '{}'", value),
                            ));
                        }
                        if record.field(key).is_none() {
                            return Err(DocumentError::unknown_field(&record.name, key));
                        }
                        order.push(OrderKey {
                            key: key.to_string(),
                            descending,
                        });
                    }
                    other => {
                        return Err(DocumentError::unknown_directive(format!(
                            "Unknown tag ':{}'",
                            other
                        )))
                    }
                },
                Item::Directive(directive) => {
                    if subject.is_scalar() {
                        return Err(DocumentError::scalar_selection(&subject));
                    }
                    let first = directive_count == 0;
                    directive_count += 1;
                    apply_directive(&mut selection, directive, record, first)?;
                }
            }
        }

        if cardinality == Cardinality::One {
            limit = 1;
        }

        let mut children = Vec::with_capacity(selection.len());
        for selected in selection {
            let child = arena.push_placeholder(selected.name(), Some(id));
            match selected {
                Selected::Field(key) => {
                    let field_type = record
                        .field(&key)
                        .map(|f| f.field_type.to_type())
                        .unwrap_or(Type::Any);
                    arena.set(child, TaskKind::Field { key }, field_type);
                }
                Selected::Computed(_, expr) => {
                    self.resolve_expression(arena, child, &expr, scopes)?;
                }
                Selected::Nested(_, query) => {
                    self.resolve_query(arena, child, query, scopes, depth + 1)?;
                }
            }
            children.push(child);
        }
        scopes.pop();

        let element = match &subject.field {
            Some(field) => record
                .field(field)
                .map(|f| f.field_type.to_type())
                .unwrap_or(Type::Any),
            None => Type::Record(
                children
                    .iter()
                    .map(|c| {
                        let task = &arena.tasks[c.0];
                        (task.name.clone(), task.result_type.clone())
                    })
                    .collect(),
            ),
        };
        let result_type = match cardinality {
            Cardinality::One => Type::Opt(Box::new(element)),
            Cardinality::Many => Type::List(Box::new(element)),
            Cardinality::Count => Type::Int,
        };

        let query = Query {
            cardinality,
            subject,
            subject_type: record.clone(),
            filters,
            order,
            limit,
            offset,
            selection: children,
        };
        arena.set(id, TaskKind::Query(query), result_type);
        Ok(())
    }

    /// Evaluates a `:limit` / `:offset` value to a non-negative integer
    fn count_tag(
        &self,
        arena: &Arena,
        scopes: &[&RecordType],
        tag: &str,
        value: &str,
        at: usize,
    ) -> DocumentResult<u64> {
        let expr = expr::parse(value).map_err(|e| DocumentError::expression_syntax(at, &e))?;
        let env = ResolveEnv {
            arena,
            params: self.params,
            scopes,
        };
        let result = self
            .evaluator
            .eval(&env, &expr)
            .map_err(|e| DocumentError::invalid_tag_value(tag, e.message()))?;
        result.as_u64().ok_or_else(|| {
            DocumentError::invalid_tag_value(
                tag,
                format!("expects a non-negative integer, got {}", result),
            )
        })
    }

    fn resolve_expression(
        &self,
        arena: &mut Arena,
        id: TaskId,
        expr: &Expr,
        scopes: &[&RecordType],
    ) -> DocumentResult<()> {
        let name = arena.tasks[id.0].name.clone();
        let (kind, result_type) = {
            let env = ResolveEnv {
                arena,
                params: self.params,
                scopes,
            };
            match self
                .evaluator
                .resolve(&env, expr)
                .map_err(|e| DocumentError::invalid_expression(&name, &e))?
            {
                Resolution::Literal(value) => {
                    let ty = Type::of_value(&value);
                    (TaskKind::Expression(Expr::Literal(value)), ty)
                }
                Resolution::Unresolved(residual) => {
                    let ty = match self.evaluator.infer(&env, &residual) {
                        Some(ty) => ty,
                        None if env.references_untyped_root(&residual) => Type::Any,
                        None => return Err(DocumentError::no_inferred_type(&name, &residual)),
                    };
                    (TaskKind::Expression(residual), ty)
                }
            }
        };
        arena.set(id, kind, result_type);
        Ok(())
    }
}

fn apply_directive(
    selection: &mut Vec<Selected>,
    directive: Directive,
    record: &RecordType,
    first: bool,
) -> DocumentResult<()> {
    match directive {
        Directive::Clear | Directive::Reset(_) if !first => {
            return Err(DocumentError::unknown_directive(format!(
                "Bare '{}' is only allowed as the first directive",
                directive.label()
            )))
        }
        Directive::Clear => selection.clear(),
        Directive::Reset(keys) => {
            selection.clear();
            for key in keys {
                include_field(selection, record, key)?;
            }
        }
        Directive::Remove(key) => match selection.iter().position(|s| s.name() == key) {
            Some(index) => {
                selection.remove(index);
            }
            None => return Err(DocumentError::not_selected(&key)),
        },
        Directive::Include(key) => include_field(selection, record, key)?,
        Directive::Computed { name, expr } => {
            if selection.iter().any(|s| s.name() == name) {
                return Err(DocumentError::ambiguous_selection(&name));
            }
            selection.push(Selected::Computed(name, expr));
        }
        Directive::Nested { name, query } => {
            if selection.iter().any(|s| s.name() == name) {
                return Err(DocumentError::ambiguous_selection(&name));
            }
            selection.push(Selected::Nested(name, query));
        }
    }
    Ok(())
}

fn include_field(selection: &mut Vec<Selected>, record: &RecordType, key: String) -> DocumentResult<()> {
    if record.field(&key).is_none() {
        return Err(DocumentError::unknown_field(&record.name, &key));
    }
    if selection.iter().any(|s| s.name() == key) {
        return Err(DocumentError::ambiguous_selection(&key));
    }
    selection.push(Selected::Field(key));
    Ok(())
}

/// Rejects `.key` symbols naming a field the record in scope does not have
fn check_fields(expr: &Expr, scopes: &[&RecordType]) -> DocumentResult<()> {
    for symbol in expr.symbols() {
        if let Symbol::Field { depth, key } = symbol {
            if let Some(record) = scope_at(scopes, *depth) {
                if record.field(key).is_none() {
                    return Err(DocumentError::unknown_field(&record.name, key));
                }
            }
        }
    }
    Ok(())
}

fn scope_at<'s>(scopes: &[&'s RecordType], depth: usize) -> Option<&'s RecordType> {
    scopes
        .len()
        .checked_sub(depth + 1)
        .and_then(|index| scopes.get(index).copied())
}

/// Symbol scope used while resolving
struct ResolveEnv<'r> {
    arena: &'r Arena,
    params: &'r Params,
    /// Records in scope, innermost last
    scopes: &'r [&'r RecordType],
}

impl ResolveEnv<'_> {
    fn root(&self, name: &str) -> Option<&Task> {
        self.arena.tasks[..self.arena.root_count]
            .iter()
            .find(|t| t.name == name)
    }

    /// True if `expr` names a root that is unresolved or has no static type
    fn references_untyped_root(&self, expr: &Expr) -> bool {
        expr.symbols().iter().any(|symbol| match symbol {
            Symbol::Root { task, .. } => self
                .root(task)
                .map(|t| !self.arena.resolved[t.id.0] || t.result_type == Type::Any)
                .unwrap_or(false),
            _ => false,
        })
    }
}

impl Environment for ResolveEnv<'_> {
    fn lookup(&self, symbol: &Symbol) -> Binding {
        match symbol {
            Symbol::Param(name) => match self.params.get(name) {
                Some(value) => Binding::Value(value.clone()),
                None => Binding::Unbound,
            },
            // Out-of-range depths are the planner's to report
            Symbol::Field { depth, key } => match scope_at(self.scopes, *depth) {
                Some(record) => match record.field(key) {
                    Some(field) => Binding::Deferred(field.field_type.to_type()),
                    None => Binding::Unbound,
                },
                None => Binding::Deferred(Type::Any),
            },
            Symbol::Root { task, path } => match self.root(task) {
                Some(root) if !self.arena.resolved[root.id.0] => Binding::Deferred(Type::Any),
                Some(root) => match path_type(&root.result_type, path) {
                    Some(ty) => Binding::Deferred(ty),
                    None => Binding::Unbound,
                },
                None => Binding::Unbound,
            },
        }
    }
}

/// Type at `path` inside a root result; optional records are looked through
fn path_type(root: &Type, path: &[String]) -> Option<Type> {
    let mut current = root.clone();
    for segment in path {
        let inner = match current {
            Type::Opt(inner) => *inner,
            other => other,
        };
        current = match inner {
            Type::Any => return Some(Type::Any),
            Type::Record(_) => inner.field(segment)?.clone(),
            _ => return None,
        };
    }
    Some(current)
}

/// Root indices in an order where referenced roots come first
fn resolution_order(syntax: &DocumentSyntax, names: &[String]) -> Vec<usize> {
    let refs: Vec<Vec<usize>> = syntax
        .declarations
        .iter()
        .enumerate()
        .map(|(index, decl)| {
            let mut found = Vec::new();
            collect_root_refs(&decl.task, &mut found);
            found
                .iter()
                .filter_map(|name| names.iter().position(|n| n == name))
                .filter(|r| *r != index)
                .collect()
        })
        .collect();

    let mut done = vec![false; names.len()];
    let mut order = Vec::with_capacity(names.len());
    while order.len() < names.len() {
        let next = (0..names.len())
            .find(|i| !done[*i] && refs[*i].iter().all(|r| done[*r]))
            .or_else(|| (0..names.len()).find(|i| !done[*i]));
        match next {
            Some(i) => {
                done[i] = true;
                order.push(i);
            }
            None => break,
        }
    }
    order
}

fn collect_root_refs(task: &TaskSyntax, out: &mut Vec<String>) {
    match task {
        TaskSyntax::Expression(expr) => push_root_refs(expr, out),
        TaskSyntax::Query(query) => collect_query_refs(query, out),
    }
}

fn collect_query_refs(query: &QuerySyntax, out: &mut Vec<String>) {
    for item in &query.items {
        match item {
            Item::Where(expr) => push_root_refs(expr, out),
            Item::Tag { value, .. } => {
                if let Ok(expr) = expr::parse(value) {
                    push_root_refs(&expr, out);
                }
            }
            Item::Directive(Directive::Computed { expr, .. }) => push_root_refs(expr, out),
            Item::Directive(Directive::Nested { query, .. }) => collect_query_refs(query, out),
            Item::Directive(_) => {}
        }
    }
}

fn push_root_refs(expr: &Expr, out: &mut Vec<String>) {
    for symbol in expr.symbols() {
        if let Symbol::Root { task, .. } = symbol {
            out.push(task.clone());
        }
    }
}
