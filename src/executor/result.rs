//! Result slots and type conformance

use serde_json::{Map, Number, Value};

use super::errors::{ExecutorError, ExecutorResult};
use crate::document::{Document, TaskId};
use crate::schema::Type;

/// Typed target a backend fills, one value per root task
#[derive(Debug, Clone)]
pub struct ResultSlot {
    /// Root tasks in declaration order
    entries: Vec<SlotEntry>,
    bare: bool,
}

#[derive(Debug, Clone)]
struct SlotEntry {
    task: TaskId,
    name: String,
    result_type: Type,
    value: Option<Value>,
}

impl ResultSlot {
    /// Creates an empty slot for every root task of the document
    pub fn new(document: &Document) -> Self {
        let entries = document
            .roots()
            .iter()
            .map(|&id| {
                let task = document.task(id);
                SlotEntry {
                    task: id,
                    name: task.name.clone(),
                    result_type: task.result_type.clone(),
                    value: None,
                }
            })
            .collect();
        Self {
            entries,
            bare: document.is_bare(),
        }
    }

    /// Stores the value of a root task, conformed to its type, and marks it done
    pub fn fill(&mut self, task: TaskId, value: Value) -> ExecutorResult<()> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.task == task)
            .ok_or_else(|| ExecutorError::scan_mismatch(&task.to_string(), "not a root task"))?;
        entry.value = Some(conform(value, &entry.result_type));
        Ok(())
    }

    pub fn is_done(&self, task: TaskId) -> bool {
        self.entries.iter().any(|e| e.task == task && e.value.is_some())
    }

    /// True once every root task is done
    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(|e| e.value.is_some())
    }

    /// Value of a finished root task
    pub fn get(&self, task: TaskId) -> Option<&Value> {
        self.entries
            .iter()
            .find(|e| e.task == task)
            .and_then(|e| e.value.as_ref())
    }

    /// Value of a finished root task, by name
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .and_then(|e| e.value.as_ref())
    }

    /// Assembles the result tree
    ///
    /// A bare document yields its single value; declarations yield an object
    /// keyed by root name in declaration order.
    pub fn into_value(self) -> ExecutorResult<Value> {
        if let Some(missing) = self.entries.iter().find(|e| e.value.is_none()) {
            return Err(ExecutorError::scan_mismatch(
                &missing.name,
                "backend finished without filling this root task",
            ));
        }

        if self.bare {
            return Ok(self
                .entries
                .into_iter()
                .next()
                .and_then(|e| e.value)
                .unwrap_or(Value::Null));
        }

        let mut out = Map::new();
        for entry in self.entries {
            out.insert(entry.name, entry.value.unwrap_or(Value::Null));
        }
        Ok(Value::Object(out))
    }
}

/// Normalizes a backend value to a result type
///
/// Records are rebuilt in declared key order with `null` for missing keys,
/// integral floats become integers where an int is expected, integers become
/// floats where a float is expected, and a `null` list becomes `[]`.
pub fn conform(value: Value, ty: &Type) -> Value {
    match (ty, value) {
        (Type::Any, value) => value,
        (Type::Int, Value::Number(n)) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() && f.fract() == 0.0 => {
                Value::Number(Number::from(f as i64))
            }
            _ => Value::Number(n),
        },
        (Type::Float, Value::Number(n)) => match n.as_f64().and_then(Number::from_f64) {
            Some(f) => Value::Number(f),
            None => Value::Number(n),
        },
        (Type::Record(fields), Value::Object(mut object)) => {
            let mut out = Map::new();
            for (key, field_type) in fields {
                let field = object.remove(key).unwrap_or(Value::Null);
                out.insert(key.clone(), conform(field, field_type));
            }
            Value::Object(out)
        }
        (Type::Opt(_), Value::Null) => Value::Null,
        (Type::Opt(inner), value) => conform(value, inner),
        (Type::List(_), Value::Null) => Value::Array(Vec::new()),
        (Type::List(inner), Value::Array(items)) => {
            Value::Array(items.into_iter().map(|v| conform(v, inner)).collect())
        }
        (_, value) => value,
    }
}
