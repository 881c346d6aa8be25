//! Record and result type definitions
//!
//! Field types:
//! - string: UTF-8 string
//! - int: 64-bit signed integer
//! - float: 64-bit floating point
//! - bool: Boolean
//!
//! Result types add records, optionals and lists on top of the scalars.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supported scalar field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
        }
    }

    /// The result type a column of this field type produces
    pub fn to_type(self) -> Type {
        match self {
            FieldType::String => Type::String,
            FieldType::Int => Type::Int,
            FieldType::Float => Type::Float,
            FieldType::Bool => Type::Bool,
        }
    }
}

/// Field definition of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field (column) name
    pub name: String,
    /// Field data type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether this field is (part of) the primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the field may hold null
    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

impl FieldDef {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: false,
            nullable: true,
        }
    }

    /// Create a primary key field (never null)
    pub fn primary(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            primary_key: true,
            nullable: false,
        }
    }
}

/// A `schema.model` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QualifiedName {
    pub schema: String,
    pub model: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            model: model.into(),
        }
    }

    /// Parses `schema.model`; anything else is rejected
    pub fn parse(text: &str) -> Option<Self> {
        let (schema, model) = text.split_once('.')?;
        if schema.is_empty() || model.is_empty() || model.contains('.') {
            return None;
        }
        Some(Self::new(schema, model))
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.model)
    }
}

/// A record type with ordered fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    pub name: QualifiedName,
    pub fields: Vec<FieldDef>,
}

impl RecordType {
    pub fn new(name: QualifiedName, fields: Vec<FieldDef>) -> Self {
        Self { name, fields }
    }

    /// Looks up a field by name
    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == key)
    }

    /// Returns the first primary key field
    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.primary_key)
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// The full record as a result type
    pub fn to_type(&self) -> Type {
        Type::Record(
            self.fields
                .iter()
                .map(|f| (f.name.clone(), f.field_type.to_type()))
                .collect(),
        )
    }

    /// Validates the record structure itself
    pub fn validate_structure(&self) -> Result<(), String> {
        if self.fields.is_empty() {
            return Err(format!("Record '{}' declares no fields", self.name));
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(format!(
                    "Record '{}' declares field '{}' twice",
                    self.name, field.name
                ));
            }
            if field.primary_key && field.nullable {
                return Err(format!(
                    "Primary key field '{}.{}' must not be nullable",
                    self.name, field.name
                ));
            }
        }
        Ok(())
    }
}

/// Result type of a task
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Statically unknown
    Any,
    Null,
    Bool,
    Int,
    Float,
    String,
    /// Ordered named fields
    Record(Vec<(String, Type)>),
    /// At most one value
    Opt(Box<Type>),
    List(Box<Type>),
}

impl Type {
    /// The type a concrete value carries
    pub fn of_value(value: &Value) -> Type {
        match value {
            Value::Null => Type::Null,
            Value::Bool(_) => Type::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => Type::Int,
            Value::Number(_) => Type::Float,
            Value::String(_) => Type::String,
            Value::Array(_) => Type::List(Box::new(Type::Any)),
            Value::Object(_) => Type::Any,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    /// Field type of a record
    pub fn field(&self, key: &str) -> Option<&Type> {
        match self {
            Type::Record(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, t)| t),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Record(fields) => {
                write!(f, "{{")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, ty)?;
                }
                write!(f, "}}")
            }
            Type::Opt(inner) => write!(f, "opt<{}>", inner),
            Type::List(inner) => write!(f, "list<{}>", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn category() -> RecordType {
        RecordType::new(
            QualifiedName::new("shop", "category"),
            vec![
                FieldDef::primary("id", FieldType::Int),
                FieldDef::new("name", FieldType::String),
            ],
        )
    }

    #[test]
    fn test_qualified_name_parse() {
        assert_eq!(
            QualifiedName::parse("shop.category"),
            Some(QualifiedName::new("shop", "category"))
        );
        assert_eq!(QualifiedName::parse("category"), None);
        assert_eq!(QualifiedName::parse("a.b.c"), None);
        assert_eq!(QualifiedName::parse(".b"), None);
    }

    #[test]
    fn test_record_structure_valid() {
        assert!(category().validate_structure().is_ok());
        assert_eq!(category().primary_key().unwrap().name, "id");
    }

    #[test]
    fn test_record_duplicate_field_rejected() {
        let mut record = category();
        record.fields.push(FieldDef::new("name", FieldType::String));
        let err = record.validate_structure().unwrap_err();
        assert!(err.contains("twice"));
    }

    #[test]
    fn test_record_to_type_keeps_order() {
        let ty = category().to_type();
        assert_eq!(ty.to_string(), "{id: int, name: string}");
        assert_eq!(ty.field("name"), Some(&Type::String));
    }

    #[test]
    fn test_type_of_value() {
        assert_eq!(Type::of_value(&json!(3)), Type::Int);
        assert_eq!(Type::of_value(&json!(3.5)), Type::Float);
        assert_eq!(Type::of_value(&json!("x")), Type::String);
        assert_eq!(Type::of_value(&json!(null)), Type::Null);
    }

    #[test]
    fn test_field_def_deserialize_defaults() {
        let def: FieldDef = serde_json::from_value(json!({"name": "price", "type": "float"})).unwrap();
        assert!(def.nullable);
        assert!(!def.primary_key);
        assert_eq!(def.field_type, FieldType::Float);
    }
}
