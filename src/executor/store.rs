//! In-memory record store
//!
//! Store files are JSON objects keyed by qualified table name:
//!
//! ```json
//! {"shop.category": [{"id": 1, "name": "Books"}]}
//! ```
//!
//! Tables keep insertion order, which is the natural order of an unordered query.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::errors::{ExecutorError, ExecutorResult};
use crate::schema::QualifiedName;

/// Record collections keyed by `schema.model`
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: IndexMap<String, Vec<Map<String, Value>>>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a store from JSON text
    pub fn from_json(content: &str) -> ExecutorResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| ExecutorError::invalid_store(format!("Invalid JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Builds a store from a JSON object of record arrays
    pub fn from_value(value: Value) -> ExecutorResult<Self> {
        let tables = match value {
            Value::Object(tables) => tables,
            other => {
                return Err(ExecutorError::invalid_store(format!(
                    "Store must be an object of tables, got {}",
                    other
                )))
            }
        };

        let mut store = MemoryStore::new();
        for (name, records) in tables {
            let table = QualifiedName::parse(&name).ok_or_else(|| {
                ExecutorError::invalid_store(format!("Table name '{}' must be 'schema.model'", name))
            })?;
            let records = match records {
                Value::Array(records) => records,
                _ => {
                    return Err(ExecutorError::invalid_store(format!(
                        "Table '{}' must be an array of records",
                        name
                    )))
                }
            };
            store.create_table(&table);
            for record in records {
                store.insert(&table, record)?;
            }
        }
        Ok(store)
    }

    /// Registers an empty table; existing tables are kept
    pub fn create_table(&mut self, table: &QualifiedName) {
        self.tables.entry(table.to_string()).or_default();
    }

    /// Appends one record, creating the table if needed
    pub fn insert(&mut self, table: &QualifiedName, record: Value) -> ExecutorResult<()> {
        match record {
            Value::Object(record) => {
                self.tables.entry(table.to_string()).or_default().push(record);
                Ok(())
            }
            other => Err(ExecutorError::invalid_store(format!(
                "Record of '{}' is not an object: {}",
                table, other
            ))),
        }
    }

    /// Records of a table in natural order
    pub fn scan(&self, table: &QualifiedName) -> Option<&[Map<String, Value>]> {
        self.tables.get(&table.to_string()).map(Vec::as_slice)
    }

    /// Number of tables
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}
