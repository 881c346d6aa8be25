//! Schema catalog: the in-memory schema registry
//!
//! Catalog files are JSON:
//!
//! ```json
//! {"records": {"shop.category": [{"name": "id", "type": "int", "primary_key": true}]}}
//! ```
//!
//! Records keep declaration order, so "all subject fields" is deterministic.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use super::errors::{SchemaError, SchemaResult};
use super::types::{FieldDef, QualifiedName, RecordType};

/// Read-only record lookup used by the document resolver
pub trait SchemaRegistry {
    /// Resolve a qualified name to its record type
    fn lookup(&self, name: &QualifiedName) -> Option<&RecordType>;
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    records: IndexMap<String, Vec<FieldDef>>,
}

/// Schema registry backed by an ordered in-memory map
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: IndexMap<QualifiedName, RecordType>,
}

impl Catalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a catalog file from disk
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;
        Self::parse_named(&content, &path.display().to_string())
    }

    /// Parses a catalog from JSON text
    pub fn from_json(content: &str) -> SchemaResult<Self> {
        Self::parse_named(content, "<in-memory>")
    }

    fn parse_named(content: &str, source_name: &str) -> SchemaResult<Self> {
        let file: CatalogFile = serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed(source_name, format!("Invalid JSON: {}", e)))?;

        let mut catalog = Catalog::new();
        for (name, fields) in file.records {
            let qualified = QualifiedName::parse(&name).ok_or_else(|| {
                SchemaError::malformed(
                    source_name,
                    format!("Record name '{}' must be 'schema.model'", name),
                )
            })?;
            catalog.register_from(RecordType::new(qualified, fields), source_name)?;
        }
        Ok(catalog)
    }

    /// Registers a record type directly
    pub fn register(&mut self, record: RecordType) -> SchemaResult<()> {
        self.register_from(record, "<in-memory>")
    }

    fn register_from(&mut self, record: RecordType, source_name: &str) -> SchemaResult<()> {
        record
            .validate_structure()
            .map_err(|e| SchemaError::malformed(source_name, e))?;

        if self.records.contains_key(&record.name) {
            return Err(SchemaError::duplicate_record(source_name, &record.name));
        }
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    /// Number of registered records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered records in registration order
    pub fn records(&self) -> impl Iterator<Item = &RecordType> {
        self.records.values()
    }
}

impl SchemaRegistry for Catalog {
    fn lookup(&self, name: &QualifiedName) -> Option<&RecordType> {
        self.records.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::errors::SchemaErrorCode;
    use crate::schema::types::FieldType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CATALOG: &str = r#"{
        "records": {
            "shop.category": [
                {"name": "id", "type": "int", "primary_key": true, "nullable": false},
                {"name": "name", "type": "string"}
            ],
            "shop.product": [
                {"name": "id", "type": "int", "primary_key": true, "nullable": false},
                {"name": "category", "type": "int"}
            ]
        }
    }"#;

    #[test]
    fn test_parse_catalog_keeps_order() {
        let catalog = Catalog::from_json(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);

        let category = catalog
            .lookup(&QualifiedName::new("shop", "category"))
            .unwrap();
        let names: Vec<&str> = category.field_names().collect();
        assert_eq!(names, vec!["id", "name"]);
        assert_eq!(category.field("name").unwrap().field_type, FieldType::String);
    }

    #[test]
    fn test_unqualified_record_name_rejected() {
        let err = Catalog::from_json(r#"{"records": {"category": [{"name": "id", "type": "int"}]}}"#)
            .unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::Malformed);
        assert!(err.message().contains("schema.model"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut catalog = Catalog::from_json(CATALOG).unwrap();
        let record = catalog
            .lookup(&QualifiedName::new("shop", "product"))
            .cloned()
            .unwrap();
        let err = catalog.register(record).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::DuplicateRecord);
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CATALOG.as_bytes()).unwrap();

        let catalog = Catalog::load(file.path()).unwrap();
        assert!(catalog
            .lookup(&QualifiedName::new("shop", "product"))
            .is_some());
        assert!(catalog.lookup(&QualifiedName::new("shop", "order")).is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let err = Catalog::load(Path::new("/nonexistent/catalog.json")).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::Malformed);
    }
}
