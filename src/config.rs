//! Engine configuration
//!
//! Configuration files are JSON; every field is optional:
//!
//! ```json
//! {"default_schema": "shop", "max_depth": 8, "log_level": "warn",
//!  "sql": {"aggregate_function": "jsonb_agg", "allow_field_queries": true}}
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::ResolveOptions;
use crate::observability::Severity;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Read(String),

    /// Config file is not valid JSON for this structure
    #[error("Invalid config JSON: {0}")]
    Parse(String),

    /// A field holds a value outside its allowed range
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        "AEROQL_CONFIG_ERROR"
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Schema used for one-segment subject references
    #[serde(default)]
    pub default_schema: Option<String>,

    /// Deepest allowed nesting of queries (optional, default 8)
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Minimum log severity: trace, info, warn, error (optional, default "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub sql: SqlConfig,
}

/// SQL rendering options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqlConfig {
    /// Aggregate collapsing inlined rows into one JSON array
    #[serde(default = "default_aggregate_function")]
    pub aggregate_function: String,

    /// Function turning one inlined row into a JSON object
    #[serde(default = "default_object_function")]
    pub object_function: String,

    /// Function building a JSON object from key/value pairs (joined children)
    #[serde(default = "default_build_object_function")]
    pub build_object_function: String,

    /// Whether field-path queries (`schema.model.field`) may be compiled
    #[serde(default = "default_allow_field_queries")]
    pub allow_field_queries: bool,

    /// Collation of string order keys; bytewise "C" matches in-memory ordering
    #[serde(default = "default_string_collation")]
    pub string_collation: Option<String>,
}

fn default_max_depth() -> usize {
    8
}
fn default_log_level() -> String {
    "warn".to_string()
}
fn default_aggregate_function() -> String {
    "jsonb_agg".to_string()
}
fn default_object_function() -> String {
    "to_jsonb".to_string()
}
fn default_build_object_function() -> String {
    "jsonb_build_object".to_string()
}
fn default_allow_field_queries() -> bool {
    true
}
fn default_string_collation() -> Option<String> {
    Some("C".to_string())
}

impl Default for SqlConfig {
    fn default() -> Self {
        Self {
            aggregate_function: default_aggregate_function(),
            object_function: default_object_function(),
            build_object_function: default_build_object_function(),
            allow_field_queries: default_allow_field_queries(),
            string_collation: default_string_collation(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_schema: None,
            max_depth: default_max_depth(),
            log_level: default_log_level(),
            sql: SqlConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_json(&content)
    }

    /// Parses and validates configuration JSON
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be > 0".into()));
        }

        if Severity::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!(
                "Invalid log_level: '{}'. Must be one of trace, info, warn, error.",
                self.log_level
            )));
        }

        if let Some(schema) = &self.default_schema {
            if !crate::expr::is_identifier(schema) {
                return Err(ConfigError::Invalid(format!(
                    "Invalid default_schema: '{}'",
                    schema
                )));
            }
        }

        for (name, function) in [
            ("aggregate_function", &self.sql.aggregate_function),
            ("object_function", &self.sql.object_function),
            ("build_object_function", &self.sql.build_object_function),
        ] {
            if !is_function_name(function) {
                return Err(ConfigError::Invalid(format!(
                    "Invalid sql.{}: '{}'",
                    name, function
                )));
            }
        }

        if let Some(collation) = &self.sql.string_collation {
            if collation.is_empty() || collation.contains('"') {
                return Err(ConfigError::Invalid(format!(
                    "Invalid sql.string_collation: '{}'",
                    collation
                )));
            }
        }

        Ok(())
    }

    /// Minimum log severity; validated on load
    pub fn min_severity(&self) -> Severity {
        Severity::parse(&self.log_level).unwrap_or(Severity::Warn)
    }

    /// Resolver options derived from this configuration
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            default_schema: self.default_schema.clone(),
            max_depth: self.max_depth,
        }
    }
}

/// Accepts `name` or `schema.name` made of identifier characters
fn is_function_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'))
}
