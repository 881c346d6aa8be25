//! CLI command implementations
//!
//! Every command loads the catalog and configuration, prepares the document,
//! and answers with exactly one JSON object on stdout.

use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::engine::{Engine, Prepared};
use crate::error::QlError;
use crate::executor::{MemoryBackend, MemoryStore};
use crate::expr::{self, Params};
use crate::schema::Catalog;

use super::args::{Cli, Command, DocumentArgs};
use super::errors::{CliError, CliResult};
use super::io::{read_document, write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Runs `command` and writes its response
///
/// Failures are reported on stdout as an error object and returned.
pub fn run_command(command: Command) -> CliResult<()> {
    match execute(command) {
        Ok(data) => write_response(data),
        Err(err) => {
            write_error(err.code(), &err.message())?;
            Err(err)
        }
    }
}

/// Computes the response data of `command`
pub fn execute(command: Command) -> CliResult<Value> {
    match command {
        Command::Plan(args) => {
            let (engine, prepared) = prepare(&args)?;
            Ok(engine.explain(&prepared).to_json())
        }
        Command::Explain(args) => {
            let (engine, prepared) = prepare(&args)?;
            Ok(Value::String(engine.explain(&prepared).to_string()))
        }
        Command::Sql(args) => {
            let (engine, prepared) = prepare(&args)?;
            sql(&engine, &prepared)
        }
        Command::Run { args, data } => {
            let store = load_store(&data)?;
            let (engine, prepared) = prepare(&args)?;
            let mut backend = MemoryBackend::new(&store);
            Ok(engine.execute(&prepared, &mut backend)?)
        }
    }
}

fn prepare(args: &DocumentArgs) -> CliResult<(Engine, Prepared)> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path).map_err(QlError::from)?,
        None => EngineConfig::default(),
    };
    let catalog = Catalog::load(&args.schema).map_err(QlError::from)?;
    let params = parse_params(&args.params)?;
    let text = read_document(&args.document)?;

    let engine = Engine::new(catalog, config);
    let prepared = engine.prepare(&text, params)?;
    Ok((engine, prepared))
}

fn sql(engine: &Engine, prepared: &Prepared) -> CliResult<Value> {
    let statements = engine.compile_sql(prepared)?;
    let document = prepared.document();
    Ok(Value::Array(
        statements
            .iter()
            .map(|s| {
                json!({
                    "task": document.task(s.task).name,
                    "sql": s.sql,
                    "params": s.params.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
                    "columns": s.columns,
                })
            })
            .collect(),
    ))
}

fn load_store(path: &Path) -> CliResult<MemoryStore> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::Io(format!("{}: {}", path.display(), e)))?;
    Ok(MemoryStore::from_json(&content).map_err(QlError::from)?)
}

/// Parses `name=<json>` bindings, in order
pub fn parse_params(bindings: &[String]) -> CliResult<Params> {
    let mut params = Params::new();
    for binding in bindings {
        let (name, raw) = binding
            .split_once('=')
            .ok_or_else(|| CliError::InvalidParam(binding.clone(), "expected name=<json>".into()))?;
        if !expr::is_identifier(name) {
            return Err(CliError::InvalidParam(
                binding.clone(),
                format!("'{}' is not an identifier", name),
            ));
        }
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| CliError::InvalidParam(binding.clone(), e.to_string()))?;
        params.insert(name.to_string(), value);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn schema() -> NamedTempFile {
        file(
            r#"{"records": {"shop.category": [
                {"name": "id", "type": "int", "primary_key": true, "nullable": false},
                {"name": "name", "type": "string"}
            ]}}"#,
        )
    }

    fn args(schema: &NamedTempFile, document: &NamedTempFile, params: &[&str]) -> DocumentArgs {
        DocumentArgs {
            schema: schema.path().to_path_buf(),
            config: None,
            params: params.iter().map(|p| p.to_string()).collect(),
            document: document.path().display().to_string(),
        }
    }

    #[test]
    fn test_parse_params() {
        let params = parse_params(&["min=5".into(), "tag=\"a=b\"".into()]).unwrap();
        assert_eq!(params["min"], json!(5));
        assert_eq!(params["tag"], json!("a=b"));

        assert!(matches!(
            parse_params(&["min".into()]),
            Err(CliError::InvalidParam(..))
        ));
        assert!(matches!(
            parse_params(&["min=five".into()]),
            Err(CliError::InvalidParam(..))
        ));
        assert!(matches!(
            parse_params(&["1x=1".into()]),
            Err(CliError::InvalidParam(..))
        ));
    }

    #[test]
    fn test_run_command() {
        let schema = schema();
        let document = file("*shop.category (gt .id $min) + name");
        let data = file(r#"{"shop.category": [{"id": 1, "name": "Music"}, {"id": 2, "name": "Books"}]}"#);

        let value = execute(Command::Run {
            args: args(&schema, &document, &["min=1"]),
            data: data.path().to_path_buf(),
        })
        .unwrap();
        assert_eq!(value, json!([{"name": "Books"}]));
    }

    #[test]
    fn test_sql_command() {
        let schema = schema();
        let document = file("*shop.category (gt .id $min) + name");
        let value = execute(Command::Sql(args(&schema, &document, &["min=1"]))).unwrap();
        assert_eq!(
            value,
            json!([{
                "task": "result",
                "sql": "SELECT c.name FROM shop.category c WHERE c.id > $1",
                "params": ["$min"],
                "columns": ["name"]
            }])
        );
    }

    #[test]
    fn test_plan_command() {
        let schema = schema();
        let document = file("*shop.category");
        let value = execute(Command::Plan(args(&schema, &document, &[]))).unwrap();
        assert_eq!(value["execution_order"], json!(["result"]));
    }

    #[test]
    fn test_pipeline_error_keeps_code() {
        let schema = schema();
        let document = file("*shop.nothing");
        let err = execute(Command::Explain(args(&schema, &document, &[]))).unwrap_err();
        assert_eq!(err.code(), "AEROQL_MISSING_MODEL");
    }
}
