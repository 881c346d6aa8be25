//! JSON I/O handling for CLI
//!
//! - Input: the document as text, from a file or stdin
//! - Output: one JSON object on stdout
//! - Logs go to stderr and never mix with the response

use std::fs;
use std::io::{self, Read, Write};

use serde_json::Value;

use super::errors::{CliError, CliResult};

/// Reads the document from `source`, `-` meaning stdin
pub fn read_document(source: &str) -> CliResult<String> {
    let text = if source == "-" {
        let mut text = String::new();
        io::stdin().lock().read_to_string(&mut text)?;
        text
    } else {
        fs::read_to_string(source).map_err(|e| CliError::Io(format!("{}: {}", source, e)))?
    };

    if text.trim().is_empty() {
        return Err(CliError::Io("Empty document".into()));
    }
    Ok(text)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_value(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_value(&response)
}

fn write_value(response: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
