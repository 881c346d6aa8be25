//! CLI module for aeroql
//!
//! Provides command-line interface for:
//! - plan: Job graph of a document as JSON
//! - explain: Human-readable explain text
//! - sql: Compiled PostgreSQL statements
//! - run: One-shot execution against a JSON store

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, DocumentArgs};
pub use commands::{execute, parse_params, run, run_command};
pub use errors::{CliError, CliResult};
pub use io::{read_document, write_error, write_response};
