//! CLI argument definitions using clap
//!
//! Commands:
//! - aeroql plan --schema <path> <document>
//! - aeroql explain --schema <path> <document>
//! - aeroql sql --schema <path> <document>
//! - aeroql run --schema <path> --data <path> <document>

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// aeroql - declarative nested queries over relational schemas
#[derive(Parser, Debug)]
#[command(name = "aeroql")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every command
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Path to the schema catalog (JSON)
    #[arg(long)]
    pub schema: PathBuf,

    /// Path to engine configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Parameter binding, `name=<json>`; repeatable
    #[arg(long = "param", value_name = "NAME=JSON")]
    pub params: Vec<String>,

    /// Path to the query document, or `-` for stdin
    pub document: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Plan a document and print its job graph as JSON
    Plan(DocumentArgs),

    /// Plan a document and print the explain text
    Explain(DocumentArgs),

    /// Compile every root query to PostgreSQL
    Sql(DocumentArgs),

    /// Execute a document against an in-memory store
    Run {
        #[command(flatten)]
        args: DocumentArgs,

        /// Path to the store contents (JSON, `{"schema.model": [records]}`)
        #[arg(long)]
        data: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
