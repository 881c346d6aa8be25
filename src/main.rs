//! aeroql CLI entry point
//!
//! Parses arguments, dispatches to the CLI module and exits non-zero on
//! failure. The error response itself is already on stdout.

use aeroql::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
