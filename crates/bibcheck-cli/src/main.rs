//! bibcheck CLI
//!
//! Command-line interface for bibliography conformance validation.
//!
//! # Usage
//!
//! ```bash
//! # Validate a parsed document, keeping only entries with findings
//! bibcheck validate --input refs.json --rules conformityRules --drop-clean
//!
//! # Validate a raw argument array: [document] or [document, keepEntries]
//! bibcheck request --input args.json --format json
//!
//! # Show the merged rule base
//! bibcheck rules --rules conformityRules --format yaml
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success - no findings
//! - 1: Findings were reported
//! - 3: Invalid input or arguments
//! - 4: Rule or file error
//! - 10: Internal error

mod cli;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::BibcheckCli;

#[tokio::main]
async fn main() {
    let cli = BibcheckCli::parse();
    init_tracing(cli.verbose, cli.log_json || log_json_from_env());

    let exit_code = cli::run_cli(cli).await;
    std::process::exit(exit_code.into());
}

fn log_json_from_env() -> bool {
    std::env::var("BIBCHECK_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn init_tracing(verbose: u8, json: bool) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
