//! CLI command definitions for bibcheck

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use bibcheck_core::rules::load_dir;
use bibcheck_core::{
    Document, ValidateRequest, ValidationError, Validator, ValidatorConfig, ValidatorConfigBuilder,
};

use super::output::{DocumentOutput, OutputFormat, RulesOutput};
use super::ExitCode;

/// Path argument meaning standard input
const STDIN: &str = "-";

/// bibcheck CLI
///
/// Check parsed bibliography entries against conformance rules.
#[derive(Parser, Debug)]
#[command(name = "bibcheck")]
#[command(about = "Validate bibliography entries against conformance rules", long_about = None)]
#[command(version)]
pub struct BibcheckCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON (also BIBCHECK_LOG_FORMAT=json)
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: BibcheckCommands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum BibcheckCommands {
    /// Validate a parsed bibliography document
    ///
    /// The input is the JSON produced by the BibTeX parser: an object with
    /// `entries` and optional `strings`.
    Validate {
        /// Document file, or `-` for standard input
        #[arg(short, long)]
        input: PathBuf,

        /// Rules directory
        #[arg(short, long, env = "BIBCHECK_RULES_DIR")]
        rules: Option<PathBuf>,

        /// Drop entries without findings, and the macro table
        #[arg(long)]
        drop_clean: bool,

        /// Output format for the validated document
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Validate a raw call: `[document]` or `[document, keepEntries]`
    Request {
        /// Argument array file, or `-` for standard input
        #[arg(short, long)]
        input: PathBuf,

        /// Rules directory
        #[arg(short, long, env = "BIBCHECK_RULES_DIR")]
        rules: Option<PathBuf>,

        /// Output format for the validated document
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Load a rules directory and show the merged rules
    Rules {
        /// Rules directory
        #[arg(short, long, env = "BIBCHECK_RULES_DIR")]
        rules: Option<PathBuf>,

        /// Output format for the rules
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Resolve configuration: environment first, flags on top
fn resolve_config(rules: Option<PathBuf>, drop_clean: bool) -> ValidatorConfig {
    let mut builder = ValidatorConfigBuilder::from_config(ValidatorConfig::from_env());
    if let Some(dir) = rules {
        builder = builder.rules_dir(dir);
    }
    if drop_clean {
        builder = builder.keep_entries(false);
    }
    builder.build()
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == STDIN {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Failed to read standard input")?;
        return Ok(text);
    }

    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))
}

/// Execute the validate command
pub async fn execute_validate(
    input: PathBuf,
    rules: Option<PathBuf>,
    drop_clean: bool,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let config = resolve_config(rules, drop_clean);
    let text = read_input(&input).await?;
    let document: Document = serde_json::from_str(&text)
        .map_err(|e| ValidationError::invalid_input(format!("malformed document: {}", e)))?;

    tracing::info!(
        input = %input.display(),
        rules = %config.rules_dir.display(),
        entries = document.entries.len(),
        "Validating document"
    );

    let validator = Validator::from_config(&config).await?;
    let result = validator.validate_document(document, config.options()).await?;

    let output = DocumentOutput::new(result.as_ref());
    output.render(format)?;
    Ok(ExitCode::from_findings(output.finding_count()))
}

/// Execute the request command
pub async fn execute_request(
    input: PathBuf,
    rules: Option<PathBuf>,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let text = read_input(&input).await?;
    let request = ValidateRequest::from_json(&text)?;

    let config = resolve_config(rules, false);
    let validator = Validator::from_config(&config).await?;
    let result = validator.validate_request(request).await?;

    let output = DocumentOutput::new(result.as_ref());
    output.render(format)?;
    Ok(ExitCode::from_findings(output.finding_count()))
}

/// Execute the rules command
pub async fn execute_rules(rules: Option<PathBuf>, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let config = resolve_config(rules, false);
    let base = load_dir(&config.rules_dir).await?;

    RulesOutput::new(&base).render(format)?;
    Ok(ExitCode::Success)
}
