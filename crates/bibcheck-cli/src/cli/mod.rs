//! CLI module for bibcheck
//!
//! Validates parsed bibliography documents against a rules directory and
//! renders the annotated result.

pub mod commands;
pub mod output;

pub use commands::{BibcheckCli, BibcheckCommands};

use bibcheck_core::{RuleError, ValidationError};

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// No findings
    Success = 0,
    /// At least one entry has findings
    FindingsReported = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// Rules or input file not readable or malformed
    FileError = 4,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Determine exit code from the number of findings
    pub fn from_findings(findings: usize) -> Self {
        if findings > 0 {
            ExitCode::FindingsReported
        } else {
            ExitCode::Success
        }
    }

    /// Determine exit code for a failed command
    pub fn from_error(error: &anyhow::Error) -> Self {
        if let Some(e) = error.downcast_ref::<ValidationError>() {
            return match e {
                ValidationError::Rules(_) => ExitCode::FileError,
                e if e.is_user_error() => ExitCode::InvalidInput,
                _ => ExitCode::InternalError,
            };
        }
        if error.downcast_ref::<RuleError>().is_some() || error.downcast_ref::<std::io::Error>().is_some() {
            return ExitCode::FileError;
        }
        ExitCode::InternalError
    }
}

/// Run a parsed command line and return the exit code
pub async fn run_cli(cli: BibcheckCli) -> ExitCode {
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from_error(&e)
        }
    }
}

async fn run(cli: BibcheckCli) -> anyhow::Result<ExitCode> {
    match cli.command {
        BibcheckCommands::Validate {
            input,
            rules,
            drop_clean,
            format,
        } => commands::execute_validate(input, rules, drop_clean, format).await,
        BibcheckCommands::Request {
            input,
            rules,
            format,
        } => commands::execute_request(input, rules, format).await,
        BibcheckCommands::Rules { rules, format } => commands::execute_rules(rules, format).await,
    }
}
