//! Error types for bibcheck
//!
//! Provides structured error types for rule loading, request handling and
//! entry validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or serving conformance rules
#[derive(Error, Debug)]
pub enum RuleError {
    /// Malformed rule syntax, e.g. a wildcard key with a misplaced marker
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A rule file or the rules directory could not be read
    #[error("Failed to read rules from '{}': {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A rule file is not valid JSON
    #[error("Failed to parse rule file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A rule file parsed but does not have the expected shape
    #[error("Invalid rule in '{source_name}': {message}")]
    InvalidRule {
        source_name: String,
        message: String,
    },

    /// The store failed to load, or was dropped while a request was queued
    #[error("Rule store unavailable: {0}")]
    Unavailable(String),
}

impl RuleError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        RuleError::Configuration(msg.into())
    }

    /// Create an invalid rule error
    pub fn invalid_rule(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        RuleError::InvalidRule {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Main error type for validation operations
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The top-level call was made with the wrong number of arguments
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The input document could not be interpreted
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Rule loading or evaluation failed
    #[error(transparent)]
    Rules(#[from] RuleError),

    /// A check reported a failure instead of diagnostics
    #[error("Check '{category}' failed: {message}")]
    CheckFailed { category: String, message: String },

    /// A unit of work was dropped without reporting completion
    #[error("Validation unit abandoned: {0}")]
    Abandoned(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ValidationError {
    /// Create an invalid arguments error
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        ValidationError::InvalidArguments(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        ValidationError::InvalidInput(msg.into())
    }

    /// Create a check failure
    pub fn check_failed(category: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::CheckFailed {
            category: category.into(),
            message: message.into(),
        }
    }

    /// Check if this is a user-facing error (vs internal)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ValidationError::InvalidArguments(_)
                | ValidationError::InvalidInput(_)
                | ValidationError::Rules(RuleError::Configuration(_))
                | ValidationError::Rules(RuleError::Load { .. })
                | ValidationError::Rules(RuleError::Parse { .. })
                | ValidationError::Rules(RuleError::InvalidRule { .. })
                | ValidationError::Serialization(_)
        )
    }
}

/// Result type alias for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;
