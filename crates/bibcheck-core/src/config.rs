//! Validator configuration

use std::path::PathBuf;

use crate::validator::ValidateOptions;

/// Default rules directory, relative to the working directory
pub const DEFAULT_RULES_DIR: &str = "conformityRules";

/// Validator configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Directory holding the JSON rule files
    pub rules_dir: PathBuf,

    /// Keep entries without findings in validation results
    pub keep_entries: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            rules_dir: PathBuf::from(DEFAULT_RULES_DIR),
            keep_entries: true,
        }
    }
}

impl ValidatorConfig {
    /// Create a new config builder
    pub fn builder() -> ValidatorConfigBuilder {
        ValidatorConfigBuilder::new()
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            rules_dir: lookup("BIBCHECK_RULES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.rules_dir),
            keep_entries: lookup("BIBCHECK_KEEP_ENTRIES")
                .map(|v| v.parse().unwrap_or(defaults.keep_entries))
                .unwrap_or(defaults.keep_entries),
        }
    }

    /// Options for document validation
    pub fn options(&self) -> ValidateOptions {
        ValidateOptions {
            keep_entries: self.keep_entries,
        }
    }
}

/// Builder for ValidatorConfig
pub struct ValidatorConfigBuilder {
    config: ValidatorConfig,
}

impl Default for ValidatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ValidatorConfig::default(),
        }
    }

    /// Start from an existing config, e.g. one read from the environment
    pub fn from_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn rules_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.rules_dir = dir.into();
        self
    }

    pub fn keep_entries(mut self, keep: bool) -> Self {
        self.config.keep_entries = keep;
        self
    }

    pub fn build(self) -> ValidatorConfig {
        self.config
    }
}
