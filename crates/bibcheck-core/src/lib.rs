//! bibcheck core
//!
//! Concurrent validation of parsed bibliographic entries against declarative
//! conformance rules.
//!
//! ## Features
//!
//! - **Declarative rules**: JSON rule files per entry type, with required,
//!   mutually exclusive and alternative tags, plus prefix (wildcard) rules
//! - **Lazy rule store**: rules load in the background; early evaluations are
//!   queued and answered in order once the rules are ready
//! - **Concurrent checks**: conformance, spelling and abbreviation checks run
//!   concurrently per entry, and entries run concurrently per document
//! - **Stable output**: entry order is preserved and conformance codes are
//!   stable numbers
//!
//! ## Architecture
//!
//! 1. **Rules** (`rules/`): rule model, directory loading, the rule store
//!    and the conformance evaluator.
//!
//! 2. **Checks** (`checks/`): the [`Check`] trait and its conformance
//!    implementation.
//!
//! 3. **Coordinator** (`coordinator`): the fan-out/fan-in barrier used to
//!    join concurrent checks.
//!
//! 4. **Validator** (`validator`): per-entry and per-document orchestration.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bibcheck_core::{Document, Entry, RuleStore, ValidateOptions, Validator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(RuleStore::new());
//!     store.spawn_load("conformityRules");
//!
//!     let validator = Validator::new(store);
//!     let document = Document::new(vec![
//!         Entry::new("knuth1984", "article").with_tag("title", "Literate Programming"),
//!     ]);
//!
//!     if let Some(result) = validator
//!         .validate_document(document, ValidateOptions::drop_clean())
//!         .await?
//!     {
//!         println!("{}", serde_json::to_string_pretty(&result)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod checks;
pub mod config;
pub mod coordinator;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod merge;
pub mod request;
pub mod rules;
pub mod validator;

pub use checks::{Check, ConformanceCheck, Unchecked};
pub use config::{ValidatorConfig, ValidatorConfigBuilder};
pub use coordinator::{Completion, Coordinator, Settled};
pub use diagnostics::{Conformance, ConformanceCode, Diagnostic, EntryReport, FieldReport};
pub use entry::{Document, Entry, EntryConfig, Macros};
pub use error::{Result, RuleError, ValidationError};
pub use merge::MergeInto;
pub use request::ValidateRequest;
pub use rules::{RuleBase, RuleStore, Ruleset, TagRule};
pub use validator::{ValidateOptions, Validator, ValidatorBuilder};

/// Library version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
