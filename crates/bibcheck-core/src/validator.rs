//! Entry and document validation
//!
//! Each entry fans out to its checks (conformance, spelling, abbreviations)
//! concurrently and merges their reports. A document fans out to all of its
//! entries and folds the results back in original order, dropping entries
//! without findings unless asked to keep them.

use std::sync::Arc;

use crate::checks::{Check, ConformanceCheck, Unchecked, ABBREVIATION, SPELLING};
use crate::config::ValidatorConfig;
use crate::coordinator::Coordinator;
use crate::diagnostics::EntryReport;
use crate::entry::{Document, Entry, EntryConfig, Macros};
use crate::error::{Result, ValidationError};
use crate::merge::MergeInto;
use crate::request::ValidateRequest;
use crate::rules::RuleStore;

/// Options for [`Validator::validate_document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Keep entries without findings, and keep the macro table
    pub keep_entries: bool,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self { keep_entries: true }
    }
}

impl ValidateOptions {
    /// Drop entries without findings and strip the macro table
    pub fn drop_clean() -> Self {
        Self {
            keep_entries: false,
        }
    }
}

struct Inner {
    store: Arc<RuleStore>,
    checks: Vec<Arc<dyn Check>>,
}

/// Validates entries and documents; cheap to clone
#[derive(Clone)]
pub struct Validator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("store", &self.inner.store)
            .field("checks", &self.categories())
            .finish()
    }
}

impl Validator {
    /// Create a validator with conformance checking only
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self::builder(store).build()
    }

    pub fn builder(store: Arc<RuleStore>) -> ValidatorBuilder {
        ValidatorBuilder::new(store)
    }

    /// Create a validator and load its rules as configured
    pub async fn from_config(config: &ValidatorConfig) -> Result<Self> {
        let store = Arc::new(RuleStore::new());
        store.load(&config.rules_dir).await?;
        Ok(Self::new(store))
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.inner.store
    }

    /// Categories of the registered checks, in registration order
    pub fn categories(&self) -> Vec<&str> {
        self.inner.checks.iter().map(|c| c.category()).collect()
    }

    /// Run every check against one entry and merge their reports
    ///
    /// Entries whose configuration marks them as already validated are
    /// skipped with an empty report.
    pub async fn validate_entry(&self, entry: Arc<Entry>, macros: Arc<Macros>) -> Result<EntryReport> {
        if EntryConfig::from_entry(&entry, &macros).ok {
            tracing::debug!(citation_key = %entry.citation_key, "Skipping previously validated entry");
            return Ok(EntryReport::new());
        }

        let (coordinator, settled) = Coordinator::channel();
        for check in &self.inner.checks {
            let unit = coordinator.register();
            let check = Arc::clone(check);
            let entry = Arc::clone(&entry);
            let macros = Arc::clone(&macros);

            tokio::spawn(async move {
                let result = check.check(&entry, &macros).await;
                unit.complete(result);
            });
        }
        coordinator.run();

        let mut report = EntryReport::new();
        for part in settled.await? {
            let part = part.ok_or_else(|| {
                ValidationError::Abandoned(format!("check of entry '{}'", entry.citation_key))
            })?;
            part?.merge_into(&mut report);
        }

        Ok(report)
    }

    /// Validate every entry of a document
    ///
    /// Returns `None` when no entries remain. Entries are never reordered;
    /// an entry without findings is removed unless `keep_entries` is set, in
    /// which case the macro table is kept too. Any failure aborts the whole
    /// call.
    pub async fn validate_document(
        &self,
        document: Document,
        options: ValidateOptions,
    ) -> Result<Option<Document>> {
        let total = document.entries.len();
        match self.run_document(document, options).await {
            Ok(result) => {
                let kept = result.as_ref().map_or(0, |d| d.entries.len());
                tracing::info!(entries = total, kept, "Validated document");
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, source = ?std::error::Error::source(&e), "Document validation aborted");
                Err(e)
            }
        }
    }

    /// Validate a request built from raw call arguments
    pub async fn validate_request(&self, request: ValidateRequest) -> Result<Option<Document>> {
        self.validate_document(request.document, request.options).await
    }

    async fn run_document(
        &self,
        mut document: Document,
        options: ValidateOptions,
    ) -> Result<Option<Document>> {
        let macros = Arc::new(document.macros());
        let (coordinator, settled) = Coordinator::channel();
        let coordinator = coordinator.ordered();

        // Registered from the last entry down, so removals while folding
        // never shift an index that is still to be visited.
        for index in (0..document.entries.len()).rev() {
            let unit = coordinator.register();
            let entry = Arc::new(document.entries[index].clone());
            let macros = Arc::clone(&macros);
            let validator = self.clone();

            tokio::spawn(async move {
                let result = validator.validate_entry(entry, macros).await;
                unit.complete((index, result));
            });
        }
        coordinator.run();

        for part in settled.await? {
            let (index, result) = part.ok_or_else(|| {
                ValidationError::Abandoned("entry validation".to_string())
            })?;
            let report = result?;

            if report.is_empty() && !options.keep_entries {
                document.entries.remove(index);
            } else {
                document.entries[index].diagnostics = Some(report);
            }
        }

        if document.entries.is_empty() {
            return Ok(None);
        }
        if !options.keep_entries {
            document.strings = None;
        }
        Ok(Some(document))
    }
}

/// Builder for [`Validator`]
pub struct ValidatorBuilder {
    store: Arc<RuleStore>,
    spelling: Arc<dyn Check>,
    abbreviations: Arc<dyn Check>,
}

impl ValidatorBuilder {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self {
            store,
            spelling: Arc::new(Unchecked::new(SPELLING)),
            abbreviations: Arc::new(Unchecked::new(ABBREVIATION)),
        }
    }

    /// Set the spelling checker
    pub fn spelling(mut self, check: Arc<dyn Check>) -> Self {
        self.spelling = check;
        self
    }

    /// Set the abbreviation checker
    pub fn abbreviations(mut self, check: Arc<dyn Check>) -> Self {
        self.abbreviations = check;
        self
    }

    pub fn build(self) -> Validator {
        let conformance: Arc<dyn Check> = Arc::new(ConformanceCheck::new(Arc::clone(&self.store)));
        Validator {
            inner: Arc::new(Inner {
                store: self.store,
                checks: vec![conformance, self.spelling, self.abbreviations],
            }),
        }
    }
}
