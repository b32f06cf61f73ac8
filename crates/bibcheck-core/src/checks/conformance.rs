//! Conformance check backed by the rule store

use async_trait::async_trait;
use std::sync::Arc;

use super::Check;
use crate::diagnostics::{EntryReport, SPECIFICATION_CONFORMANCE};
use crate::entry::{Entry, Macros};
use crate::error::Result;
use crate::rules::RuleStore;

/// Evaluates entries against the rules of a [`RuleStore`]
#[derive(Debug, Clone)]
pub struct ConformanceCheck {
    store: Arc<RuleStore>,
}

impl ConformanceCheck {
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }
}

#[async_trait]
impl Check for ConformanceCheck {
    fn category(&self) -> &str {
        SPECIFICATION_CONFORMANCE
    }

    async fn check(&self, entry: &Entry, _macros: &Macros) -> Result<EntryReport> {
        let conformance = self.store.evaluate(entry).await?;
        Ok(conformance.into_report())
    }
}
