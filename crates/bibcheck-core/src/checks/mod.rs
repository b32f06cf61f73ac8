//! Pluggable entry checks
//!
//! Every check that runs against an entry implements [`Check`]. Conformance
//! is provided here; spelling and abbreviation checkers are supplied by the
//! caller and default to [`Unchecked`].

mod conformance;

pub use conformance::ConformanceCheck;

use async_trait::async_trait;

use crate::diagnostics::EntryReport;
use crate::entry::{Entry, Macros};
use crate::error::Result;

/// Category name of the spelling check
pub const SPELLING: &str = "spelling";

/// Category name of the abbreviation check
pub const ABBREVIATION: &str = "abbreviation";

/// A check run against one entry
///
/// A check reports exactly once by resolving its future. An empty report
/// means no issues were found.
#[async_trait]
pub trait Check: Send + Sync {
    /// Category the check reports under
    fn category(&self) -> &str;

    /// Check an entry
    async fn check(&self, entry: &Entry, macros: &Macros) -> Result<EntryReport>;
}

/// Placeholder for a check that is not configured; never reports anything
#[derive(Debug, Clone)]
pub struct Unchecked {
    category: String,
}

impl Unchecked {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }
}

#[async_trait]
impl Check for Unchecked {
    fn category(&self) -> &str {
        &self.category
    }

    async fn check(&self, _entry: &Entry, _macros: &Macros) -> Result<EntryReport> {
        Ok(EntryReport::new())
    }
}
