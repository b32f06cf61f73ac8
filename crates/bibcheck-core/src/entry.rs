//! Parsed bibliographic entries and documents
//!
//! The shapes here match the JSON emitted by the upstream BibTeX parser
//! (`citationKey`, `entryType`, `entryTags`, `strings`), so a parsed
//! document can be deserialized directly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::diagnostics::EntryReport;

/// Reserved tag carrying per-entry validation configuration
pub const CONFIG_TAG: &str = "optanalyze";

/// Named string macros (`@string{...}`) of a document
pub type Macros = IndexMap<String, String>;

/// A single bibliographic record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Citation key, e.g. `knuth1984`
    #[serde(default)]
    pub citation_key: String,
    /// Entry type name, e.g. `article`
    pub entry_type: String,
    /// Tag name to value, in source order
    #[serde(default)]
    pub entry_tags: IndexMap<String, String>,
    /// Merged diagnostics, attached once the entry has been validated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<EntryReport>,
}

impl Entry {
    /// Create an entry with no tags
    pub fn new(citation_key: impl Into<String>, entry_type: impl Into<String>) -> Self {
        Self {
            citation_key: citation_key.into(),
            entry_type: entry_type.into(),
            entry_tags: IndexMap::new(),
            diagnostics: None,
        }
    }

    /// Add a tag (builder pattern)
    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.entry_tags.insert(name.into(), value.into());
        self
    }

    /// Check whether a tag is present
    pub fn has_tag(&self, name: &str) -> bool {
        self.entry_tags.contains_key(name)
    }

    /// Get a tag value
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.entry_tags.get(name).map(String::as_str)
    }
}

/// An ordered sequence of entries plus the document's string macros
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub entries: Vec<Entry>,
    /// Macro table; stripped from results unless entries are kept
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strings: Option<Macros>,
}

impl Document {
    /// Create a document from entries, with an empty macro table
    pub fn new(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            strings: Some(Macros::new()),
        }
    }

    /// Set the macro table (builder pattern)
    pub fn with_macros(mut self, macros: Macros) -> Self {
        self.strings = Some(macros);
        self
    }

    /// The macro table, or an empty one
    pub fn macros(&self) -> Macros {
        self.strings.clone().unwrap_or_default()
    }
}

/// Validation settings attached to a single entry through [`CONFIG_TAG`]
///
/// The tag value is a list of `key` or `key=value` items separated by commas
/// or semicolons. A value naming a macro is expanded first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryConfig {
    /// The entry was validated before and should be skipped
    pub ok: bool,
    /// Items without a dedicated field
    pub extra: IndexMap<String, String>,
}

impl EntryConfig {
    /// Derive the configuration of an entry, expanding macros in the tag value
    pub fn from_entry(entry: &Entry, macros: &Macros) -> Self {
        match entry.tag(CONFIG_TAG) {
            Some(raw) => {
                let raw = raw.trim();
                let text = macros.get(raw).map(String::as_str).unwrap_or(raw);
                Self::parse(text)
            }
            None => Self::default(),
        }
    }

    /// Parse a configuration string
    pub fn parse(text: &str) -> Self {
        let mut config = Self::default();

        for item in text.split([',', ';']) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            let (key, value) = match item.split_once('=') {
                Some((k, v)) => (k.trim().to_lowercase(), v.trim().to_string()),
                None => (item.to_lowercase(), "true".to_string()),
            };

            match key.as_str() {
                "ok" => config.ok = matches!(value.to_lowercase().as_str(), "true" | "yes" | "1"),
                _ => {
                    config.extra.insert(key, value);
                }
            }
        }

        config
    }
}
