//! Diagnostic records produced by validation
//!
//! Conformance findings are typed ([`Diagnostic`], [`Conformance`]). The
//! merged per-entry record ([`EntryReport`]) is keyed by tag and then by check
//! category, with free-form JSON payloads so that external checks can report
//! in their own shape.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};
use std::fmt;

/// Category under which conformance findings are reported
pub const SPECIFICATION_CONFORMANCE: &str = "specificationConformance";

/// Conformance codes. The numeric values are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConformanceCode {
    Ok = 0,
    MissingField = 1,
    UnspecifiedField = 2,
    ExclusiveField = 3,
    MissingWithAlternativeField = 4,
    UnknownEntryType = 5,
}

impl ConformanceCode {
    /// All codes, in numeric order
    pub const ALL: [ConformanceCode; 6] = [
        ConformanceCode::Ok,
        ConformanceCode::MissingField,
        ConformanceCode::UnspecifiedField,
        ConformanceCode::ExclusiveField,
        ConformanceCode::MissingWithAlternativeField,
        ConformanceCode::UnknownEntryType,
    ];

    /// Stable numeric value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Stable symbolic name
    pub fn name(self) -> &'static str {
        match self {
            ConformanceCode::Ok => "OK",
            ConformanceCode::MissingField => "MISSING_FIELD",
            ConformanceCode::UnspecifiedField => "UNSPECIFIED_FIELD",
            ConformanceCode::ExclusiveField => "EXCLUSIVE_FIELD",
            ConformanceCode::MissingWithAlternativeField => "MISSING_WITH_ALTERNATIVE_FIELD",
            ConformanceCode::UnknownEntryType => "UNKNOWN_ENTRY_TYPE",
        }
    }
}

impl TryFrom<u8> for ConformanceCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|code| code.as_u8() == value)
            .ok_or_else(|| format!("Unknown conformance code: {}", value))
    }
}

impl fmt::Display for ConformanceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ConformanceCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for ConformanceCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u8::deserialize(deserializer)?;
        ConformanceCode::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// A single conformance violation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Human-readable description
    pub description: String,
    /// Conformance code
    pub code: ConformanceCode,
    /// Related field (the excluding tag, or the alternative option)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Hint for a missing field that has a mutually exclusive counterpart
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

impl Diagnostic {
    pub fn unspecified_field() -> Self {
        Self::new(ConformanceCode::UnspecifiedField, "Unspecified field")
    }

    pub fn exclusive_field(tag: &str, excluded: &str) -> Self {
        Self::new(
            ConformanceCode::ExclusiveField,
            format!("[{}] and [{}] cannot be in the same entry", tag, excluded),
        )
        .with_field(excluded)
    }

    pub fn missing_field(exclusive_counterpart: Option<&str>) -> Self {
        let mut diagnostic = Self::new(ConformanceCode::MissingField, "Field is missing");
        diagnostic.alternative = exclusive_counterpart.map(str::to_string);
        diagnostic
    }

    pub fn missing_with_alternative(alternative: &str) -> Self {
        Self::new(
            ConformanceCode::MissingWithAlternativeField,
            format!("Field is missing with alternative option [{}]", alternative),
        )
        .with_field(alternative)
    }

    pub fn unknown_entry_type() -> Self {
        Self::new(ConformanceCode::UnknownEntryType, "Unknown entry type")
    }

    fn new(code: ConformanceCode, description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            code,
            field: None,
            alternative: None,
        }
    }

    fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// JSON payload used in [`EntryReport`]
    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "description": self.description,
            "code": self.code.as_u8(),
        });
        if let Some(field) = &self.field {
            value["field"] = json!(field);
        }
        if let Some(alternative) = &self.alternative {
            value["alternative"] = json!(alternative);
        }
        value
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description, self.code)
    }
}

/// Conformance of one entry against its ruleset
///
/// Only non-OK diagnoses are recorded; an empty value means the entry is
/// fully conformant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conformance {
    /// Entry-level diagnostic (unknown entry type)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<Diagnostic>,
    /// Tag name (or wildcard rule key) to diagnostic
    #[serde(default)]
    pub fields: IndexMap<String, Diagnostic>,
}

impl Conformance {
    pub fn unknown_entry_type() -> Self {
        Self {
            entry: Some(Diagnostic::unknown_entry_type()),
            fields: IndexMap::new(),
        }
    }

    pub fn is_conformant(&self) -> bool {
        self.entry.is_none() && self.fields.is_empty()
    }

    /// Look up the diagnostic of a tag
    pub fn get(&self, tag: &str) -> Option<&Diagnostic> {
        self.fields.get(tag)
    }

    /// Code of a tag's diagnostic, `Ok` when the tag has none
    pub fn code(&self, tag: &str) -> ConformanceCode {
        self.get(tag).map_or(ConformanceCode::Ok, |d| d.code)
    }

    /// Convert into a report under [`SPECIFICATION_CONFORMANCE`]
    pub fn into_report(self) -> EntryReport {
        let mut report = EntryReport::default();
        if let Some(diagnostic) = self.entry {
            report.insert_entry(SPECIFICATION_CONFORMANCE, diagnostic.to_value());
        }
        for (tag, diagnostic) in self.fields {
            report.insert_field(tag, SPECIFICATION_CONFORMANCE, diagnostic.to_value());
        }
        report
    }
}

/// Findings for one tag (or the entry itself), keyed by check category
pub type FieldReport = IndexMap<String, Value>;

/// Merged diagnostics of all checks for one entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryReport {
    /// Findings about the entry as a whole
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub entry: FieldReport,
    /// Findings per tag
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub fields: IndexMap<String, FieldReport>,
}

impl EntryReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry-level finding
    pub fn insert_entry(&mut self, category: impl Into<String>, finding: Value) {
        self.entry.insert(category.into(), finding);
    }

    /// Record a finding for a tag
    pub fn insert_field(
        &mut self,
        tag: impl Into<String>,
        category: impl Into<String>,
        finding: Value,
    ) {
        self.fields
            .entry(tag.into())
            .or_default()
            .insert(category.into(), finding);
    }

    /// Record a finding for a tag (builder pattern)
    pub fn with_field(
        mut self,
        tag: impl Into<String>,
        category: impl Into<String>,
        finding: Value,
    ) -> Self {
        self.insert_field(tag, category, finding);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty() && self.fields.is_empty()
    }

    /// Number of findings across all tags and categories
    pub fn finding_count(&self) -> usize {
        self.entry.len() + self.fields.values().map(IndexMap::len).sum::<usize>()
    }

    /// Look up a finding for a tag
    pub fn finding(&self, tag: &str, category: &str) -> Option<&Value> {
        self.fields.get(tag)?.get(category)
    }

    /// Conformance code recorded for a tag, if any
    pub fn conformance_code(&self, tag: &str) -> Option<ConformanceCode> {
        let code = self.finding(tag, SPECIFICATION_CONFORMANCE)?.get("code")?.as_u64()?;
        u8::try_from(code).ok().and_then(|c| ConformanceCode::try_from(c).ok())
    }
}
