//! Conformance rules
//!
//! Rule files map entry-type names to rulesets, and rulesets map tag names
//! to [`TagRule`]s:
//!
//! ```json
//! {
//!   "book": {
//!     "author": { "required": true, "excludes": "editor" },
//!     "year":   { "required": true, "alternative": "date" },
//!     "url*":   {}
//!   },
//!   "proc*": {
//!     "pages": { "required": true }
//!   }
//! }
//! ```
//!
//! A key ending in the wildcard marker `*` is a prefix rule. At entry-type
//! level it is folded into every exact ruleset whose name starts with the
//! prefix; at tag level it matches every tag starting with the prefix.

pub mod evaluator;
pub mod store;

pub use store::{load_dir, RuleStore};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::RuleError;
use crate::merge::MergeInto;

/// Marker terminating a prefix (wildcard) key
pub const WILDCARD: char = '*';

/// Resolved rule for one tag
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagRule {
    /// The tag must be present
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    /// Tag that cannot appear together with this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excludes: Option<String>,
    /// Tag that can satisfy the requirement instead of this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

impl TagRule {
    pub fn required() -> Self {
        Self {
            required: true,
            ..Self::default()
        }
    }

    pub fn optional() -> Self {
        Self::default()
    }

    pub fn excluding(mut self, tag: impl Into<String>) -> Self {
        self.excludes = Some(tag.into());
        self
    }

    pub fn or_alternative(mut self, tag: impl Into<String>) -> Self {
        self.alternative = Some(tag.into());
        self
    }
}

/// A tag rule as written in a rule file, with every attribute optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excludes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative: Option<String>,
}

impl TagRulePatch {
    /// Take the attributes this patch leaves unspecified from `other`
    pub fn fill_from(&mut self, other: &TagRulePatch) {
        if self.required.is_none() {
            self.required = other.required;
        }
        if self.excludes.is_none() {
            self.excludes = other.excludes.clone();
        }
        if self.alternative.is_none() {
            self.alternative = other.alternative.clone();
        }
    }

    /// Resolve into a rule, unspecified attributes taking their defaults
    pub fn resolve(&self) -> TagRule {
        TagRule {
            required: self.required.unwrap_or(false),
            excludes: self.excludes.clone(),
            alternative: self.alternative.clone(),
        }
    }
}

/// Per-field merge: attributes specified by the source win.
impl MergeInto for TagRulePatch {
    fn merge_into(self, dest: &mut Self) {
        if self.required.is_some() {
            dest.required = self.required;
        }
        if self.excludes.is_some() {
            dest.excludes = self.excludes;
        }
        if self.alternative.is_some() {
            dest.alternative = self.alternative;
        }
    }
}

/// Tag name to tag rule patch, in declaration order
pub type RulesetPatch = IndexMap<String, TagRulePatch>;

/// Contents of one rule file: entry-type name (or prefix) to ruleset
pub type RuleFile = IndexMap<String, RulesetPatch>;

impl MergeInto for RulesetPatch {
    fn merge_into(self, dest: &mut Self) {
        for (tag, patch) in self {
            patch.merge_into(dest.entry(tag).or_default());
        }
    }
}

/// Split a key into its wildcard prefix, if it is a wildcard key
///
/// Only a single trailing marker is allowed.
pub fn wildcard_prefix(key: &str) -> Result<Option<&str>, RuleError> {
    if !key.contains(WILDCARD) {
        return Ok(None);
    }

    match key.strip_suffix(WILDCARD) {
        Some(prefix) if !prefix.contains(WILDCARD) => Ok(Some(prefix)),
        _ => Err(RuleError::configuration(format!(
            "Invalid syntax for the partial rule, only rules ending with a single star are allowed. Violating rule is [{}]",
            key
        ))),
    }
}

/// Resolved rules for one entry type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ruleset {
    rules: IndexMap<String, TagRule>,
    /// (prefix, key) of tag-level wildcard rules, in declaration order
    wildcards: Vec<(String, String)>,
}

impl Ruleset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule (builder pattern)
    pub fn with_rule(mut self, tag: impl Into<String>, rule: TagRule) -> Self {
        self.insert(tag.into(), rule);
        self
    }

    fn insert(&mut self, key: String, rule: TagRule) {
        // Keys are validated before resolution; a malformed key is kept as an exact key.
        if let Ok(Some(prefix)) = wildcard_prefix(&key) {
            self.wildcards.push((prefix.to_string(), key.clone()));
        }
        self.rules.insert(key, rule);
    }

    fn from_patch(patch: RulesetPatch) -> Self {
        let mut ruleset = Self::new();
        for (key, rule) in patch {
            let rule = rule.resolve();
            ruleset.insert(key, rule);
        }
        ruleset
    }

    /// Rule declared under exactly this key
    pub fn get(&self, key: &str) -> Option<&TagRule> {
        self.rules.get(key)
    }

    /// Find the rule governing a tag, with the key it is declared under
    ///
    /// An exact key wins; otherwise the first declared wildcard whose prefix
    /// matches the tag.
    pub fn lookup<'a>(&'a self, tag: &'a str) -> Option<(&'a str, &'a TagRule)> {
        if let Some((key, rule)) = self.rules.get_key_value(tag) {
            return Some((key.as_str(), rule));
        }

        self.wildcards
            .iter()
            .find(|(prefix, _)| tag.starts_with(prefix.as_str()))
            .and_then(|(_, key)| self.rules.get_key_value(key))
            .map(|(key, rule)| (key.as_str(), rule))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagRule)> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn rules(&self) -> &IndexMap<String, TagRule> {
        &self.rules
    }
}

impl Serialize for Ruleset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rules.serialize(serializer)
    }
}

/// Merged, read-only rules for every known entry type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleBase {
    rulesets: IndexMap<String, Ruleset>,
}

impl RuleBase {
    pub fn builder() -> RuleBaseBuilder {
        RuleBaseBuilder::new()
    }

    /// Build a rule base from in-memory JSON sources, merged in order
    pub fn from_sources<'a, I>(sources: I) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut builder = Self::builder();
        for (name, content) in sources {
            builder.add_source(name, content)?;
        }
        Ok(builder.build())
    }

    /// Ruleset of an exact entry type
    pub fn ruleset(&self, entry_type: &str) -> Option<&Ruleset> {
        self.rulesets.get(entry_type)
    }

    pub fn entry_types(&self) -> impl Iterator<Item = &str> {
        self.rulesets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rulesets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rulesets.is_empty()
    }
}

impl Serialize for RuleBase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rulesets.serialize(serializer)
    }
}

/// Accumulates rule files and folds wildcard rules on [`build`](Self::build)
#[derive(Debug, Default)]
pub struct RuleBaseBuilder {
    exact: IndexMap<String, RulesetPatch>,
    wildcards: IndexMap<String, RulesetPatch>,
    sources: usize,
}

impl RuleBaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and add one JSON rule source
    pub fn add_source(&mut self, name: &str, content: &str) -> Result<&mut Self, RuleError> {
        let file: RuleFile = serde_json::from_str(content)
            .map_err(|e| RuleError::invalid_rule(name, e.to_string()))?;
        self.add_rules(name, file)
    }

    /// Add the contents of one rule file
    ///
    /// Later sources win per attribute where they specify the same tag of
    /// the same key.
    pub fn add_rules(&mut self, name: &str, file: RuleFile) -> Result<&mut Self, RuleError> {
        for (key, ruleset) in file {
            for tag in ruleset.keys() {
                wildcard_prefix(tag)?;
            }

            let table = if wildcard_prefix(&key)?.is_some() {
                &mut self.wildcards
            } else {
                &mut self.exact
            };
            ruleset.merge_into(table.entry(key).or_default());
        }

        self.sources += 1;
        tracing::debug!(source = name, "Merged rule source");
        Ok(self)
    }

    /// Number of sources added so far
    pub fn source_count(&self) -> usize {
        self.sources
    }

    /// Fold wildcard rules into matching exact rulesets and resolve
    ///
    /// Exact rules keep their own attributes; a wildcard only contributes
    /// tags, or attributes of tags, the exact ruleset leaves unspecified.
    /// Between wildcards matching the same entry type, the first declared
    /// wins.
    pub fn build(self) -> RuleBase {
        let Self {
            mut exact,
            wildcards,
            ..
        } = self;

        for (key, wildcard) in &wildcards {
            let prefix = key.trim_end_matches(WILDCARD);
            for (entry_type, ruleset) in exact.iter_mut() {
                if !entry_type.starts_with(prefix) {
                    continue;
                }
                tracing::debug!(wildcard = %key, entry_type = %entry_type, "Folding wildcard rules");
                for (tag, patch) in wildcard {
                    ruleset.entry(tag.clone()).or_default().fill_from(patch);
                }
            }
        }

        RuleBase {
            rulesets: exact
                .into_iter()
                .map(|(entry_type, patch)| (entry_type, Ruleset::from_patch(patch)))
                .collect(),
        }
    }
}
