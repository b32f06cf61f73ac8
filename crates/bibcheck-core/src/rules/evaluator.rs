//! Conformance evaluation of a single entry
//!
//! Rules are matched against the shared, read-only ruleset. Requirement
//! bookkeeping happens on a private copy of it: rules are removed as tags
//! satisfy them, and whatever required rules remain at the end are reported
//! missing.

use indexmap::IndexMap;

use super::{RuleBase, Ruleset, TagRule};
use crate::diagnostics::{Conformance, Diagnostic};
use crate::entry::{Entry, CONFIG_TAG};

/// Evaluate an entry against a rule base
pub fn evaluate(base: &RuleBase, entry: &Entry) -> Conformance {
    base.evaluate(entry)
}

impl RuleBase {
    /// Evaluate an entry against the ruleset of its type
    pub fn evaluate(&self, entry: &Entry) -> Conformance {
        match self.ruleset(&entry.entry_type) {
            Some(ruleset) => ruleset.evaluate(entry),
            None => Conformance::unknown_entry_type(),
        }
    }
}

impl Ruleset {
    /// Evaluate an entry's tags against this ruleset
    pub fn evaluate(&self, entry: &Entry) -> Conformance {
        let mut working = self.rules().clone();
        let mut conformance = Conformance::default();

        for tag in entry.entry_tags.keys() {
            if tag == CONFIG_TAG {
                continue;
            }

            let diagnostic = match self.lookup(tag) {
                Some((key, rule)) => diagnose(entry, &mut working, tag, key, rule),
                None => Some(Diagnostic::unspecified_field()),
            };

            if let Some(diagnostic) = diagnostic {
                conformance.fields.insert(tag.clone(), diagnostic);
            }
        }

        for (key, rule) in working.iter().filter(|(_, rule)| rule.required) {
            let diagnostic = match &rule.alternative {
                Some(alternative) => Diagnostic::missing_with_alternative(alternative),
                None => Diagnostic::missing_field(rule.excludes.as_deref()),
            };
            conformance.fields.insert(key.clone(), diagnostic);
        }

        conformance
    }
}

/// Diagnose one present tag governed by `rule` (declared under `key`)
fn diagnose(
    entry: &Entry,
    working: &mut IndexMap<String, TagRule>,
    tag: &str,
    key: &str,
    rule: &TagRule,
) -> Option<Diagnostic> {
    let mut diagnostic = None;

    if let Some(excluded) = &rule.excludes {
        if entry.has_tag(excluded) {
            diagnostic = Some(Diagnostic::exclusive_field(tag, excluded));
        } else {
            // This tag stands in for the excluded one.
            working.shift_remove(excluded);
        }
    } else if let Some(alternative) = &rule.alternative {
        if let Some(alternative_rule) = working.get_mut(alternative) {
            alternative_rule.required = false;
        }
    }

    working.shift_remove(key);
    diagnostic
}
