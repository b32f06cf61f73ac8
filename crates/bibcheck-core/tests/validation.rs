//! Integration tests for document validation
//!
//! Covers the full path from a rules directory on disk to an annotated
//! document:
//! - rule loading and wildcard folding
//! - entry-order preservation and clean-entry removal
//! - request argument checking
//! - pluggable checks

use async_trait::async_trait;
use bibcheck_core::checks::SPELLING;
use bibcheck_core::diagnostics::SPECIFICATION_CONFORMANCE;
use bibcheck_core::entry::CONFIG_TAG;
use bibcheck_core::{
    Check, ConformanceCode, Document, Entry, EntryReport, Macros, RuleError, RuleStore,
    ValidateOptions, ValidateRequest, ValidationError, Validator, ValidatorConfig,
};
use proptest::prelude::*;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const STANDARD_RULES: &str = r#"{
    "book": {
        "author": {"required": true, "excludes": "editor"},
        "editor": {"required": true, "excludes": "author"},
        "title": {"required": true},
        "year": {"required": true, "alternative": "note"},
        "note": {},
        "url*": {}
    },
    "proceedings": {
        "title": {"required": true}
    }
}"#;

const WILDCARD_RULES: &str = r#"{
    "proc*": {
        "pages": {"required": true},
        "title": {"required": false}
    }
}"#;

/// Helper to create a rules directory with the standard rule files
fn rules_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_rules(dir.path(), "00-standard.json", STANDARD_RULES);
    write_rules(dir.path(), "10-wildcards.json", WILDCARD_RULES);
    dir
}

fn write_rules(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

async fn validator() -> (TempDir, Validator) {
    let dir = rules_dir();
    let config = ValidatorConfig::builder().rules_dir(dir.path()).build();
    let validator = Validator::from_config(&config).await.unwrap();
    (dir, validator)
}

fn clean_book(key: &str) -> Entry {
    Entry::new(key, "book")
        .with_tag("author", "Knuth, Donald")
        .with_tag("title", "The Art of Computer Programming")
        .with_tag("year", "1968")
}

fn dirty_book(key: &str) -> Entry {
    Entry::new(key, "book").with_tag("year", "2020")
}

#[tokio::test]
async fn test_missing_author_example() {
    let (_dir, validator) = validator().await;
    let entry = Arc::new(
        Entry::new("k", "book")
            .with_tag("year", "2020")
            .with_tag("title", "Concrete Mathematics"),
    );

    let report = validator.validate_entry(entry, Arc::new(Macros::new())).await.unwrap();

    // Neither of the mutually exclusive pair is present, so both are missing.
    assert_eq!(report.conformance_code("author"), Some(ConformanceCode::MissingField));
    assert_eq!(report.conformance_code("editor"), Some(ConformanceCode::MissingField));
    assert_eq!(report.fields.len(), 2);

    let finding = report.finding("author", SPECIFICATION_CONFORMANCE).unwrap();
    assert_eq!(finding["code"], json!(1));
    assert_eq!(finding["alternative"], json!("editor"));
}

#[tokio::test]
async fn test_wildcard_rules_fold_into_exact_types() {
    let (_dir, validator) = validator().await;
    let entry = Arc::new(Entry::new("popl", "proceedings").with_tag("title", "POPL '84"));

    let report = validator.validate_entry(entry, Arc::new(Macros::new())).await.unwrap();

    assert_eq!(report.conformance_code("pages"), Some(ConformanceCode::MissingField));
    // The exact rule for title is kept over the wildcard's.
    assert!(report.finding("title", SPECIFICATION_CONFORMANCE).is_none());

    let base = validator.store().rule_base().unwrap();
    assert!(base.ruleset("proceedings").unwrap().get("title").unwrap().required);
    assert!(base.ruleset("proc*").is_none());
}

#[tokio::test]
async fn test_unknown_entry_type_is_reported_at_entry_level() {
    let (_dir, validator) = validator().await;
    let entry = Arc::new(Entry::new("w", "webpage").with_tag("url", "https://example.org"));

    let report = validator.validate_entry(entry, Arc::new(Macros::new())).await.unwrap();

    assert!(report.fields.is_empty());
    let finding = &report.entry[SPECIFICATION_CONFORMANCE];
    assert_eq!(finding["code"], json!(5));
}

#[tokio::test]
async fn test_wildcard_tag_rule_accepts_numbered_tags() {
    let (_dir, validator) = validator().await;
    let entry = Arc::new(clean_book("k").with_tag("url1", "https://a.example").with_tag("urldate", "2020-01-01"));

    let report = validator.validate_entry(entry, Arc::new(Macros::new())).await.unwrap();
    assert!(report.is_empty());
}

#[tokio::test]
async fn test_drop_clean_preserves_order_of_remaining_entries() {
    let (_dir, validator) = validator().await;
    let document = Document::new(vec![
        dirty_book("first"),
        clean_book("clean1"),
        dirty_book("second"),
        clean_book("clean2"),
        Entry::new("third", "misc"),
    ]);

    let result = validator
        .validate_document(document, ValidateOptions::drop_clean())
        .await
        .unwrap()
        .unwrap();

    let keys: Vec<_> = result.entries.iter().map(|e| e.citation_key.as_str()).collect();
    assert_eq!(keys, vec!["first", "second", "third"]);
    assert!(result.strings.is_none());
}

#[tokio::test]
async fn test_previously_validated_entries_skip_all_checks() {
    let (_dir, validator) = validator().await;
    let mut macros = Macros::new();
    macros.insert("done".to_string(), "ok".to_string());
    let document = Document::new(vec![
        Entry::new("cached", "webpage").with_tag(CONFIG_TAG, "done"),
        dirty_book("fresh"),
    ])
    .with_macros(macros);

    let result = validator
        .validate_document(document, ValidateOptions::drop_clean())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].citation_key, "fresh");
}

#[tokio::test]
async fn test_request_round_trip_through_serde() {
    let (_dir, validator) = validator().await;
    let document = json!({
        "entries": [
            {"citationKey": "a", "entryType": "book", "entryTags": {"title": "T", "year": "1999", "editor": "E"}},
            {"citationKey": "b", "entryType": "book", "entryTags": {"year": "1999"}}
        ],
        "strings": {"acm": "Communications of the ACM"}
    });

    let request = ValidateRequest::from_args(vec![document.clone()]).unwrap();
    let kept = validator.validate_request(request).await.unwrap().unwrap();
    assert_eq!(kept.entries.len(), 2);
    assert!(kept.strings.is_some());

    let request = ValidateRequest::from_args(vec![document, json!(false)]).unwrap();
    let dropped = validator.validate_request(request).await.unwrap().unwrap();
    assert_eq!(dropped.entries.len(), 1);

    let output = serde_json::to_value(&dropped).unwrap();
    assert_eq!(output["entries"][0]["citationKey"], json!("b"));
    assert_eq!(
        output["entries"][0]["diagnostics"]["fields"]["title"][SPECIFICATION_CONFORMANCE]["code"],
        json!(1)
    );
    assert!(output.get("strings").is_none());
}

#[test]
fn test_request_arity_is_checked_before_validation() {
    let err = ValidateRequest::from_args(vec![]).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidArguments(_)));
    assert!(err.is_user_error());

    let err = ValidateRequest::from_args(vec![json!({}), json!(true), json!(true)]).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidArguments(_)));
}

#[tokio::test]
async fn test_unreadable_rules_fail_validation() {
    let dir = tempfile::tempdir().unwrap();
    write_rules(dir.path(), "broken.json", r#"{"book": ["author"]}"#);

    let store = Arc::new(RuleStore::new());
    let loading = store.spawn_load(dir.path());
    let validator = Validator::new(Arc::clone(&store));

    let result = validator
        .validate_document(Document::new(vec![dirty_book("a")]), ValidateOptions::default())
        .await;
    let load = loading.await.unwrap();

    assert!(load.is_err());
    assert!(matches!(result, Err(ValidationError::Rules(_))));
}

#[tokio::test]
async fn test_malformed_wildcard_key_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    write_rules(dir.path(), "bad.json", r#"{"pro*c": {"pages": {}}}"#);

    let config = ValidatorConfig::builder().rules_dir(dir.path()).build();
    let err = Validator::from_config(&config).await.unwrap_err();

    assert!(matches!(err, ValidationError::Rules(RuleError::Configuration(_))));
    assert!(err.to_string().contains("pro*c"));
}

/// Flags every tag value containing "teh"
struct TypoCheck;

#[async_trait]
impl Check for TypoCheck {
    fn category(&self) -> &str {
        SPELLING
    }

    async fn check(&self, entry: &Entry, _macros: &Macros) -> bibcheck_core::Result<EntryReport> {
        let mut report = EntryReport::new();
        for (tag, value) in &entry.entry_tags {
            if value.to_lowercase().contains("teh") {
                report.insert_field(tag.clone(), SPELLING, json!({"suggestion": "the"}));
            }
        }
        Ok(report)
    }
}

#[tokio::test]
async fn test_external_check_findings_are_merged_per_field() {
    let dir = rules_dir();
    let store = Arc::new(RuleStore::new());
    store.load(dir.path()).await.unwrap();
    let validator = Validator::builder(store).spelling(Arc::new(TypoCheck)).build();

    let entry = Entry::new("k", "book")
        .with_tag("author", "Knuth")
        .with_tag("title", "Teh Art")
        .with_tag("color", "teh blue");
    let document = Document::new(vec![entry, clean_book("clean")]);

    let result = validator
        .validate_document(document, ValidateOptions::drop_clean())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(result.entries.len(), 1);
    let report = result.entries[0].diagnostics.as_ref().unwrap();
    assert!(report.finding("title", SPELLING).is_some());
    assert!(report.finding("color", SPELLING).is_some());
    assert_eq!(report.conformance_code("color"), Some(ConformanceCode::UnspecifiedField));
    assert_eq!(report.conformance_code("year"), Some(ConformanceCode::MissingWithAlternativeField));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_result_is_ordered_subsequence(dirty in proptest::collection::vec(any::<bool>(), 0..24)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (kept, expected) = runtime.block_on(async {
            let (_dir, validator) = validator().await;
            let entries: Vec<Entry> = dirty
                .iter()
                .enumerate()
                .map(|(i, &is_dirty)| {
                    let key = format!("entry{}", i);
                    if is_dirty { dirty_book(&key) } else { clean_book(&key) }
                })
                .collect();
            let expected: Vec<String> = entries
                .iter()
                .zip(&dirty)
                .filter(|(_, is_dirty)| **is_dirty)
                .map(|(e, _)| e.citation_key.clone())
                .collect();

            let result = validator
                .validate_document(Document::new(entries), ValidateOptions::drop_clean())
                .await
                .unwrap();
            let kept: Vec<String> = result
                .map(|d| d.entries.into_iter().map(|e| e.citation_key).collect())
                .unwrap_or_default();
            (kept, expected)
        });

        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn prop_keep_entries_never_drops(dirty in proptest::collection::vec(any::<bool>(), 1..16)) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let count = runtime.block_on(async {
            let (_dir, validator) = validator().await;
            let entries: Vec<Entry> = dirty
                .iter()
                .enumerate()
                .map(|(i, &is_dirty)| {
                    let key = format!("entry{}", i);
                    if is_dirty { dirty_book(&key) } else { clean_book(&key) }
                })
                .collect();

            validator
                .validate_document(Document::new(entries), ValidateOptions::default())
                .await
                .unwrap()
                .map_or(0, |d| d.entries.len())
        });

        prop_assert_eq!(count, dirty.len());
    }
}
