//! Output formatting for the bibcheck CLI
//!
//! Renders validated documents and rule bases as JSON, YAML, or a colored
//! human-readable listing.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};

use bibcheck_core::diagnostics::SPECIFICATION_CONFORMANCE;
use bibcheck_core::{ConformanceCode, Document, Entry, EntryReport, FieldReport, RuleBase};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable listing with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
    /// YAML format
    Yaml,
}

/// Write a value as YAML, or as JSON for any other format
fn write_serialized<T, W>(value: &T, format: OutputFormat, out: &mut W) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
    W: Write,
{
    match format {
        OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(value)?)?,
        _ => writeln!(out, "{}", serde_json::to_string_pretty(value)?)?,
    }
    Ok(())
}

/// A validated document, or the "no entries" result
pub struct DocumentOutput<'a> {
    document: Option<&'a Document>,
}

impl<'a> DocumentOutput<'a> {
    pub fn new(document: Option<&'a Document>) -> Self {
        Self { document }
    }

    fn entries(&self) -> &'a [Entry] {
        match self.document {
            Some(document) => &document.entries,
            None => &[],
        }
    }

    /// Total number of findings across all entries
    pub fn finding_count(&self) -> usize {
        self.entries()
            .iter()
            .filter_map(|e| e.diagnostics.as_ref())
            .map(EntryReport::finding_count)
            .sum()
    }

    /// Render to standard output
    pub fn render(&self, format: OutputFormat) -> anyhow::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write(format, &mut out)
    }

    pub fn write<W: Write>(&self, format: OutputFormat, out: &mut W) -> anyhow::Result<()> {
        match format {
            OutputFormat::Table => self.write_table(out),
            _ => write_serialized(&self.document, format, out),
        }
    }

    fn write_table<W: Write>(&self, out: &mut W) -> anyhow::Result<()> {
        writeln!(out)?;
        writeln!(out, "{}", "Validation Results".cyan().bold())?;
        writeln!(out, "{}", "=".repeat(60))?;
        writeln!(out)?;

        let entries = self.entries();
        if entries.is_empty() {
            writeln!(out, "{} No entries with findings", "+".green())?;
            writeln!(out)?;
            return Ok(());
        }

        for entry in entries {
            let report = entry.diagnostics.as_ref().filter(|r| !r.is_empty());
            let Some(report) = report else {
                writeln!(out, "{} {} ({})", "+".green(), entry.citation_key.bold(), entry.entry_type)?;
                continue;
            };

            writeln!(out, "{} {} ({})", "x".red(), entry.citation_key.bold(), entry.entry_type)?;
            write_findings(out, "<entry>", &report.entry)?;
            for (tag, findings) in &report.fields {
                write_findings(out, tag, findings)?;
            }
        }

        let flagged = entries
            .iter()
            .filter(|e| e.diagnostics.as_ref().is_some_and(|r| !r.is_empty()))
            .count();
        writeln!(out)?;
        writeln!(out, "{}", "-".repeat(60))?;
        writeln!(
            out,
            "{} entries, {} with findings, {} findings",
            entries.len(),
            flagged,
            self.finding_count()
        )?;
        Ok(())
    }
}

fn write_findings<W: Write>(out: &mut W, subject: &str, findings: &FieldReport) -> io::Result<()> {
    for (category, finding) in findings {
        let label = if category == SPECIFICATION_CONFORMANCE {
            code_label(finding).red()
        } else {
            category.as_str().yellow()
        };
        writeln!(out, "    {:<16} {:<34} {}", subject, label, describe(finding))?;
    }
    Ok(())
}

fn code_label(finding: &Value) -> &'static str {
    finding
        .get("code")
        .and_then(Value::as_u64)
        .and_then(|c| u8::try_from(c).ok())
        .and_then(|c| ConformanceCode::try_from(c).ok())
        .map_or("CONFORMANCE", ConformanceCode::name)
}

fn describe(finding: &Value) -> String {
    match finding.get("description").and_then(Value::as_str) {
        Some(description) => description.to_string(),
        None => finding.to_string(),
    }
}

/// A merged rule base
pub struct RulesOutput<'a> {
    base: &'a RuleBase,
}

impl<'a> RulesOutput<'a> {
    pub fn new(base: &'a RuleBase) -> Self {
        Self { base }
    }

    pub fn render(&self, format: OutputFormat) -> anyhow::Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.write(format, &mut out)
    }

    pub fn write<W: Write>(&self, format: OutputFormat, out: &mut W) -> anyhow::Result<()> {
        if format != OutputFormat::Table {
            return write_serialized(self.base, format, out);
        }

        writeln!(out)?;
        writeln!(out, "{}", "Conformance Rules".cyan().bold())?;
        writeln!(out, "{}", "=".repeat(60))?;

        for entry_type in self.base.entry_types() {
            let Some(ruleset) = self.base.ruleset(entry_type) else {
                continue;
            };
            writeln!(out)?;
            writeln!(out, "{}", entry_type.bold())?;
            for (tag, rule) in ruleset.iter() {
                let mut notes = Vec::new();
                if rule.required {
                    notes.push("required".red().to_string());
                }
                if let Some(excluded) = &rule.excludes {
                    notes.push(format!("excludes {}", excluded));
                }
                if let Some(alternative) = &rule.alternative {
                    notes.push(format!("alternative {}", alternative));
                }
                writeln!(out, "    {:<20} {}", tag, notes.join(", "))?;
            }
        }

        writeln!(out)?;
        writeln!(out, "{} entry types", self.base.len())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bibcheck_core::Diagnostic;

    fn document() -> Document {
        let report = EntryReport::new()
            .with_field("author", SPECIFICATION_CONFORMANCE, Diagnostic::missing_field(None).to_value())
            .with_field("title", "spelling", serde_json::json!({"description": "Did you mean [The]?"}));
        let mut flagged = Entry::new("knuth1984", "article").with_tag("title", "Teh Art");
        flagged.diagnostics = Some(report);

        let mut clean = Entry::new("lamport1994", "book");
        clean.diagnostics = Some(EntryReport::new());

        Document::new(vec![flagged, clean])
    }

    fn rendered(output: &DocumentOutput<'_>, format: OutputFormat) -> String {
        let mut buffer = Vec::new();
        output.write(format, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_finding_count() {
        let document = document();
        assert_eq!(DocumentOutput::new(Some(&document)).finding_count(), 2);
        assert_eq!(DocumentOutput::new(None).finding_count(), 0);
    }

    #[test]
    fn test_table_lists_findings() {
        let document = document();
        let text = rendered(&DocumentOutput::new(Some(&document)), OutputFormat::Table);

        assert!(text.contains("knuth1984"));
        assert!(text.contains("MISSING_FIELD"));
        assert!(text.contains("Did you mean [The]?"));
        assert!(text.contains("lamport1994"));
        assert!(text.contains("2 entries, 1 with findings, 2 findings"));
    }

    #[test]
    fn test_json_keeps_parser_shape() {
        let document = document();
        let text = rendered(&DocumentOutput::new(Some(&document)), OutputFormat::Json);
        let value: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["entries"][0]["citationKey"], "knuth1984");
        assert_eq!(
            value["entries"][0]["diagnostics"]["fields"]["author"][SPECIFICATION_CONFORMANCE]["code"],
            1
        );
    }

    #[test]
    fn test_no_entries_renders_null() {
        let text = rendered(&DocumentOutput::new(None), OutputFormat::Json);
        assert_eq!(text.trim(), "null");

        let text = rendered(&DocumentOutput::new(None), OutputFormat::Table);
        assert!(text.contains("No entries with findings"));
    }

    #[test]
    fn test_rules_table_and_yaml() {
        let base = RuleBase::from_sources([(
            "r.json",
            r#"{"book": {"author": {"required": true, "excludes": "editor"}, "year": {"alternative": "date"}}}"#,
        )])
        .unwrap();
        let output = RulesOutput::new(&base);

        let mut buffer = Vec::new();
        output.write(OutputFormat::Table, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("excludes editor"));
        assert!(text.contains("alternative date"));
        assert!(text.contains("1 entry types"));

        let mut buffer = Vec::new();
        output.write(OutputFormat::Yaml, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("book:"));
        assert!(text.contains("excludes: editor"));
    }
}
