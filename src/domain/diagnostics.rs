//! Style diagnostics and the per-file engine that collects them
//!
//! Architecture: the engine is append-only. Checkers record, the engine owns
//! de-duplication and the final ordering, renderers only read the sorted list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;

/// Rule family a diagnostic belongs to.
///
/// Variant order is the reporting priority for diagnostics sharing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Naming,
    Comments,
    Braces,
    Whitespace,
    Indentation,
    LineLength,
    Overall,
    Warning,
    /// Only produced by the annotated-file renderer
    Note,
}

impl Category {
    /// Upper-case label used in rendered output
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Naming => "NAMING",
            Self::Comments => "COMMENTS",
            Self::Braces => "BRACES",
            Self::Whitespace => "WHITESPACE",
            Self::Indentation => "INDENTATION",
            Self::LineLength => "LINE_LENGTH",
            Self::Overall => "OVERALL",
            Self::Warning => "WARNING",
            Self::Note => "NOTE",
        }
    }

    /// Categories a checker can emit, in priority order
    pub fn checked() -> &'static [Category] {
        &[
            Self::Naming,
            Self::Comments,
            Self::Braces,
            Self::Whitespace,
            Self::Indentation,
            Self::LineLength,
            Self::Overall,
            Self::Warning,
        ]
    }

    /// Parse a label as printed by `as_str`, case-insensitively
    pub fn from_label(label: &str) -> Option<Self> {
        let upper = label.to_ascii_uppercase();
        Self::checked()
            .iter()
            .chain(std::iter::once(&Self::Note))
            .copied()
            .find(|c| c.as_str() == upper)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single style finding
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: Category,
    /// 1-based line the finding is reported at
    pub line: u32,
    /// 1-based column of the offending token, for positional whitespace findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(category: Category, line: u32, message: impl Into<String>) -> Self {
        Self {
            category,
            line,
            column: None,
            message: message.into(),
        }
    }

    /// Attach the column of the offending token
    pub fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    /// `Line <n>: [<CATEGORY>] <message>`
    pub fn render(&self) -> String {
        format!("Line {}: [{}] {}", self.line, self.category, self.message)
    }

    /// `[<CATEGORY>] <message>`, the form written into annotated files
    pub fn render_inline(&self) -> String {
        format!("[{}] {}", self.category, self.message)
    }
}

impl Ord for Diagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then_with(|| self.category.cmp(&other.category))
            // positional findings lead, then by column
            .then_with(|| self.column.is_none().cmp(&other.column.is_none()))
            .then_with(|| self.column.cmp(&other.column))
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl PartialOrd for Diagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Collects diagnostics for one file.
///
/// Two findings with the same line and message are recorded once.
#[derive(Debug, Default)]
pub struct DiagnosticEngine {
    diagnostics: Vec<Diagnostic>,
    seen: HashSet<(u32, String)>,
}

impl DiagnosticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finding without a column
    pub fn record(&mut self, category: Category, line: u32, message: impl Into<String>) {
        self.push(Diagnostic::new(category, line, message));
    }

    /// Record a finding tied to a column
    pub fn record_at(
        &mut self,
        category: Category,
        line: u32,
        column: u32,
        message: impl Into<String>,
    ) {
        self.push(Diagnostic::new(category, line, message).with_column(column));
    }

    /// Record an already built diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self
            .seen
            .insert((diagnostic.line, diagnostic.message.clone()))
        {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Keep only the findings matching `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&Diagnostic) -> bool) {
        self.diagnostics.retain(|d| keep(d));
        self.seen = self
            .diagnostics
            .iter()
            .map(|d| (d.line, d.message.clone()))
            .collect();
    }

    /// Consume the engine, returning findings in report order
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.diagnostics.sort();
        self.diagnostics
    }

    /// Rendered lines in report order
    pub fn render(&self) -> Vec<String> {
        let mut sorted = self.diagnostics.clone();
        sorted.sort();
        sorted.iter().map(Diagnostic::render).collect()
    }
}

/// Outcome of checking one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Findings in report order
    pub diagnostics: Vec<Diagnostic>,
    /// Set when the file could not be read as text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl FileReport {
    pub fn new(path: impl Into<PathBuf>, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            path: path.into(),
            diagnostics,
            failure: None,
        }
    }

    /// A file that produced no findings because it could not be processed
    pub fn failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            diagnostics: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failure.is_none() && self.diagnostics.is_empty()
    }

    pub fn count(&self, category: Category) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.category == category)
            .count()
    }

    /// Rendered lines in report order
    pub fn render(&self) -> Vec<String> {
        self.diagnostics.iter().map(Diagnostic::render).collect()
    }
}

/// Run-wide statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_files: usize,
    pub failed_files: usize,
    pub total_diagnostics: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub execution_time_ms: u64,
    pub checked_at: DateTime<Utc>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            total_files: 0,
            failed_files: 0,
            total_diagnostics: 0,
            by_category: BTreeMap::new(),
            execution_time_ms: 0,
            checked_at: Utc::now(),
        }
    }
}

/// Every file of a run, in input order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckReport {
    pub files: Vec<FileReport>,
    pub summary: RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_fingerprint: Option<String>,
}

impl CheckReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: FileReport) {
        self.summary.total_files += 1;
        if file.failure.is_some() {
            self.summary.failed_files += 1;
        }
        for diagnostic in &file.diagnostics {
            self.summary.total_diagnostics += 1;
            *self
                .summary
                .by_category
                .entry(diagnostic.category)
                .or_insert(0) += 1;
        }
        self.files.push(file);
    }

    pub fn has_diagnostics(&self) -> bool {
        self.summary.total_diagnostics > 0
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed_files > 0
    }

    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }

    /// Recompute the summary after files were edited in place
    pub fn recount(&mut self) {
        let files = std::mem::take(&mut self.files);
        let timing = self.summary.execution_time_ms;
        let checked_at = self.summary.checked_at;
        self.summary = RunSummary {
            execution_time_ms: timing,
            checked_at,
            ..RunSummary::default()
        };
        for file in files {
            self.add_file(file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_priority() {
        assert!(Category::Naming < Category::Comments);
        assert!(Category::Whitespace < Category::Indentation);
        assert!(Category::LineLength < Category::Overall);
        assert!(Category::Warning < Category::Note);
        assert_eq!(Category::LineLength.as_str(), "LINE_LENGTH");
        assert_eq!(Category::from_label("line_length"), Some(Category::LineLength));
        assert_eq!(Category::from_label("bogus"), None);
    }

    #[test]
    fn test_render() {
        let d = Diagnostic::new(Category::Braces, 4, "Braces are required, even for single line blocks.");
        assert_eq!(
            d.render(),
            "Line 4: [BRACES] Braces are required, even for single line blocks."
        );
        assert_eq!(
            d.render_inline(),
            "[BRACES] Braces are required, even for single line blocks."
        );
    }

    #[test]
    fn test_ordering_line_then_category() {
        let mut engine = DiagnosticEngine::new();
        engine.record(Category::Warning, 3, "w");
        engine.record(Category::Naming, 3, "n");
        engine.record(Category::Overall, 1, "o");
        let sorted = engine.into_sorted();
        let keys: Vec<_> = sorted.iter().map(|d| (d.line, d.category)).collect();
        assert_eq!(
            keys,
            vec![
                (1, Category::Overall),
                (3, Category::Naming),
                (3, Category::Warning)
            ]
        );
    }

    #[test]
    fn test_ordering_by_column_within_whitespace() {
        let mut engine = DiagnosticEngine::new();
        engine.record_at(Category::Whitespace, 8, 16, "'y' at position 16, expected 1 space, found 3");
        engine.record_at(Category::Whitespace, 8, 12, "'*' at position 12, expected 1 space, found 2");
        engine.record(Category::Whitespace, 8, "Pointers should be a* b or a *b, not a * b.");
        let rendered: Vec<_> = engine.into_sorted().into_iter().map(|d| d.message).collect();
        assert_eq!(
            rendered,
            vec![
                "'*' at position 12, expected 1 space, found 2",
                "'y' at position 16, expected 1 space, found 3",
                "Pointers should be a* b or a *b, not a * b.",
            ]
        );
    }

    #[test]
    fn test_ordering_message_tiebreak() {
        let mut engine = DiagnosticEngine::new();
        engine.record(Category::Braces, 2, "b");
        engine.record(Category::Braces, 2, "a");
        let sorted = engine.into_sorted();
        assert_eq!(sorted[0].message, "a");
        assert_eq!(sorted[1].message, "b");
    }

    #[test]
    fn test_dedup_line_and_message() {
        let mut engine = DiagnosticEngine::new();
        engine.record(Category::Whitespace, 5, "same");
        engine.record_at(Category::Whitespace, 5, 3, "same");
        engine.record(Category::Whitespace, 6, "same");
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_check_report_summary() {
        let mut report = CheckReport::new();
        report.add_file(FileReport::new(
            "a.c",
            vec![
                Diagnostic::new(Category::Naming, 1, "x"),
                Diagnostic::new(Category::Naming, 2, "y"),
            ],
        ));
        report.add_file(FileReport::failed("b.c", "Unterminated comment"));
        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.failed_files, 1);
        assert_eq!(report.summary.by_category.get(&Category::Naming), Some(&2));
        assert!(report.has_diagnostics());
        assert!(report.has_failures());

        report.files[0].diagnostics.pop();
        report.recount();
        assert_eq!(report.summary.total_diagnostics, 1);
        assert_eq!(report.summary.total_files, 2);
    }
}
