//! Report rendering
//!
//! Turns a finished `CheckReport` into terminal text or JSON. Annotated
//! `.styled` files are produced by [`styled`]. Renderers only read the sorted
//! diagnostics; they never reorder or filter by rule.

pub mod styled;

use crate::domain::{Category, CheckReport, FileReport, NettError, NettResult};
use std::io::Write;

/// Supported output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `Checking <path>` banners followed by `Line n: [CAT] message` lines
    Human,
    /// One JSON document for the whole run
    Json,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "human" => Some(Self::Human),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn all_formats() -> &'static [&'static str] {
        &["human", "json"]
    }
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Highlight the path in `Checking` banners
    pub use_colors: bool,
    /// Append a run summary after the human report
    pub show_summary: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: true,
            show_summary: false,
        }
    }
}

pub struct ReportFormatter {
    options: ReportOptions,
}

impl Default for ReportFormatter {
    fn default() -> Self {
        Self::new(ReportOptions::default())
    }
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn format_report(&self, report: &CheckReport, format: OutputFormat) -> NettResult<String> {
        match format {
            OutputFormat::Human => Ok(self.format_human(report)),
            OutputFormat::Json => self.format_json(report),
        }
    }

    pub fn write_report<W: Write>(
        &self,
        report: &CheckReport,
        format: OutputFormat,
        mut writer: W,
    ) -> NettResult<()> {
        let formatted = self.format_report(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn banner(&self, file: &FileReport) -> String {
        let path = file.path.display().to_string();
        format!("Checking {}\n", self.highlight(&path))
    }

    #[cfg(feature = "colors")]
    fn highlight(&self, text: &str) -> String {
        use colored::Colorize;
        if self.options.use_colors {
            text.white().bold().to_string()
        } else {
            text.to_string()
        }
    }

    #[cfg(not(feature = "colors"))]
    fn highlight(&self, text: &str) -> String {
        text.to_string()
    }

    fn format_human(&self, report: &CheckReport) -> String {
        let mut output = String::new();
        for file in &report.files {
            output.push_str(&self.banner(file));
            if let Some(reason) = &file.failure {
                output.push_str(&format!("Error: {reason}\n"));
            } else if file.diagnostics.is_empty() {
                output.push_str("No style violations detected.\n");
            } else {
                for line in file.render() {
                    output.push_str(&line);
                    output.push('\n');
                }
            }
            output.push('\n');
        }
        if self.options.show_summary {
            output.push_str(&format_summary(report));
        }
        output
    }

    fn format_json(&self, report: &CheckReport) -> NettResult<String> {
        let files: Vec<serde_json::Value> = report
            .files
            .iter()
            .map(|file| {
                let diagnostics: Vec<serde_json::Value> = file
                    .diagnostics
                    .iter()
                    .map(|d| {
                        serde_json::json!({
                            "line": d.line,
                            "column": d.column,
                            "category": d.category.as_str(),
                            "message": d.message,
                            "rendered": d.render(),
                        })
                    })
                    .collect();
                serde_json::json!({
                    "path": file.path.display().to_string(),
                    "diagnostics": diagnostics,
                    "failure": file.failure,
                })
            })
            .collect();

        let by_category: serde_json::Map<String, serde_json::Value> = report
            .summary
            .by_category
            .iter()
            .map(|(category, count)| (category.as_str().to_string(), serde_json::json!(count)))
            .collect();

        let json_report = serde_json::json!({
            "files": files,
            "summary": {
                "total_files": report.summary.total_files,
                "failed_files": report.summary.failed_files,
                "total_diagnostics": report.summary.total_diagnostics,
                "by_category": by_category,
                "execution_time_ms": report.summary.execution_time_ms,
                "checked_at": report.summary.checked_at.to_rfc3339(),
            },
            "config_fingerprint": report.config_fingerprint,
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| NettError::report(format!("JSON serialization failed: {e}")))
    }
}

/// One line per category with findings, then the totals
pub fn format_summary(report: &CheckReport) -> String {
    let mut summary = String::new();
    for category in Category::checked() {
        if let Some(count) = report.summary.by_category.get(category) {
            summary.push_str(&format!("{category}: {count}\n"));
        }
    }
    let seconds = report.summary.execution_time_ms as f64 / 1000.0;
    summary.push_str(&format!(
        "{} finding{} in {} file{} ({:.1}s)\n",
        report.summary.total_diagnostics,
        if report.summary.total_diagnostics == 1 { "" } else { "s" },
        report.summary.total_files,
        if report.summary.total_files == 1 { "" } else { "s" },
        seconds
    ));
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Diagnostic;

    fn sample_report() -> CheckReport {
        let mut report = CheckReport::new();
        report.add_file(FileReport::new(
            "src/main.c",
            vec![
                Diagnostic::new(Category::Naming, 3, "'Bad' misnamed. Variables should be namedLikeThis."),
                Diagnostic::new(Category::Whitespace, 7, "'=' at position 9, expected 1 space, found 0")
                    .with_column(9),
            ],
        ));
        report.add_file(FileReport::new("src/clean.c", Vec::new()));
        report.set_execution_time(1200);
        report
    }

    fn plain() -> ReportFormatter {
        ReportFormatter::new(ReportOptions {
            use_colors: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_human_format() {
        let output = plain().format_report(&sample_report(), OutputFormat::Human).unwrap();
        assert_eq!(
            output,
            "Checking src/main.c\n\
             Line 3: [NAMING] 'Bad' misnamed. Variables should be namedLikeThis.\n\
             Line 7: [WHITESPACE] '=' at position 9, expected 1 space, found 0\n\
             \n\
             Checking src/clean.c\n\
             No style violations detected.\n\
             \n"
        );
    }

    #[test]
    fn test_failed_file_and_summary() {
        let mut report = CheckReport::new();
        report.add_file(FileReport::failed("bad.c", "Lexical error in bad.c at line 1: Unterminated block comment"));
        let formatter = ReportFormatter::new(ReportOptions {
            use_colors: false,
            show_summary: true,
        });
        let output = formatter.format_report(&report, OutputFormat::Human).unwrap();
        assert!(output.starts_with("Checking bad.c\nError: Lexical error in bad.c"));
        assert!(output.ends_with("0 findings in 1 file (0.0s)\n"));
    }

    #[test]
    fn test_json_format() {
        let output = plain().format_report(&sample_report(), OutputFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["files"].as_array().unwrap().len(), 2);
        assert_eq!(json["files"][0]["path"], "src/main.c");
        assert_eq!(json["files"][0]["diagnostics"][1]["column"], 9);
        assert_eq!(json["files"][0]["diagnostics"][0]["category"], "NAMING");
        assert!(json["files"][0]["diagnostics"][0]["column"].is_null());
        assert_eq!(json["summary"]["total_diagnostics"], 2);
        assert_eq!(json["summary"]["by_category"]["WHITESPACE"], 1);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(OutputFormat::from_str("JSON"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_str("sarif"), None);
        assert_eq!(OutputFormat::all_formats(), &["human", "json"]);
    }
}
