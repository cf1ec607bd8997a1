//! nett - a style checker for C source files
//!
//! Architecture: the library is the application layer
//! - `source` turns text into tokens, lines, declarations and statements
//! - `checks` are independent rules reading one parsed file each
//! - `analyzer` runs the checks over many files and merges run-wide state
//! - `report` renders results for the terminal, JSON or annotated copies

pub mod analyzer;
pub mod checks;
pub mod config;
pub mod domain;
pub mod report;
pub mod source;

// Re-export main types for convenient access
pub use domain::{
    Category, CheckReport, Diagnostic, DiagnosticEngine, FileReport, NettError, NettResult, RunSummary,
};

pub use config::{ConfigBuilder, RuleConfig};

pub use analyzer::{AnalysisOptions, Analyzer};

pub use checks::{CheckContext, StyleCheck};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use source::SourceFile;

use std::path::{Path, PathBuf};

/// High-level entry point: check paths, then print or annotate the results
pub struct NettValidator {
    analyzer: Analyzer,
    report_formatter: ReportFormatter,
}

impl NettValidator {
    /// Create a validator with the given configuration
    pub fn with_config(config: RuleConfig) -> NettResult<Self> {
        let analyzer = Analyzer::new(config)?;
        Ok(Self {
            analyzer,
            report_formatter: ReportFormatter::default(),
        })
    }

    /// Create a validator with default configuration
    pub fn new() -> NettResult<Self> {
        Self::with_config(RuleConfig::default())
    }

    /// Create a validator loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> NettResult<Self> {
        let config = RuleConfig::load_from_file(path)?;
        Self::with_config(config)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn config(&self) -> &RuleConfig {
        self.analyzer.config()
    }

    /// Check files and directories
    pub fn check_paths<P: AsRef<Path>>(&self, paths: &[P], options: &AnalysisOptions) -> NettResult<CheckReport> {
        self.analyzer.analyze_paths(paths, options)
    }

    /// Check a single file
    pub fn check_file<P: AsRef<Path>>(&self, path: P) -> NettResult<FileReport> {
        self.analyzer.analyze_file(path)
    }

    /// Check source text that does not live on disk
    pub fn check_source(&self, path: impl AsRef<Path>, content: &str) -> NettResult<Vec<Diagnostic>> {
        self.analyzer.check_source(path, content)
    }

    /// Write a `.styled` copy next to every checked file
    pub async fn generate_styled_files(&self, report: &CheckReport) -> NettResult<Vec<PathBuf>> {
        report::styled::write_styled_files(report, self.config().max_annotations_per_category).await
    }

    /// Format a report for output
    pub fn format_report(&self, report: &CheckReport, format: OutputFormat) -> NettResult<String> {
        self.report_formatter.format_report(report, format)
    }
}

/// Convenience function to create a validator with default settings
pub fn create_validator() -> NettResult<NettValidator> {
    NettValidator::new()
}

/// Convenience function to check paths with default settings
pub fn check_paths<P: AsRef<Path>>(paths: &[P]) -> NettResult<CheckReport> {
    NettValidator::new()?.check_paths(paths, &AnalysisOptions::default())
}

/// Convenience function to check and annotate paths with default settings
pub async fn annotate_paths<P: AsRef<Path>>(paths: &[P]) -> NettResult<Vec<PathBuf>> {
    let validator = NettValidator::new()?;
    let options = AnalysisOptions {
        annotate: true,
        ..Default::default()
    };
    let report = validator.check_paths(paths, &options)?;
    validator.generate_styled_files(&report).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MESSY: &str = "int Counter;\n\nint main(void){\n    return 0;\n}\n";

    #[test]
    fn test_check_file() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("messy.c");
        fs::write(&test_file, MESSY).unwrap();

        let validator = NettValidator::new().unwrap();
        let report = validator.check_file(&test_file).unwrap();

        assert!(!report.is_clean());
        assert_eq!(report.count(Category::Naming), 1);
        assert!(report.count(Category::Comments) >= 1);
    }

    #[test]
    fn test_directory_check_and_formatting() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src/messy.c"), MESSY).unwrap();
        fs::write(root.join("src/README"), "not C").unwrap();

        let validator = NettValidator::new()
            .unwrap()
            .with_report_formatter(ReportFormatter::new(ReportOptions {
                use_colors: false,
                ..Default::default()
            }));
        let report = validator.check_paths(&[root], &AnalysisOptions::default()).unwrap();
        assert_eq!(report.summary.total_files, 1);

        let human = validator.format_report(&report, OutputFormat::Human).unwrap();
        assert!(human.starts_with("Checking "));
        assert!(human.contains("Line 1: [NAMING] 'Counter' misnamed."));

        let json = validator.format_report(&report, OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["files"][0]["diagnostics"].is_array());
    }

    #[tokio::test]
    async fn test_annotate_paths() {
        let temp_dir = TempDir::new().unwrap();
        let test_file = temp_dir.path().join("messy.c");
        fs::write(&test_file, MESSY).unwrap();

        let written = annotate_paths(&[&test_file]).await.unwrap();
        assert_eq!(written, vec![temp_dir.path().join("messy.c.styled")]);

        let styled = fs::read_to_string(&written[0]).unwrap();
        assert!(styled.starts_with("[NAMING] 'Counter' misnamed."));
        assert!(styled.contains("\nint Counter;\n"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RuleConfig {
            indent_width: 0,
            ..Default::default()
        };
        assert!(matches!(NettValidator::with_config(config), Err(NettError::Configuration { .. })));
    }

    #[test]
    fn test_convenience_functions() {
        let temp_dir = TempDir::new().unwrap();
        let clean = temp_dir.path().join("clean.c");
        fs::write(&clean, "/* entry point */\nint main(void) {\n    return 0;\n}\n").unwrap();

        assert!(create_validator().is_ok());
        let report = check_paths(&[&clean]).unwrap();
        assert!(!report.has_diagnostics(), "{:?}", report.files[0].render());
    }
}
