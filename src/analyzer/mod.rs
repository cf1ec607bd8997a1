//! Run orchestration: discovery, the per-file pipeline and run-wide merging
//!
//! Each file is read, parsed and handed to every check on its own;
//! files are processed in parallel with rayon. Anything that depends on other
//! files (misnamed identifiers reported once per run) is applied afterwards,
//! in input order, so output never depends on scheduling.

pub mod discovery;

use crate::checks::{self, naming, CheckContext, StyleCheck};
use crate::config::RuleConfig;
use crate::domain::{CheckReport, Diagnostic, FileReport, NettError, NettResult};
use crate::source::SourceFile;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Options for one run
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Check files on the rayon pool
    pub parallel: bool,
    /// Stop at the first file that cannot be read or holds a malformed
    /// literal or comment
    pub fail_fast: bool,
    /// Glob patterns skipped during discovery, on top of the configured ones
    pub exclude_patterns: Vec<String>,
    /// Keep NOTE findings for names already reported earlier in the run
    pub annotate: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            fail_fast: false,
            exclude_patterns: Vec::new(),
            annotate: false,
        }
    }
}

/// Runs every style check over a set of files
pub struct Analyzer {
    config: RuleConfig,
    checks: Vec<Box<dyn StyleCheck>>,
}

impl Analyzer {
    pub fn new(config: RuleConfig) -> NettResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            checks: checks::default_checks(),
        })
    }

    pub fn with_defaults() -> NettResult<Self> {
        Self::new(RuleConfig::default())
    }

    pub fn config(&self) -> &RuleConfig {
        &self.config
    }

    pub fn checks(&self) -> &[Box<dyn StyleCheck>] {
        &self.checks
    }

    pub fn config_fingerprint(&self) -> String {
        self.config.fingerprint()
    }

    /// Check in-memory source as if it were the file at `path`.
    ///
    /// Includes are not resolved and no run-wide de-duplication happens.
    pub fn check_source(&self, path: impl AsRef<Path>, content: &str) -> NettResult<Vec<Diagnostic>> {
        let file = SourceFile::parse(path, content, &self.config)?;
        Ok(self.run_checks(&file, &[]))
    }

    /// Read and check one file, resolving quoted includes next to it
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> NettResult<FileReport> {
        self.check_file(path.as_ref(), false)
    }

    fn check_file(&self, path: &Path, strict: bool) -> NettResult<FileReport> {
        tracing::debug!("checking {}", path.display());

        let content = read_source(path)?;
        let mut file = SourceFile::parse(path, &content, &self.config)?;
        if strict {
            if let Some(problem) = file.first_problem() {
                return Err(problem);
            }
        }

        let headers = self.load_includes(path, &file);
        let known_types: HashSet<String> = headers
            .iter()
            .flat_map(|h| h.typedef_names.iter().cloned())
            .collect();
        // types from headers change how declarations parse
        if known_types.iter().any(|t| !file.typedef_names.contains(t)) {
            file = SourceFile::parse_with_types(path, &content, &self.config, &known_types)?;
        }

        let diagnostics = self.run_checks(&file, &headers);
        tracing::debug!("{}: {} finding(s)", path.display(), diagnostics.len());
        Ok(FileReport::new(path, diagnostics))
    }

    fn run_checks(&self, file: &SourceFile, includes: &[SourceFile]) -> Vec<Diagnostic> {
        let ctx = CheckContext::new(file, &self.config).with_includes(includes);
        checks::run_checks(&ctx, &self.checks).into_sorted()
    }

    /// Headers named by `#include "..."` that exist next to `path`
    fn load_includes(&self, path: &Path, file: &SourceFile) -> Vec<SourceFile> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut headers = Vec::new();
        for name in file.local_includes() {
            let header_path = dir.join(&name);
            let Ok(content) = fs::read_to_string(&header_path) else {
                tracing::debug!("include {} not found next to {}", name, path.display());
                continue;
            };
            match SourceFile::parse(&header_path, &content, &self.config) {
                Ok(header) => headers.push(header),
                Err(e) => tracing::debug!("skipping include {}: {}", header_path.display(), e),
            }
        }
        headers
    }

    /// Discover and check every input, producing a report in input order
    pub fn analyze_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> NettResult<CheckReport> {
        let start = Instant::now();
        let files = discovery::discover(paths, &self.config, &options.exclude_patterns)?;

        let results: Vec<(PathBuf, NettResult<FileReport>)> = if options.parallel && files.len() > 1 {
            files
                .par_iter()
                .map(|path| (path.clone(), self.check_file(path, options.fail_fast)))
                .collect()
        } else {
            files
                .iter()
                .map(|path| (path.clone(), self.check_file(path, options.fail_fast)))
                .collect()
        };

        let mut reports = Vec::with_capacity(results.len());
        for (path, result) in results {
            match result {
                Ok(report) => reports.push(report),
                Err(e) if options.fail_fast => return Err(e),
                Err(e) => {
                    tracing::warn!("Failed to check {}: {}", path.display(), e);
                    reports.push(FileReport::failed(path, e.to_string()));
                }
            }
        }

        deduplicate_names(&mut reports, options.annotate);

        let mut report = CheckReport::new();
        for file in reports {
            report.add_file(file);
        }
        report.set_execution_time(start.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.config.fingerprint());
        tracing::info!(
            "checked {} file(s), {} finding(s)",
            report.summary.total_files,
            report.summary.total_diagnostics
        );
        Ok(report)
    }
}

fn read_source(path: &Path) -> NettResult<String> {
    let bytes = fs::read(path).map_err(|_| NettError::input_not_found(path))?;
    if bytes.contains(&0) {
        return Err(NettError::analysis(path.display().to_string(), "not a text file"));
    }
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Report each misnamed spelling once per run, at its first occurrence.
///
/// Later occurrences are dropped, or turned into NOTEs when annotating.
pub fn deduplicate_names(reports: &mut [FileReport], annotate: bool) {
    let mut infracted: HashSet<String> = HashSet::new();
    for report in reports.iter_mut() {
        let mut kept = Vec::with_capacity(report.diagnostics.len());
        for diagnostic in report.diagnostics.drain(..) {
            let Some(name) = naming::infracted_name(&diagnostic).map(str::to_string) else {
                kept.push(diagnostic);
                continue;
            };
            if infracted.insert(name.clone()) {
                kept.push(diagnostic);
            } else if annotate {
                kept.push(naming::already_infracted(&name, diagnostic.line));
            }
        }
        kept.sort();
        kept.dedup();
        report.diagnostics = kept;
    }
}
