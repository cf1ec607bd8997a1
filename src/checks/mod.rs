//! Style rule families
//!
//! Every family is a `StyleCheck`: it reads one parsed `SourceFile` and
//! appends findings to a `DiagnosticEngine`. Checks never fail and never
//! see each other's output.

pub mod braces;
pub mod comments;
pub mod indentation;
pub mod line_length;
pub mod naming;
pub mod overall;
pub mod separation;
pub mod warning;
pub mod whitespace;

use crate::config::RuleConfig;
use crate::domain::{Category, DiagnosticEngine};
use crate::source::SourceFile;

/// What a check gets to look at
pub struct CheckContext<'a> {
    pub file: &'a SourceFile,
    pub config: &'a RuleConfig,
    /// Headers named by `#include "..."` that could be read next to the file
    pub includes: &'a [SourceFile],
}

impl<'a> CheckContext<'a> {
    pub fn new(file: &'a SourceFile, config: &'a RuleConfig) -> Self {
        Self {
            file,
            config,
            includes: &[],
        }
    }

    pub fn with_includes(mut self, includes: &'a [SourceFile]) -> Self {
        self.includes = includes;
        self
    }
}

/// One family of style rules
pub trait StyleCheck: Send + Sync {
    /// Short identifier used in logs and by `nett rules`
    fn name(&self) -> &'static str;

    /// Categories this check can report
    fn categories(&self) -> &'static [Category];

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine);
}

/// Every check, in a fixed order
pub fn default_checks() -> Vec<Box<dyn StyleCheck>> {
    vec![
        Box::new(naming::NamingCheck),
        Box::new(comments::CommentsCheck),
        Box::new(braces::BracesCheck),
        Box::new(whitespace::WhitespaceCheck),
        Box::new(separation::SeparationCheck),
        Box::new(indentation::IndentationCheck),
        Box::new(line_length::LineLengthCheck),
        Box::new(overall::OverallCheck),
        Box::new(warning::WarningCheck),
    ]
}

/// Run `checks` over one file, dropping findings of disabled categories
pub fn run_checks(ctx: &CheckContext<'_>, checks: &[Box<dyn StyleCheck>]) -> DiagnosticEngine {
    let mut out = DiagnosticEngine::new();
    for check in checks {
        if !check.categories().iter().any(|&c| ctx.config.is_enabled(c)) {
            tracing::trace!("skipping disabled check {}", check.name());
            continue;
        }
        check.check(ctx, &mut out);
    }
    out.retain(|d| ctx.config.is_enabled(d.category));
    out
}

/// `s` when `count` is not one
pub(crate) fn plural(count: u32) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Run one check over `content` parsed as `path`, rendered
    pub fn run(check: &dyn StyleCheck, path: &str, content: &str) -> Vec<String> {
        run_with(check, path, content, &RuleConfig::default())
    }

    pub fn run_with(
        check: &dyn StyleCheck,
        path: &str,
        content: &str,
        config: &RuleConfig,
    ) -> Vec<String> {
        let file = SourceFile::parse(path, content, config).unwrap();
        let ctx = CheckContext::new(&file, config);
        let mut out = DiagnosticEngine::new();
        check.check(&ctx, &mut out);
        out.render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;

    #[test]
    fn test_disabled_categories_are_dropped() {
        let config = ConfigBuilder::new()
            .disable(Category::Naming)
            .build()
            .unwrap();
        let file = SourceFile::parse("demo.c", "int BadName;\n", &config).unwrap();
        let ctx = CheckContext::new(&file, &config);
        let out = run_checks(&ctx, &default_checks());
        assert!(out.iter().all(|d| d.category != Category::Naming));
        assert!(out.iter().any(|d| d.category == Category::Comments));
    }

    #[test]
    fn test_check_names_are_unique() {
        let checks = default_checks();
        let mut names: Vec<&str> = checks.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), checks.len());
    }
}
