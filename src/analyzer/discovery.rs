//! Input discovery: explicit files plus C sources found under directories
//!
//! Exclusions use glob patterns matched against the full path and against the
//! path relative to the directory being walked.

use crate::config::RuleConfig;
use crate::domain::{NettError, NettResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Compiled exclusion patterns
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<glob::Pattern>,
}

impl ExcludeSet {
    pub fn new<I, S>(patterns: I) -> NettResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let p = p.as_ref();
                glob::Pattern::new(p)
                    .map_err(|e| NettError::config(format!("Invalid exclude pattern '{p}': {e}")))
            })
            .collect::<NettResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Whether `path`, or its form relative to `root`, matches any pattern
    pub fn excludes(&self, path: &Path, root: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        self.patterns
            .iter()
            .any(|p| p.matches_path(path) || p.matches_path(relative))
    }
}

/// Every file to check, in order of first mention.
///
/// Files named directly are kept whatever their extension; directories
/// contribute files with a configured extension that no exclusion matches.
pub fn discover<P: AsRef<Path>>(
    paths: &[P],
    config: &RuleConfig,
    extra_excludes: &[String],
) -> NettResult<Vec<PathBuf>> {
    if paths.is_empty() {
        return Err(NettError::NoInput);
    }
    let excludes = ExcludeSet::new(config.exclude.iter().chain(extra_excludes))?;

    let mut seen = HashSet::new();
    let mut files = Vec::new();
    let mut add = |path: PathBuf| {
        if seen.insert(path.clone()) {
            files.push(path);
        }
    };

    for path in paths {
        let path = path.as_ref();
        if path.is_file() {
            add(path.to_path_buf());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let candidate = entry.path();
                if entry.file_type().is_file()
                    && config.handles_extension(candidate)
                    && !excludes.excludes(candidate, path)
                {
                    add(candidate.to_path_buf());
                }
            }
        } else {
            return Err(NettError::input_not_found(path));
        }
    }

    tracing::debug!("discovered {} input file(s)", files.len());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_directories_are_walked_for_sources() -> NettResult<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        fs::create_dir_all(root.join("src/gen"))?;
        fs::write(root.join("src/main.c"), "int main(void) {}\n")?;
        fs::write(root.join("src/util.h"), "\n")?;
        fs::write(root.join("src/notes.txt"), "\n")?;
        fs::write(root.join("src/main.c.styled"), "\n")?;
        fs::write(root.join("src/gen/table.c"), "\n")?;

        let config = RuleConfig::default();
        let files = discover(&[root], &config, &["src/gen/**".to_string()])?;
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("src/main.c"), PathBuf::from("src/util.h")]);
        Ok(())
    }

    #[test]
    fn test_explicit_files_are_deduplicated_in_order() -> NettResult<()> {
        let temp = TempDir::new()?;
        let a = temp.path().join("a.c");
        let b = temp.path().join("b.txt");
        fs::write(&a, "\n")?;
        fs::write(&b, "\n")?;

        let files = discover(&[&b, &a, &b], &RuleConfig::default(), &[])?;
        assert_eq!(files, vec![b.clone(), a]);
        Ok(())
    }

    #[test]
    fn test_missing_and_empty_inputs() {
        let config = RuleConfig::default();
        let missing = discover(&["/no/such/file.c"], &config, &[]);
        assert!(matches!(missing, Err(NettError::InputNotFound { .. })));

        let none: [&str; 0] = [];
        assert!(matches!(discover(&none, &config, &[]), Err(NettError::NoInput)));
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        assert!(ExcludeSet::new(["["]).is_err());
        assert!(ExcludeSet::new(Vec::<String>::new()).unwrap().is_empty());
    }
}
