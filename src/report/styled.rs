//! Annotated `.styled` copies of checked files
//!
//! Each source line is preceded by its findings, at most one per category on
//! a line. Once a category has reached the per-file cap, a single NOTE says so
//! and the remaining findings of that category are left out.

use crate::domain::{Category, CheckReport, Diagnostic, FileReport, NettError, NettResult};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const CAP_REACHED: &str = "[NOTE] More violations of this category exist in this file, but the cap has been reached.";

/// Path of the annotated copy written for `path`
pub fn styled_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".styled");
    PathBuf::from(name)
}

/// Render `content` with `diagnostics` interleaved above their lines
pub fn render_styled(content: &str, diagnostics: &[Diagnostic], cap: usize) -> String {
    let mut by_line: BTreeMap<u32, Vec<&Diagnostic>> = BTreeMap::new();
    for diagnostic in diagnostics {
        by_line.entry(diagnostic.line).or_default().push(diagnostic);
    }

    let mut counts: BTreeMap<Category, usize> = BTreeMap::new();
    let mut cap_noted: HashSet<Category> = HashSet::new();
    let mut output = String::with_capacity(content.len());

    for (index, text) in content.lines().enumerate() {
        let line = index as u32 + 1;
        if let Some(found) = by_line.get_mut(&line) {
            found.sort();
            let mut on_line: HashSet<Category> = HashSet::new();
            for diagnostic in found.iter() {
                let category = diagnostic.category;
                if on_line.contains(&category) {
                    continue;
                }
                let count = counts.entry(category).or_insert(0);
                if *count >= cap {
                    if category != Category::Note && cap_noted.insert(category) {
                        output.push_str(CAP_REACHED);
                        output.push('\n');
                    }
                    continue;
                }
                output.push_str(&diagnostic.render_inline());
                output.push('\n');
                on_line.insert(category);
                *count += 1;
            }
        }
        output.push_str(text);
        output.push('\n');
    }
    output
}

/// Write the annotated copy of one checked file, returning its path
pub async fn write_styled_file(file: &FileReport, cap: usize) -> NettResult<PathBuf> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|_| NettError::input_not_found(&file.path))?;
    let content = String::from_utf8_lossy(&bytes);
    let target = styled_path(&file.path);
    tokio::fs::write(&target, render_styled(&content, &file.diagnostics, cap)).await?;
    tracing::debug!("wrote {}", target.display());
    Ok(target)
}

/// Write annotated copies for every file in the report that was checked.
///
/// Files that failed to check get no copy.
pub async fn write_styled_files(report: &CheckReport, cap: usize) -> NettResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for file in report.files.iter().filter(|f| f.failure.is_none()) {
        written.push(write_styled_file(file, cap).await?);
    }
    tracing::info!("wrote {} annotated file(s)", written.len());
    Ok(written)
}
