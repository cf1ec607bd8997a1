//! Banned constructs: `goto`, digraphs and trigraphs

use super::{CheckContext, StyleCheck};
use crate::domain::{Category, DiagnosticEngine};
use crate::source::{SimpleKind, SourceFile, Stmt, TokenKind};

const DIGRAPHS: &[&str] = &["<:", ":>", "<%", "%>", "%:"];
const TRIGRAPHS: &[&str] = &["??=", "??/", "??'", "??(", "??)", "??!", "??<", "??>", "??-"];

pub struct WarningCheck;

/// Column ranges, per line, covered by comments and literals
fn literal_ranges(file: &SourceFile) -> Vec<Vec<(u32, u32)>> {
    let mut ranges = vec![Vec::new(); file.lines.len() + 2];
    let hidden = file
        .tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::Comment | TokenKind::Str | TokenKind::Char));
    for token in hidden {
        for line in token.line..=token.end_line {
            let start = if line == token.line { token.column } else { 1 };
            let end = if line == token.end_line {
                token.end_column
            } else {
                u32::MAX
            };
            if let Some(slot) = ranges.get_mut(line as usize) {
                slot.push((start, end));
            }
        }
    }
    ranges
}

impl WarningCheck {
    fn check_graphs(file: &SourceFile, out: &mut DiagnosticEngine) {
        let hidden = literal_ranges(file);
        for line in &file.lines {
            if !line.text.contains(['?', '<', '%', ':']) {
                continue;
            }
            let chars: Vec<char> = line.text.chars().collect();
            let ranges = &hidden[line.number as usize];
            for start in 0..chars.len() {
                let column = start as u32 + 1;
                if ranges.iter().any(|&(from, to)| from <= column && column < to) {
                    continue;
                }
                let rest: String = chars[start..chars.len().min(start + 3)].iter().collect();
                let found = TRIGRAPHS.iter().any(|t| rest.starts_with(t))
                    || DIGRAPHS.iter().any(|d| rest.starts_with(d));
                if found {
                    out.record(
                        Category::Warning,
                        line.number,
                        "Digraphs and Trigraphs should not be used.",
                    );
                    break;
                }
            }
        }
    }

    fn check_goto(file: &SourceFile, out: &mut DiagnosticEngine) {
        for (_, function) in file.function_defs() {
            let Some(body) = &function.body else {
                continue;
            };
            body.walk(&mut |stmt| {
                if let Stmt::Simple(simple) = stmt {
                    if simple.kind == SimpleKind::Goto {
                        out.record(
                            Category::Warning,
                            file.line_of(simple.first),
                            "'goto' is banned and should not be used.",
                        );
                    }
                }
            });
        }
    }
}

impl StyleCheck for WarningCheck {
    fn name(&self) -> &'static str {
        "warning"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Warning]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        Self::check_graphs(ctx.file, out);
        Self::check_goto(ctx.file, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run;

    #[test]
    fn test_goto_is_banned() {
        let out = run(
            &WarningCheck,
            "jump.c",
            "void f(int n) {\n    if (n) {\n        goto done;\n    }\ndone:\n    return;\n}\n",
        );
        assert_eq!(out, vec!["Line 3: [WARNING] 'goto' is banned and should not be used."]);
    }

    #[test]
    fn test_digraphs_and_trigraphs_outside_literals() {
        let out = run(
            &WarningCheck,
            "graphs.c",
            "int a<:2:>;\n\
             char *s = \"??= <: in a string\";\n\
             // <% in a comment %>\n\
             int b = 1 ??- 2;\n\
             int c = d ? 1 : 2;\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 1: [WARNING] Digraphs and Trigraphs should not be used.",
                "Line 4: [WARNING] Digraphs and Trigraphs should not be used.",
            ]
        );
    }
}
