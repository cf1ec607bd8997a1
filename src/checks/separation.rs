//! Blank-line separation between file-scope declarations

use super::{CheckContext, StyleCheck};
use crate::domain::{Category, DiagnosticEngine};
use crate::source::{DeclNode, SourceFile, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    FunctionDecl,
    FunctionDef,
    Enum { defined: bool },
    Struct { defined: bool },
    Union { defined: bool },
    Global,
    Typedef,
}

impl EntryKind {
    fn plural(self) -> &'static str {
        match self {
            Self::FunctionDecl | Self::FunctionDef => "Functions",
            Self::Enum { .. } => "Enums",
            Self::Struct { .. } => "Structs",
            Self::Union { .. } => "Unions",
            Self::Global => "Global Variables",
            Self::Typedef => "Typedefs",
        }
    }

    fn is_forward_tag(self) -> bool {
        matches!(
            self,
            Self::Enum { defined: false } | Self::Struct { defined: false } | Self::Union { defined: false }
        )
    }

    /// Pairs allowed to sit on adjacent lines
    fn may_touch(self, next: Self) -> bool {
        (self == next && matches!(self, Self::Global | Self::Typedef | Self::FunctionDecl))
            || (self.is_forward_tag() && next.is_forward_tag())
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    kind: EntryKind,
    first: TokenId,
    last: TokenId,
    start_line: u32,
    end_line: u32,
}

fn tag_kind(decl: &DeclNode) -> Option<EntryKind> {
    match decl {
        DeclNode::Struct(r) => Some(EntryKind::Struct { defined: r.is_definition() }),
        DeclNode::Union(r) => Some(EntryKind::Union { defined: r.is_definition() }),
        DeclNode::Enum(e) => Some(EntryKind::Enum { defined: e.is_definition() }),
        _ => None,
    }
}

fn entry_kind(file: &SourceFile, decl: &DeclNode) -> Option<EntryKind> {
    match decl {
        DeclNode::FunctionDecl(_) => Some(EntryKind::FunctionDecl),
        DeclNode::FunctionDef(_) => Some(EntryKind::FunctionDef),
        DeclNode::Variable(_) => Some(EntryKind::Global),
        // a typedef that defines its record counts as that record
        DeclNode::Typedef(t) => Some(
            t.target
                .and_then(|target| tag_kind(&file.decls[target]))
                .unwrap_or(EntryKind::Typedef),
        ),
        DeclNode::Struct(_) | DeclNode::Union(_) | DeclNode::Enum(_) => tag_kind(decl),
        DeclNode::EnumConstant(_) | DeclNode::Macro(_) => None,
    }
}

fn entries(file: &SourceFile) -> Vec<Entry> {
    let mut entries: Vec<Entry> = Vec::new();
    for &id in &file.top_level {
        let decl = &file.decls[id];
        let Some(kind) = entry_kind(file, decl) else {
            continue;
        };
        let span = decl.span();
        let first = file.leading_comment(span.first).unwrap_or(span.first);
        let entry = Entry {
            kind,
            first,
            last: span.last,
            start_line: file.line_of(first),
            end_line: file.token(span.last).end_line,
        };
        // declarators sharing one declaration are one entry
        if entries
            .last()
            .is_some_and(|prev| prev.first == entry.first && prev.last == entry.last)
        {
            continue;
        }
        entries.push(entry);
    }
    entries
}

/// A comment or directive on its own between two entries
fn interrupted(file: &SourceFile, prev: &Entry, next: &Entry) -> bool {
    ((prev.last + 1)..next.first).any(|id| {
        let token = file.token(id);
        !token.is_code() && token.line > prev.end_line
    })
}

pub struct SeparationCheck;

impl StyleCheck for SeparationCheck {
    fn name(&self) -> &'static str {
        "separation"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Whitespace]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let file = ctx.file;
        let entries = entries(file);
        for pair in entries.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            if next.first <= prev.last || interrupted(file, prev, next) {
                continue;
            }
            let gap = next.start_line.saturating_sub(prev.end_line);
            let violation = if prev.kind.may_touch(next.kind) {
                gap > 2
            } else {
                gap != 2
            };
            if violation {
                let (a, b) = (prev.kind.plural(), next.kind.plural());
                let kinds = if a == b {
                    a.to_string()
                } else {
                    format!("{a} and {b}")
                };
                out.record(
                    Category::Whitespace,
                    prev.end_line + 1,
                    format!("{kinds} should be separated by reasonable whitespace."),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::run;

    #[test]
    fn test_definitions_need_one_blank_line() {
        let out = run(
            &SeparationCheck,
            "sep.c",
            "enum Mode {\n\
             \x20   FAST\n\
             };\n\
             struct Box {\n\
             \x20   int w;\n\
             };\n\
             \n\
             \n\
             typedef int Count;\n\
             typedef int Size;\n\
             \n\
             // adds\n\
             int add(int a, int b) {\n\
             \x20   return a + b;\n\
             }\n\
             int sub(int a, int b) {\n\
             \x20   return a - b;\n\
             }\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 4: [WHITESPACE] Enums and Structs should be separated by reasonable whitespace.",
                "Line 7: [WHITESPACE] Structs and Typedefs should be separated by reasonable whitespace.",
                "Line 16: [WHITESPACE] Functions should be separated by reasonable whitespace.",
            ]
        );
    }

    #[test]
    fn test_similar_declarations_may_be_adjacent() {
        let out = run(
            &SeparationCheck,
            "adj.c",
            "struct Node;\n\
             union Cell;\n\
             int a, b;\n\
             int c;\n\
             \n\
             int f(void);\n\
             int g(void);\n\
             \n\
             \n\
             int h(void);\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 3: [WHITESPACE] Unions and Global Variables should be separated by reasonable whitespace.",
                "Line 8: [WHITESPACE] Functions should be separated by reasonable whitespace.",
            ]
        );
    }

    #[test]
    fn test_directives_and_section_comments_interrupt() {
        let out = run(
            &SeparationCheck,
            "dir.c",
            "int a;\n\
             #define LIMIT 4\n\
             int f(void) {\n\
             \x20   return a;\n\
             }\n\
             \n\
             /* ---- section ---- */\n\
             \n\
             \n\
             int g(void) {\n\
             \x20   return 0;\n\
             }\n",
        );
        assert!(out.is_empty());
    }
}
