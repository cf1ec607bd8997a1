//! Source model of one C file
//!
//! A `SourceFile` bundles the expanded lines, the full token stream (comments
//! and directives included), the declaration arena with its statement trees,
//! and the role of every operator token. Checkers only read it.

pub mod decls;
pub mod lexer;
pub mod lines;
pub mod parser;
pub mod roles;
pub mod stmts;

pub use decls::*;
pub use lexer::{LexError, Token, TokenKind};
pub use lines::SourceLine;
pub use roles::{CallSite, TokenRole};
pub use stmts::*;

use crate::config::RuleConfig;
use crate::domain::{NettError, NettResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Everything the checkers need to know about one file
#[derive(Debug)]
pub struct SourceFile {
    pub path: PathBuf,
    pub lines: Vec<SourceLine>,
    pub tokens: Vec<Token>,
    /// Matching bracket of every bracket token
    pub partners: Vec<Option<TokenId>>,
    pub decls: Vec<DeclNode>,
    /// File-scope declarations in source order, macros excluded
    pub top_level: Vec<DeclId>,
    pub roles: Vec<TokenRole>,
    pub calls: Vec<CallSite>,
    pub typedef_names: HashSet<String>,
    /// Malformed literals and comments the lexer recovered from
    pub problems: Vec<LexError>,
    line_starts: Vec<Option<TokenId>>,
    covered: Vec<bool>,
}

impl SourceFile {
    pub fn parse(path: impl AsRef<Path>, content: &str, config: &RuleConfig) -> NettResult<Self> {
        Self::parse_with_types(path, content, config, &HashSet::new())
    }

    /// Parse with type names already known from included headers
    pub fn parse_with_types(
        path: impl AsRef<Path>,
        content: &str,
        config: &RuleConfig,
        known_types: &HashSet<String>,
    ) -> NettResult<Self> {
        let path = path.as_ref().to_path_buf();
        let lines = lines::split_lines(content, config.tab_width);
        let text = lines::sanitize(content, config.tab_width);
        let (tokens, problems) = lexer::tokenize_recovering(&text);
        for problem in &problems {
            tracing::warn!("{}:{}: {}", path.display(), problem.line, problem.message);
        }

        let partners = parser::bracket_partners(&tokens);
        let mut unit = parser::Parser::new(&tokens, &partners)
            .with_typedefs(known_types.iter().cloned())
            .parse();
        let calls = roles::classify(
            &tokens,
            &partners,
            &unit.typedef_names,
            &unit.expressions,
            &mut unit.roles,
        );
        unit.decls.extend(macros(&tokens));

        let mut line_starts = vec![None; lines.len() + 1];
        let mut covered = vec![false; lines.len() + 2];
        for (id, token) in tokens.iter().enumerate() {
            let index = token.line as usize;
            if index < line_starts.len() && line_starts[index].is_none() {
                line_starts[index] = Some(id);
            }
            for line in token.line..=token.end_line {
                if let Some(slot) = covered.get_mut(line as usize) {
                    *slot = true;
                }
            }
        }

        Ok(Self {
            path,
            lines,
            tokens,
            partners,
            decls: unit.decls,
            top_level: unit.top_level,
            roles: unit.roles,
            calls,
            typedef_names: unit.typedef_names,
            problems,
            line_starts,
            covered,
        })
    }

    /// The first recovered lexer problem as an error
    pub fn first_problem(&self) -> Option<NettError> {
        self.problems
            .first()
            .map(|p| NettError::lex(self.path.display().to_string(), p.line, p.message.clone()))
    }

    /// Final path component
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn is_header(&self) -> bool {
        self.path.extension().is_some_and(|e| e == "h")
    }

    pub fn line(&self, number: u32) -> Option<&SourceLine> {
        number
            .checked_sub(1)
            .and_then(|index| self.lines.get(index as usize))
    }

    pub fn token(&self, id: TokenId) -> &Token {
        &self.tokens[id]
    }

    pub fn line_of(&self, id: TokenId) -> u32 {
        self.tokens[id].line
    }

    pub fn role(&self, id: TokenId) -> TokenRole {
        self.roles[id]
    }

    pub fn partner(&self, id: TokenId) -> Option<TokenId> {
        self.partners[id]
    }

    /// Closest code token before `id`
    pub fn prev_code(&self, id: TokenId) -> Option<TokenId> {
        (0..id).rev().find(|&i| self.tokens[i].is_code())
    }

    /// Closest code token after `id`
    pub fn next_code(&self, id: TokenId) -> Option<TokenId> {
        ((id + 1)..self.tokens.len()).find(|&i| self.tokens[i].is_code())
    }

    /// Code tokens strictly between two tokens
    pub fn code_between(&self, first: TokenId, last: TokenId) -> impl Iterator<Item = TokenId> + '_ {
        ((first + 1)..last).filter(move |&i| self.tokens[i].is_code())
    }

    /// First token of any kind that starts on `line`
    pub fn first_token_on_line(&self, line: u32) -> Option<TokenId> {
        self.line_starts.get(line as usize).copied().flatten()
    }

    /// Whether `id` is the first token on its line
    pub fn starts_line(&self, id: TokenId) -> bool {
        self.first_token_on_line(self.tokens[id].line) == Some(id)
    }

    /// A line with no text that no multi-line token runs through
    pub fn is_blank_line(&self, line: u32) -> bool {
        let covered = self.covered.get(line as usize).copied().unwrap_or(false);
        !covered && self.line(line).map_or(true, SourceLine::is_blank)
    }

    /// A comment token whose last line is `line`
    pub fn comment_ending_on(&self, line: u32) -> Option<TokenId> {
        self.tokens
            .iter()
            .position(|t| t.is_comment() && t.end_line == line)
    }

    /// Comment directly in front of `id` that ends at most one line above it
    pub fn leading_comment(&self, id: TokenId) -> Option<TokenId> {
        let prev = id.checked_sub(1)?;
        let token = &self.tokens[prev];
        (token.is_comment() && token.end_line + 1 >= self.tokens[id].line).then_some(prev)
    }

    pub fn functions(&self) -> impl Iterator<Item = (DeclId, &Function)> + '_ {
        self.decls
            .iter()
            .enumerate()
            .filter_map(|(id, d)| d.as_function().map(|f| (id, f)))
    }

    pub fn function_defs(&self) -> impl Iterator<Item = (DeclId, &Function)> + '_ {
        self.decls.iter().enumerate().filter_map(|(id, d)| match d {
            DeclNode::FunctionDef(f) => Some((id, f)),
            _ => None,
        })
    }

    pub fn macros(&self) -> impl Iterator<Item = &Macro> + '_ {
        self.decls.iter().filter_map(|d| match d {
            DeclNode::Macro(m) => Some(m),
            _ => None,
        })
    }

    /// Headers named by `#include "..."`
    pub fn local_includes(&self) -> Vec<String> {
        self.tokens
            .iter()
            .filter(|t| t.is_directive())
            .filter_map(|t| {
                let rest = directive_body(&t.text, "include")?;
                let rest = rest.strip_prefix('"')?;
                rest.find('"').map(|end| rest[..end].to_string())
            })
            .collect()
    }
}

/// Text after `#<name>` with surrounding whitespace removed
fn directive_body<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let rest = text.strip_prefix('#')?.trim_start();
    let rest = rest.strip_prefix(name)?;
    if rest.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    Some(rest.trim_start())
}

fn identifier_prefix(text: &str) -> &str {
    let end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    &text[..end]
}

/// One `MacroDef` per `#define`
fn macros(tokens: &[Token]) -> Vec<DeclNode> {
    let mut out = Vec::new();
    let mut guard_candidate: Option<String> = None;
    for (id, token) in tokens.iter().enumerate() {
        if token.is_comment() {
            continue;
        }
        if !token.is_directive() {
            guard_candidate = None;
            continue;
        }
        if let Some(rest) = directive_body(&token.text, "ifndef") {
            guard_candidate = Some(identifier_prefix(rest).to_string());
            continue;
        }
        let Some(rest) = directive_body(&token.text, "define") else {
            guard_candidate = None;
            continue;
        };
        let name = identifier_prefix(rest);
        if name.is_empty() {
            guard_candidate = None;
            continue;
        }
        let offset = token.text.len() - rest.len();
        let function_like = rest[name.len()..].starts_with('(');
        out.push(DeclNode::Macro(Macro {
            header: DeclHeader {
                name: Some(name.to_string()),
                name_token: Some(id),
                parent: None,
                depth: 0,
                line: token.line,
                span: TokenSpan::new(id, id),
            },
            name_column: token.column + token.text[..offset].chars().count() as u32,
            function_like,
            header_guard: guard_candidate.as_deref() == Some(name),
        }));
        guard_candidate = None;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> SourceFile {
        SourceFile::parse("demo.c", content, &RuleConfig::default()).unwrap()
    }

    #[test]
    fn test_macros_and_guards() {
        let file = parse("#ifndef DEMO_H\n#define DEMO_H\n\n#  define MAX(a, b) a\n#define lower 1\n#endif\n");
        let macros: Vec<&Macro> = file.macros().collect();
        assert_eq!(macros.len(), 3);
        assert!(macros[0].header_guard);
        assert_eq!(macros[1].header.name.as_deref(), Some("MAX"));
        assert!(macros[1].function_like);
        assert_eq!(macros[1].name_column, 11);
        assert!(!macros[2].header_guard);
        assert_eq!(macros[2].header.line, 5);
    }

    #[test]
    fn test_line_queries() {
        let file = parse("int a; /* one\n\ntwo */\n\nint b;\n");
        assert!(!file.is_blank_line(2));
        assert!(file.is_blank_line(4));
        assert_eq!(file.comment_ending_on(3), Some(3));
        let b = file.first_token_on_line(5).unwrap();
        assert_eq!(file.token(b).text, "int");
        assert!(file.starts_line(b));
        assert_eq!(file.prev_code(b).map(|i| file.token(i).text.clone()), Some(";".into()));
    }

    #[test]
    fn test_local_includes() {
        let file = parse("#include <stdio.h>\n#include \"list.h\"\n# include \"util/str.h\"\n");
        assert_eq!(file.local_includes(), vec!["list.h", "util/str.h"]);
    }

    #[test]
    fn test_malformed_literal_is_recovered() {
        let file = SourceFile::parse("broken.c", "char *s = \"open;\nint b;\n", &RuleConfig::default()).unwrap();
        assert_eq!(file.problems.len(), 1);
        assert!(file.first_token_on_line(2).is_some());
        let err = file.first_problem().unwrap();
        assert!(matches!(err, NettError::Lex { ref file, line: 1, .. } if file == "broken.c"));
    }

    #[test]
    fn test_known_types_from_headers() {
        let known: HashSet<String> = ["Widget".to_string()].into_iter().collect();
        let file = SourceFile::parse_with_types("w.c", "void f(void) {\n    Widget *w;\n}\n", &RuleConfig::default(), &known).unwrap();
        let locals = file.decls.iter().filter_map(|d| d.as_variable()).count();
        assert_eq!(locals, 1);
    }
}
