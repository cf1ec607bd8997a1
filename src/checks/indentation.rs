//! Block and continuation indentation
//!
//! Levels are counted in units of `indent_width`. File scope is level 0, a
//! block's statements sit one level below the construct that opened it, and
//! any wrapped line of a statement sits `continuation_indent` past the
//! statement's own indent.

use super::{CheckContext, StyleCheck};
use crate::domain::{Category, DiagnosticEngine};
use crate::source::{Block, DeclId, DeclNode, SimpleKind, SourceFile, Stmt, TokenId};
use std::collections::BTreeMap;

/// Interior of a `{ ... }` pair, closing brace included
type Hole = (TokenId, TokenId);

fn tag_braces(decl: &DeclNode) -> Option<(TokenId, TokenId)> {
    match decl {
        DeclNode::Struct(r) | DeclNode::Union(r) => r.braces,
        DeclNode::Enum(e) => e.braces,
        _ => None,
    }
}

struct Visitor<'a> {
    file: &'a SourceFile,
    out: &'a mut DiagnosticEngine,
    unit: u32,
    continuation: u32,
    /// Defined records and enums, keyed by their keyword
    tags: BTreeMap<TokenId, DeclId>,
}

impl<'a> Visitor<'a> {
    fn new(ctx: &'a CheckContext<'a>, out: &'a mut DiagnosticEngine) -> Self {
        let file = ctx.file;
        let tags = file
            .decls
            .iter()
            .enumerate()
            .filter(|(_, decl)| tag_braces(decl).is_some())
            .filter_map(|(id, decl)| decl.tag_keyword().map(|keyword| (keyword, id)))
            .collect();
        Self {
            file,
            out,
            unit: ctx.config.indent_width,
            continuation: ctx.config.continuation_width(),
            tags,
        }
    }

    fn expect(&mut self, id: TokenId, expected: u32) {
        let token = self.file.token(id);
        let found = token.indent();
        if found == expected {
            return;
        }
        let text = if token.is_directive() {
            token.text.split_whitespace().next().unwrap_or(&token.text)
        } else {
            token.spelling()
        };
        self.out.record(
            Category::Indentation,
            token.line,
            format!("'{text}' Expected indent of {expected} spaces, found {found}."),
        );
    }

    fn expect_level(&mut self, id: TokenId, level: u32) {
        self.expect(id, level * self.unit);
    }

    /// First tokens are checked on their own line or right after a `{`
    fn expect_first(&mut self, id: TokenId, level: u32) {
        let after_brace = self
            .file
            .prev_code(id)
            .is_some_and(|prev| self.file.token(prev).is("{"));
        if self.file.starts_line(id) || after_brace {
            self.expect_level(id, level);
        }
    }

    fn expect_close(&mut self, open: TokenId, close: Option<TokenId>, level: u32) {
        if let Some(close) = close {
            if self.file.line_of(close) != self.file.line_of(open) {
                self.expect_level(close, level);
            }
        }
    }

    /// Wrapped lines of `first..=last`, skipping the interiors in `holes`
    fn continuation(&mut self, first: TokenId, last: TokenId, level: u32, holes: &[Hole]) {
        let file = self.file;
        let expected = level * self.unit + self.continuation;
        let start = file.line_of(first);
        let end = file.token(last).end_line;
        for line in (start + 1)..=end {
            let in_hole = holes
                .iter()
                .any(|&(open, close)| file.line_of(open) < line && line < file.line_of(close));
            if file.is_blank_line(line) {
                if !in_hole {
                    self.out.record(
                        Category::Whitespace,
                        line,
                        "Line continuations should not contain blank lines.",
                    );
                }
                continue;
            }
            let Some(id) = file.first_token_on_line(line) else {
                continue;
            };
            let inside = holes.iter().any(|&(open, close)| open < id && id <= close);
            if id > first && id <= last && file.token(id).is_code() && !inside {
                self.expect(id, expected);
            }
        }
    }

    /// Outermost record and enum definitions whose keyword lies in `first..=last`
    fn tags_within(&self, first: TokenId, last: TokenId) -> Vec<(DeclId, TokenId, TokenId)> {
        let mut found = Vec::new();
        let mut covered_until: Option<TokenId> = None;
        for (&keyword, &id) in self.tags.range(first..=last) {
            if covered_until.is_some_and(|close| keyword < close) {
                continue;
            }
            if let Some((open, close)) = tag_braces(&self.file.decls[id]) {
                found.push((id, open, close));
                covered_until = Some(close);
            }
        }
        found
    }

    /// A declaration whose own indent is `level`, record bodies included
    fn declaration(&mut self, first: TokenId, last: TokenId, level: u32) {
        let tags = self.tags_within(first, last);
        for &(id, open, close) in &tags {
            self.tag_body(id, open, close, level);
        }
        let holes: Vec<Hole> = tags.iter().map(|&(_, open, close)| (open, close)).collect();
        self.continuation(first, last, level, &holes);
    }

    fn tag_body(&mut self, id: DeclId, open: TokenId, close: TokenId, level: u32) {
        let file = self.file;
        let mut members: Vec<(TokenId, TokenId)> = Vec::new();
        match &file.decls[id] {
            DeclNode::Struct(record) | DeclNode::Union(record) => {
                for &field in &record.fields {
                    let span = file.decls[field].span();
                    if !members.iter().any(|&(first, _)| first == span.first) {
                        members.push((span.first, span.last));
                    }
                }
                // standalone nested definitions are not fields
                if open + 1 < close {
                    for (nested, _, _) in self.tags_within(open + 1, close - 1) {
                        let span = file.decls[nested].span();
                        let covered = members
                            .iter()
                            .any(|&(first, last)| first <= span.first && span.first <= last);
                        if !covered {
                            members.push((span.first, span.last));
                        }
                    }
                }
            }
            DeclNode::Enum(enumeration) => {
                for &constant in &enumeration.constants {
                    let span = file.decls[constant].span();
                    members.push((span.first, span.last));
                }
            }
            _ => return,
        }
        members.sort_unstable();
        for (first, last) in members {
            self.expect_first(first, level + 1);
            self.declaration(first, last, level + 1);
        }
        self.expect_close(open, Some(close), level);
    }

    fn top_level(&mut self) {
        let file = self.file;
        let mut seen: Vec<TokenId> = Vec::new();
        for &id in &file.top_level {
            let decl = &file.decls[id];
            let span = decl.span();
            if seen.contains(&span.first) {
                continue;
            }
            seen.push(span.first);
            self.expect_first(span.first, 0);
            match decl {
                DeclNode::FunctionDef(function) => {
                    let Some(body) = &function.body else {
                        continue;
                    };
                    if let Some(header_end) = file.prev_code(body.open) {
                        self.continuation(span.first, header_end, 0, &[]);
                    }
                    self.block(body, 1);
                }
                DeclNode::EnumConstant(_) | DeclNode::Macro(_) => {}
                _ => self.declaration(span.first, span.last, 0),
            }
        }
    }

    fn directives(&mut self) {
        let file = self.file;
        for definition in file.macros() {
            if let Some(directive) = definition.header.name_token {
                self.expect(directive, 0);
            }
        }
    }

    /// Statements of `block` at `level`, its `}` one level out
    fn block(&mut self, block: &Block, level: u32) {
        for stmt in &block.stmts {
            self.stmt(stmt, level);
        }
        self.expect_close(block.open, block.close, level.saturating_sub(1));
    }

    /// Body of a control statement at `level`
    fn body(&mut self, body: &Stmt, level: u32) {
        match body {
            Stmt::Block(block) => self.block(block, level + 1),
            _ => self.stmt(body, level + 1),
        }
    }

    fn switch_body(&mut self, body: &Stmt, level: u32) {
        let Some(block) = body.as_block() else {
            self.body(body, level);
            return;
        };
        for stmt in &block.stmts {
            match stmt {
                Stmt::Case(_) | Stmt::Default(_) => self.stmt(stmt, level + 1),
                _ => self.stmt(stmt, level + 2),
            }
        }
        self.expect_close(block.open, block.close, level);
    }

    fn stmt(&mut self, stmt: &Stmt, level: u32) {
        let first = stmt.first_token();
        match stmt {
            Stmt::Simple(s) if s.kind == SimpleKind::Label => return,
            Stmt::Empty(_) => return,
            _ => self.expect_first(first, level),
        }
        match stmt {
            Stmt::Block(block) => self.block(block, level + 1),
            Stmt::If(s) => {
                self.continuation(s.keyword, s.cond.close, level, &[]);
                self.body(&s.then, level);
                if let Some(otherwise) = &s.otherwise {
                    if self.file.starts_line(otherwise.keyword) {
                        self.expect_level(otherwise.keyword, level);
                    }
                    if otherwise.is_else_if() {
                        self.stmt(&otherwise.body, level);
                    } else {
                        self.body(&otherwise.body, level);
                    }
                }
            }
            Stmt::For(s) => {
                self.continuation(s.keyword, s.header.close, level, &[]);
                self.body(&s.body, level);
            }
            Stmt::While(s) => {
                self.continuation(s.keyword, s.cond.close, level, &[]);
                self.body(&s.body, level);
            }
            Stmt::DoWhile(s) => {
                self.body(&s.body, level);
                if let Some(keyword) = s.while_keyword {
                    if self.file.starts_line(keyword) {
                        self.expect_level(keyword, level);
                    }
                    let end = s.semicolon.or(s.cond.map(|c| c.close)).unwrap_or(keyword);
                    self.continuation(keyword, end, level, &[]);
                }
            }
            Stmt::Switch(s) => {
                self.continuation(s.keyword, s.cond.close, level, &[]);
                self.switch_body(&s.body, level);
            }
            Stmt::Case(label) | Stmt::Default(label) => {
                if let Some(colon) = label.colon {
                    self.continuation(label.keyword, colon, level, &[]);
                }
                if let Some(body) = &label.body {
                    self.block(body, level + 1);
                }
            }
            Stmt::Simple(s) => self.continuation(s.first, s.semicolon.unwrap_or(s.last), level, &[]),
            Stmt::Decl(d) => self.declaration(d.first, d.last, level),
            Stmt::Empty(_) => {}
        }
    }
}

pub struct IndentationCheck;

impl StyleCheck for IndentationCheck {
    fn name(&self) -> &'static str {
        "indentation"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Indentation, Category::Whitespace]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let mut visitor = Visitor::new(ctx, out);
        visitor.directives();
        visitor.top_level();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_support::{run, run_with};
    use crate::config::ConfigBuilder;

    #[test]
    fn test_block_levels() {
        let out = run(
            &IndentationCheck,
            "blocks.c",
            "int main(void)\n\
             {\n\
             \x20     int x = 0;\n\
             \x20   for (x = 0; x < 3; x++) {\n\
             \x20           x++;\n\
             \x20     }\n\
             \x20   if (x)\n\
             \x20       x--;\n\
             \x20   else\n\
             \x20      x++;\n\
             \x20   do\n\
             \x20       x++;\n\
             \x20     while (x < 9);\n\
             \x20   return x;\n\
             \x20}\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 3: [INDENTATION] 'int' Expected indent of 4 spaces, found 6.",
                "Line 5: [INDENTATION] 'x' Expected indent of 8 spaces, found 12.",
                "Line 6: [INDENTATION] '}' Expected indent of 4 spaces, found 6.",
                "Line 10: [INDENTATION] 'x' Expected indent of 8 spaces, found 7.",
                "Line 13: [INDENTATION] 'while' Expected indent of 4 spaces, found 6.",
                "Line 15: [INDENTATION] '}' Expected indent of 0 spaces, found 1.",
            ]
        );
    }

    #[test]
    fn test_switch_labels_and_case_blocks() {
        let out = run(
            &IndentationCheck,
            "switch.c",
            "void pick(int x)\n\
             {\n\
             \x20   switch (x) {\n\
             \x20       case 1:\n\
             \x20           x++;\n\
             \x20           break;\n\
             \x20         case 2: {\n\
             \x20           x--;\n\
             \x20         }\n\
             \x20       default:\n\
             \x20             x = 0;\n\
             \x20   }\n\
             }\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 7: [INDENTATION] 'case' Expected indent of 8 spaces, found 10.",
                "Line 9: [INDENTATION] '}' Expected indent of 8 spaces, found 10.",
                "Line 11: [INDENTATION] 'x' Expected indent of 12 spaces, found 14.",
            ]
        );
    }

    #[test]
    fn test_file_scope_and_continuations() {
        let out = run(
            &IndentationCheck,
            "scope.c",
            "#define LIMIT 3\n\
             \x20 #define OTHER 4\n\
             struct Point {\n\
             \x20   int x;\n\
             \x20     int y;\n\
             };\n\
             \n\
             typedef enum {\n\
             \x20   RED,\n\
             \x20    GREEN\n\
             } Color;\n\
             \n\
             \x20int total = LIMIT +\n\
             \x20   OTHER;\n\
             \n\
             int add(int a,\n\
             \x20       int b)\n\
             {\n\
             \x20   return a +\n\
             \n\
             \x20         b;\n\
             }\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 2: [INDENTATION] '#define' Expected indent of 0 spaces, found 2.",
                "Line 5: [INDENTATION] 'int' Expected indent of 4 spaces, found 6.",
                "Line 10: [INDENTATION] 'GREEN' Expected indent of 4 spaces, found 5.",
                "Line 13: [INDENTATION] 'int' Expected indent of 0 spaces, found 1.",
                "Line 14: [INDENTATION] 'OTHER' Expected indent of 8 spaces, found 4.",
                "Line 20: [WHITESPACE] Line continuations should not contain blank lines.",
                "Line 21: [INDENTATION] 'b' Expected indent of 12 spaces, found 10.",
            ]
        );
    }

    #[test]
    fn test_local_records_and_typedefs() {
        let out = run(
            &IndentationCheck,
            "local.c",
            "void shapes(void)\n\
             {\n\
             \x20   struct Box {\n\
             \x20       int w;\n\
             \x20        struct {\n\
             \x20           int d;\n\
             \x20       } inner;\n\
             \x20     };\n\
             \x20   typedef unsigned long\n\
             \n\
             \x20      Size;\n\
             }\n",
        );
        assert_eq!(
            out,
            vec![
                "Line 5: [INDENTATION] 'struct' Expected indent of 8 spaces, found 9.",
                "Line 8: [INDENTATION] '}' Expected indent of 4 spaces, found 6.",
                "Line 10: [WHITESPACE] Line continuations should not contain blank lines.",
                "Line 11: [INDENTATION] 'Size' Expected indent of 12 spaces, found 7.",
            ]
        );
    }

    #[test]
    fn test_first_statement_after_brace_on_same_line() {
        let out = run(&IndentationCheck, "inline.c", "int main(){ int x;\n    return 0;\n}\n");
        assert_eq!(
            out,
            vec!["Line 1: [INDENTATION] 'int' Expected indent of 4 spaces, found 12."]
        );
    }

    #[test]
    fn test_configured_widths() {
        // continuation follows the indent width when not set
        let config = ConfigBuilder::new().indent_width(2).build().unwrap();
        let out = run_with(
            &IndentationCheck,
            "narrow.c",
            "int f(int a)\n{\n  if (a &&\n      a > 1) {\n      return 1;\n  }\n  return 0;\n}\n",
            &config,
        );
        assert_eq!(
            out,
            vec!["Line 5: [INDENTATION] 'return' Expected indent of 4 spaces, found 6."]
        );
    }
}
