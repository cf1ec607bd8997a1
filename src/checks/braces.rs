//! Brace presence and placement

use super::{CheckContext, StyleCheck};
use crate::domain::{Category, DiagnosticEngine};
use crate::source::{Block, DeclNode, SourceFile, Stmt, TokenId};

pub struct BracesCheck;

/// Line the text just before `id` ends on, comments and directives included
fn previous_end_line(file: &SourceFile, id: TokenId) -> Option<u32> {
    id.checked_sub(1).map(|prev| file.token(prev).end_line)
}

struct Visitor<'a> {
    file: &'a SourceFile,
    out: &'a mut DiagnosticEngine,
}

impl Visitor<'_> {
    fn report(&mut self, line: u32, message: &str) {
        self.out.record(Category::Braces, line, message);
    }

    fn require_block<'s>(&mut self, body: &'s Stmt) -> Option<&'s Block> {
        let block = body.as_block();
        if block.is_none() {
            let line = self.file.line_of(body.first_token());
            self.report(line, "Braces are required, even for single line blocks.");
        }
        block
    }

    /// `{` must share a line with whatever precedes it
    fn brace_follows(&mut self, block: &Block, message: &str) {
        let line = self.file.line_of(block.open);
        if previous_end_line(self.file, block.open).is_some_and(|prev| prev != line) {
            self.report(line, message);
        }
    }

    fn brace_on_line_of(&mut self, block: &Block, anchor: TokenId, message: &str) {
        let line = self.file.line_of(block.open);
        if self.file.line_of(anchor) != line {
            self.report(line, message);
        }
    }

    fn open_brace_ends_line(&mut self, open: TokenId) {
        let line = self.file.line_of(open);
        if self
            .file
            .next_code(open)
            .is_some_and(|next| self.file.line_of(next) == line)
        {
            self.report(line, "Opening brace is not the last character on a line.");
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(block) => self.open_brace_ends_line(block.open),
            Stmt::If(s) => {
                if let Some(then) = self.require_block(&s.then) {
                    self.brace_follows(then, "Opening braces should look like: if (cond) {");
                }
                if let Some(otherwise) = &s.otherwise {
                    if let Some(close) = s.then.as_block().and_then(|b| b.close) {
                        let line = self.file.line_of(close);
                        if line != self.file.line_of(otherwise.keyword) {
                            self.report(line, "Closing braces should look like: } else");
                        }
                    }
                    if !otherwise.is_else_if() {
                        if let Some(body) = self.require_block(&otherwise.body) {
                            self.brace_on_line_of(
                                body,
                                otherwise.keyword,
                                "Opening braces should look like: else {",
                            );
                        }
                    }
                }
            }
            Stmt::For(s) => {
                if let Some(body) = self.require_block(&s.body) {
                    self.brace_follows(body, "Opening braces should look like: for (...;...;...) {");
                }
            }
            Stmt::While(s) => {
                if let Some(body) = self.require_block(&s.body) {
                    self.brace_follows(body, "Opening braces should look like: while (cond) {");
                }
            }
            Stmt::Switch(s) => {
                if let Some(body) = self.require_block(&s.body) {
                    self.brace_follows(body, "Opening braces should look like: switch (cond) {");
                }
            }
            Stmt::DoWhile(s) => {
                if let Some(body) = self.require_block(&s.body) {
                    self.brace_on_line_of(body, s.keyword, "Opening braces should look like: do {");
                    if let (Some(close), Some(while_keyword)) = (body.close, s.while_keyword) {
                        let line = self.file.line_of(close);
                        if line != self.file.line_of(while_keyword) {
                            self.report(line, "Closing braces should look like: } while (cond)");
                        }
                    }
                }
            }
            Stmt::Case(label) => {
                if let Some(body) = &label.body {
                    self.brace_on_line_of(body, label.keyword, "Opening braces should look like: case X: {");
                    self.open_brace_ends_line(body.open);
                }
            }
            Stmt::Default(label) => {
                if let Some(body) = &label.body {
                    self.open_brace_ends_line(body.open);
                }
            }
            Stmt::Simple(_) | Stmt::Decl(_) | Stmt::Empty(_) => {}
        }
    }

    fn function_body(&mut self, body: &Block) {
        let line = self.file.line_of(body.open);
        if let Some(params_end) = previous_end_line(self.file, body.open) {
            if line > params_end + 1 {
                self.report(
                    line,
                    "The opening brace of a function should be at most one line away from its parameters.",
                );
            }
            if line != params_end && self.file.token(body.open).column != 1 {
                self.report(
                    line,
                    "The opening brace of a function should be left-aligned if not on the same line as its parameters.",
                );
            }
        }
        self.open_brace_ends_line(body.open);
        body.walk(&mut |stmt| self.stmt(stmt));
    }

    fn tag_body(&mut self, decl: &DeclNode) {
        let (keyword, open, message) = match decl {
            DeclNode::Struct(r) => match r.braces {
                Some((open, _)) => (r.keyword, open, "Opening braces should look like: struct X {"),
                None => return,
            },
            DeclNode::Union(r) => match r.braces {
                Some((open, _)) => (r.keyword, open, "Opening braces should look like: union X {"),
                None => return,
            },
            DeclNode::Enum(e) => match e.braces {
                Some((open, _)) => (e.keyword, open, "Opening braces should look like: enum X {"),
                None => return,
            },
            _ => return,
        };
        let anchor = decl.header().name_token.unwrap_or(keyword);
        let line = self.file.line_of(open);
        if self.file.line_of(anchor) != line {
            self.report(line, message);
        }
        self.open_brace_ends_line(open);
    }
}

impl StyleCheck for BracesCheck {
    fn name(&self) -> &'static str {
        "braces"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Braces]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let mut visitor = Visitor { file: ctx.file, out };
        for decl in &ctx.file.decls {
            match decl {
                DeclNode::FunctionDef(function) => {
                    if let Some(body) = &function.body {
                        visitor.function_body(body);
                    }
                }
                DeclNode::Struct(_) | DeclNode::Union(_) | DeclNode::Enum(_) => visitor.tag_body(decl),
                _ => {}
            }
        }
    }
}
