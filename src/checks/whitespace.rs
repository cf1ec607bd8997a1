//! Spacing between tokens
//!
//! Operator spacing comes from [`SPACING_CONTRACTS`], keyed by the role the
//! token plays in its expression. Control statements, function headers,
//! records and declarations have fixed shapes on top of that. Every gap is
//! measured on one line only; a construct split across lines either has its
//! own diagnostic or is left alone.

use super::{plural, CheckContext, StyleCheck};
use crate::domain::{Category, DiagnosticEngine};
use crate::source::{
    CallSite, DeclNode, EnumDecl, Function, Parens, Record, SourceFile, Stmt, TokenId, TokenRole,
    VarKind, Variable,
};

/// What to report when an operand sits on another line than its operator
#[derive(Clone, Copy)]
enum Split {
    Allowed,
    Before(fn(&str) -> String),
    After(fn(&str) -> String),
}

/// Expected spaces on each side of an operator playing `role`
#[derive(Clone, Copy)]
struct SpacingContract {
    role: TokenRole,
    before: Option<u32>,
    after: Option<u32>,
    split: Split,
}

fn prefix_shape(op: &str) -> String {
    format!("Unary operators should look like: {op}X")
}

fn postfix_shape(op: &str) -> String {
    format!("Unary operators should look like: X{op}")
}

fn member_shape(op: &str) -> String {
    format!("Member accesses should look like: X{op}a")
}

const SPACING_CONTRACTS: &[SpacingContract] = &[
    SpacingContract {
        role: TokenRole::Binary,
        before: Some(1),
        after: Some(1),
        split: Split::Allowed,
    },
    SpacingContract {
        role: TokenRole::Comma,
        before: Some(0),
        after: Some(1),
        split: Split::Allowed,
    },
    SpacingContract {
        role: TokenRole::TernaryQuestion,
        before: Some(1),
        after: Some(1),
        split: Split::Allowed,
    },
    SpacingContract {
        role: TokenRole::TernaryColon,
        before: Some(1),
        after: Some(1),
        split: Split::Allowed,
    },
    SpacingContract {
        role: TokenRole::Prefix,
        before: None,
        after: Some(0),
        split: Split::After(prefix_shape),
    },
    SpacingContract {
        role: TokenRole::Postfix,
        before: Some(0),
        after: None,
        split: Split::Before(postfix_shape),
    },
    SpacingContract {
        role: TokenRole::Member,
        before: Some(0),
        after: Some(0),
        split: Split::Before(member_shape),
    },
];

fn contract_for(role: TokenRole) -> Option<&'static SpacingContract> {
    SPACING_CONTRACTS.iter().find(|c| c.role == role)
}

/// Tokens that never need a space next to them inside a declaration
const TIGHT: &[&str] = &[
    "[", "]", "(", ")", "{", "}", ".", ",", ";", "*", "&", "+", "-", "->", "~", "!", "--", "++",
    "^", ":",
];

const STATEMENT_SEMICOLON: &str = "Semicolons should be on the same line as the end of a statement.";
const DECLARATION_SEMICOLON: &str =
    "Semicolons should be on the same line as the end of a declaration.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PointerStyle {
    /// `int* p`
    Left,
    /// `int *p`
    Right,
}

pub struct WhitespaceCheck;

struct Spacing<'a> {
    file: &'a SourceFile,
    out: &'a mut DiagnosticEngine,
    /// Fixed by the first aligned pointer of the file
    style: Option<PointerStyle>,
}

impl<'a> Spacing<'a> {
    fn report(&mut self, line: u32, message: impl Into<String>) {
        self.out.record(Category::Whitespace, line, message);
    }

    fn text(&self, id: TokenId) -> &'a str {
        let file: &'a SourceFile = self.file;
        &file.token(id).text
    }

    fn line(&self, id: TokenId) -> u32 {
        self.file.line_of(id)
    }

    /// Whether `right` starts on the line `left` ends on
    fn same_line(&self, left: TokenId, right: TokenId) -> bool {
        self.file.token(left).end_line == self.file.token(right).line
    }

    /// Compare the spaces between two tokens on one line with `expected`
    fn gap(&mut self, left: TokenId, right: TokenId, expected: u32) {
        if !self.same_line(left, right) {
            return;
        }
        let (l, r) = (self.file.token(left), self.file.token(right));
        let found = r.column.saturating_sub(l.end_column);
        if found != expected {
            self.out.record_at(
                Category::Whitespace,
                r.line,
                r.column,
                format!(
                    "'{}' at position {}, expected {} space{}, found {}",
                    r.spelling(),
                    r.column,
                    expected,
                    plural(expected),
                    found
                ),
            );
        }
    }

    /// `;` on the line of whatever it terminates, directly after it
    fn semicolon(&mut self, semi: TokenId, message: &str) {
        let Some(prev) = semi.checked_sub(1) else {
            return;
        };
        if self.same_line(prev, semi) {
            self.gap(prev, semi, 0);
        } else {
            self.report(self.line(semi), message);
        }
    }

    // ---- operators ----

    fn operators(&mut self) {
        let count = self.file.tokens.len();
        for id in 0..count {
            let Some(contract) = contract_for(self.file.role(id)) else {
                continue;
            };
            let op = self.text(id);
            if let (Some(expected), Some(left)) = (contract.before, id.checked_sub(1)) {
                if self.same_line(left, id) {
                    self.gap(left, id, expected);
                } else if let Split::Before(shape) = contract.split {
                    self.report(self.line(id), shape(op));
                }
            }
            let right = id + 1;
            if let (Some(expected), true) = (contract.after, right < count) {
                if self.file.token(right).is_comment() {
                    continue;
                }
                if self.same_line(id, right) {
                    self.gap(id, right, expected);
                } else if let Split::After(shape) = contract.split {
                    self.report(self.line(id), shape(op));
                }
            }
        }
    }

    // ---- statements ----

    /// `kw (`: one space, on one line
    fn keyword_paren(&mut self, keyword: TokenId, open: TokenId, message: &str) {
        if self.same_line(keyword, open) {
            self.gap(keyword, open, 1);
        } else {
            self.report(self.line(keyword), message);
        }
    }

    /// Contents hug their parentheses
    fn parens(&mut self, parens: Parens) {
        let Parens { open, close } = parens;
        let first = open + 1;
        if first <= close && self.same_line(open, first) {
            self.gap(open, first, 0);
        }
        let last = close - 1;
        if last > open {
            if self.same_line(last, close) {
                self.gap(last, close, 0);
            } else {
                self.report(self.line(close), "Closing parentheses should look like: ...X)");
            }
        }
    }

    fn brace_after(&mut self, before: TokenId, body: &Stmt) {
        if let Some(block) = body.as_block() {
            self.gap(before, block.open, 1);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::If(s) => {
                self.keyword_paren(s.keyword, s.cond.open, "If statements should look like: if (cond...");
                self.parens(s.cond);
                self.brace_after(s.cond.close, &s.then);
                if let Some(otherwise) = &s.otherwise {
                    if let Some(close) = s.then.as_block().and_then(|b| b.close) {
                        self.gap(close, otherwise.keyword, 1);
                    }
                    match otherwise.body.as_ref() {
                        Stmt::If(inner) => {
                            if self.same_line(otherwise.keyword, inner.keyword) {
                                self.gap(otherwise.keyword, inner.keyword, 1);
                            } else {
                                self.report(
                                    self.line(otherwise.keyword),
                                    "else-if statements should look like: } else if (cond...",
                                );
                            }
                        }
                        body => self.brace_after(otherwise.keyword, body),
                    }
                }
            }
            Stmt::For(s) => {
                self.keyword_paren(s.keyword, s.header.open, "For loops should look like: for (...");
                self.parens(s.header);
                self.for_header(s.header, s.first_semi, s.second_semi);
                self.brace_after(s.header.close, &s.body);
            }
            Stmt::While(s) => {
                self.keyword_paren(s.keyword, s.cond.open, "While loops should look like: while (...");
                self.parens(s.cond);
                self.brace_after(s.cond.close, &s.body);
            }
            Stmt::Switch(s) => {
                self.keyword_paren(
                    s.keyword,
                    s.cond.open,
                    "Switch statements should look like: switch (...",
                );
                self.parens(s.cond);
                self.brace_after(s.cond.close, &s.body);
            }
            Stmt::DoWhile(s) => {
                self.brace_after(s.keyword, &s.body);
                let close = s.body.as_block().and_then(|b| b.close);
                if let (Some(close), Some(keyword)) = (close, s.while_keyword) {
                    self.gap(close, keyword, 1);
                }
                if let (Some(keyword), Some(cond)) = (s.while_keyword, s.cond) {
                    if self.same_line(keyword, cond.open) {
                        self.gap(keyword, cond.open, 1);
                    } else {
                        self.report(
                            self.line(cond.open),
                            "Do-While loop conditions should look like: while (...",
                        );
                    }
                    self.parens(cond);
                    if let Some(semi) = s.semicolon {
                        if self.same_line(cond.close, semi) {
                            self.gap(cond.close, semi, 0);
                        } else {
                            self.report(
                                self.line(cond.close),
                                "Do-While loop conditions should look like: ...);",
                            );
                        }
                    }
                }
            }
            Stmt::Case(label) => {
                if let Some((first, last)) = label.value {
                    if self.same_line(label.keyword, first) {
                        self.gap(label.keyword, first, 1);
                    } else {
                        self.report(self.line(label.keyword), "Case statements should look like: case X:");
                    }
                    if let Some(colon) = label.colon {
                        if self.same_line(last, colon) {
                            self.gap(last, colon, 0);
                        } else {
                            self.report(self.line(last), "Case expressions should look like: case X:");
                        }
                    }
                }
                if let (Some(colon), Some(body)) = (label.colon, &label.body) {
                    self.gap(colon, body.open, 1);
                }
            }
            Stmt::Default(label) => {
                if let (Some(colon), Some(body)) = (label.colon, &label.body) {
                    self.gap(colon, body.open, 1);
                }
            }
            Stmt::Simple(simple) => {
                if let Some(semi) = simple.semicolon {
                    self.semicolon(semi, STATEMENT_SEMICOLON);
                }
            }
            Stmt::Decl(decl) => {
                if let Some(semi) = decl.semicolon {
                    self.semicolon(semi, STATEMENT_SEMICOLON);
                }
            }
            Stmt::Block(_) | Stmt::Empty(_) => {}
        }
    }

    fn for_header(&mut self, header: Parens, first_semi: Option<TokenId>, second_semi: Option<TokenId>) {
        let Some(first_semi) = first_semi else {
            return;
        };
        if let Some(init_end) = self.file.prev_code(first_semi).filter(|&id| id > header.open) {
            if self.same_line(init_end, first_semi) {
                self.gap(init_end, first_semi, 0);
            } else {
                self.report(
                    self.line(init_end),
                    "For loop initialisers should look like: for (init; ...",
                );
            }
        }
        let Some(second_semi) = second_semi else {
            return;
        };
        let file = self.file;
        let mut condition = file.code_between(first_semi, second_semi);
        match (condition.next(), condition.last()) {
            (Some(cond_first), cond_last) => {
                let cond_last = cond_last.unwrap_or(cond_first);
                self.gap(first_semi, cond_first, 1);
                if self.same_line(cond_last, second_semi) {
                    self.gap(cond_last, second_semi, 0);
                } else {
                    self.report(
                        self.line(cond_last),
                        "For loop conditions should look like: for (...; cond; ...",
                    );
                }
            }
            (None, _) => {
                if self.same_line(first_semi, second_semi) {
                    self.gap(first_semi, second_semi, 0);
                } else {
                    self.report(
                        self.line(first_semi),
                        "Missing for loop conditions should look like: for (...;; ...",
                    );
                }
            }
        }
    }

    // ---- functions ----

    fn function(&mut self, function: &Function) {
        if let Some(semi) = function.semicolon {
            self.semicolon(semi, DECLARATION_SEMICOLON);
        }
        let Some(name) = function.header.name_token else {
            return;
        };
        let begin = function.header.span.first;
        if self.line(begin) != self.line(name) {
            self.report(
                self.line(begin),
                "A function's return type should be on the same line as its name.",
            );
        }
        if function.declarator.group.is_some() {
            return;
        }
        let Some(params) = function.param_parens() else {
            return;
        };
        if self.same_line(name, params.open) {
            self.gap(name, params.open, 0);
        } else {
            self.report(
                self.line(params.open),
                "Function declarations should look like func_name(...",
            );
        }
        self.parens(params);
        self.separators(params.open, params.close);
    }

    fn call(&mut self, call: &CallSite) {
        let CallSite { name, parens } = *call;
        if self.same_line(name, parens.open) {
            self.gap(name, parens.open, 0);
        } else {
            self.report(self.line(name), "Function calls should look like: func_call(...");
        }
        self.parens(parens);
    }

    /// Commas directly inside a bracket pair: none before, one after
    fn separators(&mut self, open: TokenId, close: TokenId) {
        let mut id = open + 1;
        while id < close {
            let token = self.file.token(id);
            if token.is("(") || token.is("[") || token.is("{") {
                id = self.file.partner(id).map_or(id + 1, |p| p + 1);
                continue;
            }
            if token.is(",") {
                self.comma(id);
            }
            id += 1;
        }
    }

    fn comma(&mut self, comma: TokenId) {
        self.gap(comma - 1, comma, 0);
        let next = comma + 1;
        if next < self.file.tokens.len() && !self.file.token(next).is_comment() {
            self.gap(comma, next, 1);
        }
    }

    // ---- records and enums ----

    /// `;` after the closing brace of a record or enum
    fn tag_terminator(&mut self, close: TokenId) {
        let mut id = close;
        while let Some(next) = self.file.next_code(id) {
            let token = self.file.token(next);
            if token.is(";") {
                self.semicolon(next, DECLARATION_SEMICOLON);
                return;
            }
            if token.is("{") || token.is("}") {
                return;
            }
            id = next;
        }
    }

    /// `kw Name {` with single spaces
    fn tag_head(&mut self, keyword: TokenId, name: Option<TokenId>, open: TokenId, message: &str) {
        let before_brace = match name {
            Some(name) => {
                if self.same_line(keyword, name) {
                    self.gap(keyword, name, 1);
                } else {
                    self.report(self.line(keyword), message);
                }
                name
            }
            None => keyword,
        };
        self.gap(before_brace, open, 1);
    }

    fn record(&mut self, record: &Record, union: bool) {
        let Some((open, close)) = record.braces else {
            return;
        };
        let message = if union {
            "Unions should look like: union X"
        } else {
            "Structs should look like: struct X"
        };
        self.tag_head(record.keyword, record.header.name_token, open, message);
        for &field in &record.fields {
            let Some(field) = self.file.decls[field].as_variable() else {
                continue;
            };
            if field.ty.record || field.ty.enumeration {
                continue;
            }
            if let Some(semi) = field.semicolon {
                self.semicolon(semi, DECLARATION_SEMICOLON);
            }
        }
        self.tag_terminator(close);
    }

    fn enumeration(&mut self, decl: &EnumDecl) {
        let Some((open, close)) = decl.braces else {
            return;
        };
        if let Some(typedef) = decl.typedef_keyword {
            if self.same_line(typedef, decl.keyword) {
                self.gap(typedef, decl.keyword, 1);
            } else {
                self.report(self.line(typedef), "Typedef'd enums should look like: typedef enum ...");
            }
        }
        self.tag_head(decl.keyword, decl.header.name_token, open, "Enums should look like: enum X");
        self.separators(open, close);
        self.tag_terminator(close);
    }

    // ---- declarations ----

    /// Last token of a declarator that starts at `start`
    fn declarator_end(&self, start: TokenId, limit: TokenId) -> TokenId {
        let mut end = start;
        let mut id = start;
        while id <= limit {
            let token = self.file.token(id);
            if !token.is_code() {
                id += 1;
                continue;
            }
            if token.is(",") || token.is(";") || token.is("=") {
                break;
            }
            end = id;
            if token.is("(") || token.is("[") {
                match self.file.partner(id) {
                    Some(partner) if partner <= limit => {
                        end = partner;
                        id = partner;
                    }
                    _ => break,
                }
            }
            id += 1;
        }
        end
    }

    fn variable(&mut self, var: &Variable) {
        let span = var.header.span;
        let mut start = span.first;
        if let Some(name) = var.header.name_token {
            // later declarators of `int a = 1, b = 2;` start at their own name
            let assigned = (span.first..name).any(|id| self.file.token(id).is("="));
            if assigned {
                start = name;
            }
        }

        let end = match var.initializer {
            Some(init) => {
                if let Some(lhs) = init.equals.checked_sub(1) {
                    self.gap(lhs, init.equals, 1);
                }
                if let Some(value) = init.value {
                    self.gap(init.equals, value.first, 1);
                    self.scan(value.first, value.last, false);
                }
                self.file.prev_code(init.equals).unwrap_or(start)
            }
            None => {
                let from = var.header.name_token.unwrap_or(start);
                self.declarator_end(from, span.last)
            }
        };
        if end > start {
            self.scan(start, end, true);
        }

        if var.kind == VarKind::Global {
            if let Some(semi) = var.semicolon {
                self.semicolon(semi, DECLARATION_SEMICOLON);
            }
        }
    }

    /// Pairwise spacing over the code tokens of `first..=last`
    fn scan(&mut self, first: TokenId, last: TokenId, pointers: bool) {
        let ids: Vec<TokenId> = (first..=last).filter(|&id| self.file.token(id).is_code()).collect();
        if pointers {
            self.pointer_runs(&ids);
        }
        for pair in ids.windows(2) {
            let (cur, next) = (pair[0], pair[1]);
            if next != cur + 1 {
                continue;
            }
            let (a, b) = (self.text(cur), self.text(next));
            let same = self.same_line(cur, next);

            match (a, b) {
                ("[", "]") if !same => self.report(self.line(cur), "Empty brackets should look like: []"),
                ("[", _) if !same => {
                    self.report(self.line(cur), "Opening brackets should look like: [X...")
                }
                (_, "]") if !same => {
                    self.report(self.line(next), "Closing brackets should look like: ...X]")
                }
                (_, "[") if !same => {
                    self.report(self.line(next), "Opening brackets should look like: ...X[")
                }
                ("[", _) | (_, "]") | (_, "[") => self.gap(cur, next, 0),
                _ => {}
            }

            match (a, b) {
                ("(", _) => self.gap(cur, next, 0),
                (")", "(") if !same => self.report(
                    self.line(next),
                    "Function pointer parentheses should look like: ...)(...",
                ),
                (")", "(") => self.gap(cur, next, 0),
                (_, ")") if !same => {
                    self.report(self.line(next), "Closing parentheses should look like: ...X)")
                }
                (_, ")") => self.gap(cur, next, 0),
                _ => {}
            }

            match (a, b) {
                (_, ",") if !same => self.report(self.line(next), "Commas should look like: X,"),
                (_, ",") => self.gap(cur, next, 0),
                (",", _) => self.gap(cur, next, 1),
                _ => {}
            }

            match (a, b) {
                ("{", "}") if !same => {
                    self.report(self.line(cur), "Empty curly braces should look like: {}")
                }
                ("{", "}") => self.gap(cur, next, 0),
                // nested initializer lists
                ("," | "{", "{") => {}
                ("{", _) | (_, "}") => self.gap(cur, next, 0),
                (_, "{") if !same => {
                    self.report(self.line(next), "Opening braces should look like: ...X {")
                }
                (_, "{") => self.gap(cur, next, 1),
                _ => {}
            }

            if !TIGHT.contains(&a) && !TIGHT.contains(&b) {
                self.gap(cur, next, 1);
            }
        }
    }

    /// Alignment of every run of `*` outside brackets
    fn pointer_runs(&mut self, ids: &[TokenId]) {
        let mut depth = 0u32;
        let mut i = 0;
        while i < ids.len() {
            let text = self.text(ids[i]);
            if text == "[" {
                depth += 1;
            } else if text == "]" {
                depth = depth.saturating_sub(1);
            }
            if text != "*" || depth > 0 {
                i += 1;
                continue;
            }
            let start = i;
            while i + 1 < ids.len() && self.text(ids[i + 1]) == "*" {
                i += 1;
            }
            let prev = start.checked_sub(1).map(|p| ids[p]);
            let next = ids.get(i + 1).copied();
            self.pointer_run(prev, &ids[start..=i], next);
            i += 1;
        }
    }

    fn pointer_run(&mut self, prev: Option<TokenId>, stars: &[TokenId], next: Option<TokenId>) {
        let (Some(&first), Some(&last)) = (stars.first(), stars.last()) else {
            return;
        };
        for pair in stars.windows(2) {
            if self.same_line(pair[0], pair[1]) {
                self.gap(pair[0], pair[1], 0);
            } else {
                self.report(self.line(pair[0]), "Pointers should not be split across lines.");
            }
        }
        let (Some(prev), Some(next)) = (prev, next) else {
            return;
        };
        if !self.same_line(prev, first) {
            self.report(self.line(first), "Pointers should look like this: X*");
            return;
        }
        if !self.same_line(last, next) {
            self.report(self.line(last), "Pointers should look like this: *X");
            return;
        }
        if prev + 1 != first || last + 1 != next {
            return;
        }
        match (self.text(prev), self.text(next)) {
            // `(*name)` of a function pointer, `, *b` of a later declarator
            ("(" | ",", _) => {
                self.gap(last, next, 0);
                return;
            }
            (_, ")" | ",") => return,
            _ => {}
        }

        let before = self.file.token(first).column - self.file.token(prev).end_column;
        let after = self.file.token(next).column - self.file.token(last).end_column;
        let style = match (before, after) {
            (0, 0) => {
                self.report(self.line(first), "Pointers should be a* b or a *b, not a*b.");
                return;
            }
            (0, _) => PointerStyle::Left,
            (_, 0) => PointerStyle::Right,
            _ => {
                self.report(self.line(first), "Pointers should be a* b or a *b, not a * b.");
                return;
            }
        };
        match self.style {
            None => self.style = Some(style),
            Some(fixed) if fixed != style => self.report(
                self.line(first),
                "Pointers should consistently be a* b or a *b, not a mix.",
            ),
            Some(_) => {}
        }
    }
}

impl StyleCheck for WhitespaceCheck {
    fn name(&self) -> &'static str {
        "whitespace"
    }

    fn categories(&self) -> &'static [Category] {
        &[Category::Whitespace]
    }

    fn check(&self, ctx: &CheckContext<'_>, out: &mut DiagnosticEngine) {
        let file = ctx.file;
        let mut spacing = Spacing {
            file,
            out,
            style: None,
        };

        spacing.operators();
        for call in &file.calls {
            spacing.call(call);
        }

        // pointer style is fixed in source order
        let mut variables: Vec<&Variable> = file.decls.iter().filter_map(|d| d.as_variable()).collect();
        variables.sort_by_key(|v| v.header.name_token.unwrap_or(v.header.span.first));

        for decl in &file.decls {
            match decl {
                DeclNode::FunctionDecl(function) => spacing.function(function),
                DeclNode::FunctionDef(function) => {
                    spacing.function(function);
                    if let Some(body) = &function.body {
                        body.walk(&mut |stmt| spacing.stmt(stmt));
                    }
                }
                DeclNode::Struct(record) => spacing.record(record, false),
                DeclNode::Union(record) => spacing.record(record, true),
                DeclNode::Enum(decl) => spacing.enumeration(decl),
                _ => {}
            }
        }
        for var in variables {
            spacing.variable(var);
        }
    }
}
