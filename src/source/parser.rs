//! Best-effort recursive descent over the code tokens of one file
//!
//! The parser never fails. Constructs it does not recognise are skipped up to
//! the next `;` or past a balanced group so later declarations are still seen.
//! It records every expression span so operators can be classified afterwards.

use super::decls::{
    DeclHeader, DeclId, DeclNode, Declarator, EnumConstant, EnumDecl, Function, Initializer,
    Parens, Record, TokenId, TokenSpan, TypeSummary, Typedef, VarKind, Variable,
};
use super::lexer::{Token, TokenKind};
use super::roles::TokenRole;
use super::stmts::{
    Block, CaseLabel, DeclStmt, DoWhileStmt, ElseBranch, ForStmt, IfStmt, SimpleKind, SimpleStmt,
    Stmt, SwitchStmt, WhileStmt,
};
use std::collections::HashSet;

/// Built-in type specifiers
pub const TYPE_WORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "_Complex", "bool",
];

/// Qualifiers, storage classes and function specifiers
pub const QUALIFIERS: &[&str] = &[
    "const", "volatile", "restrict", "_Atomic", "static", "extern", "auto", "register", "inline",
    "_Noreturn", "_Thread_local", "__inline", "__inline__", "__restrict", "__extension__",
];

const CV_QUALIFIERS: &[&str] = &["const", "volatile", "restrict", "_Atomic"];

const WELL_KNOWN_TYPES: &[&str] = &["FILE", "va_list", "jmp_buf", "DIR", "bool"];

/// Whether an identifier names a type without further context
pub fn is_known_type_name(name: &str, typedefs: &HashSet<String>) -> bool {
    typedefs.contains(name) || name.ends_with("_t") || WELL_KNOWN_TYPES.contains(&name)
}

/// Matching bracket for every `( [ {` and `) ] }` among code tokens
pub fn bracket_partners(tokens: &[Token]) -> Vec<Option<TokenId>> {
    let mut partners = vec![None; tokens.len()];
    let mut stack: Vec<(TokenId, char)> = Vec::new();
    for (id, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Punct {
            continue;
        }
        let opener = match token.text.as_str() {
            "(" | "[" | "{" => {
                stack.push((id, token.text.chars().next().unwrap_or('(')));
                continue;
            }
            ")" => '(',
            "]" => '[',
            "}" => '{',
            _ => continue,
        };
        if let Some(depth) = stack.iter().rposition(|(_, open)| *open == opener) {
            let (open_id, _) = stack[depth];
            stack.truncate(depth);
            partners[open_id] = Some(id);
            partners[id] = Some(open_id);
        }
    }
    partners
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    File,
    Block,
    Record,
    Params,
}

#[derive(Debug, Clone, Copy)]
struct DeclCtx {
    scope: Scope,
    parent: Option<DeclId>,
    depth: u32,
}

impl DeclCtx {
    fn nested(self, scope: Scope, parent: Option<DeclId>) -> Self {
        Self {
            scope,
            parent,
            depth: self.depth + 1,
        }
    }
}

/// Declarations sharing one set of specifiers
#[derive(Debug, Default)]
struct DeclGroup {
    ids: Vec<DeclId>,
    first: Option<TokenId>,
    last: Option<TokenId>,
    semicolon: Option<TokenId>,
}

#[derive(Debug, Default)]
struct RawDeclarator {
    name: Option<TokenId>,
    stars: Vec<TokenId>,
    group: Option<Parens>,
    params: Option<Parens>,
    param_ids: Vec<DeclId>,
    array: bool,
}

impl RawDeclarator {
    fn is_function(&self) -> bool {
        self.group.is_none() && self.params.is_some() && self.name.is_some()
    }

    fn is_empty(&self) -> bool {
        self.name.is_none() && self.stars.is_empty() && self.group.is_none() && self.params.is_none()
    }
}

#[derive(Debug, Clone, Copy)]
struct TagRef {
    keyword: TokenId,
    name: Option<TokenId>,
    node: Option<DeclId>,
}

/// Everything the parser extracts from one file
#[derive(Debug, Default)]
pub struct ParsedUnit {
    pub decls: Vec<DeclNode>,
    pub top_level: Vec<DeclId>,
    pub expressions: Vec<TokenSpan>,
    pub roles: Vec<TokenRole>,
    pub typedef_names: HashSet<String>,
}

pub struct Parser<'t> {
    tokens: &'t [Token],
    partners: &'t [Option<TokenId>],
    /// Code token ids, in order
    code: Vec<TokenId>,
    /// Token id to index into `code`
    code_index: Vec<usize>,
    pos: usize,
    /// Exclusive bound on `pos`
    end: usize,
    unit: ParsedUnit,
}

impl<'t> Parser<'t> {
    pub fn new(tokens: &'t [Token], partners: &'t [Option<TokenId>]) -> Self {
        let code: Vec<TokenId> = (0..tokens.len()).filter(|&i| tokens[i].is_code()).collect();
        let mut code_index = vec![usize::MAX; tokens.len()];
        for (index, &id) in code.iter().enumerate() {
            code_index[id] = index;
        }
        let end = code.len();
        Self {
            tokens,
            partners,
            code,
            code_index,
            pos: 0,
            end,
            unit: ParsedUnit {
                roles: vec![TokenRole::Other; tokens.len()],
                ..ParsedUnit::default()
            },
        }
    }

    /// Seed typedef names declared elsewhere, e.g. in an included header
    pub fn with_typedefs(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.unit.typedef_names.extend(names);
        self
    }

    pub fn parse(mut self) -> ParsedUnit {
        let ctx = DeclCtx {
            scope: Scope::File,
            parent: None,
            depth: 0,
        };
        while self.peek().is_some() {
            if self.eat(";").is_some() {
                continue;
            }
            let before = self.pos;
            let group = self.parse_declaration(ctx);
            for id in group.ids {
                if self.unit.decls[id].header().parent.is_none() {
                    self.unit.top_level.push(id);
                }
            }
            if self.pos == before {
                self.recover();
            }
        }
        self.unit
    }

    // ---- token cursor ----

    fn peek(&self) -> Option<&'t Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<&'t Token> {
        let index = self.pos + n;
        if index < self.end {
            Some(&self.tokens[self.code[index]])
        } else {
            None
        }
    }

    fn current_id(&self) -> Option<TokenId> {
        (self.pos < self.end).then(|| self.code[self.pos])
    }

    fn previous_id(&self) -> Option<TokenId> {
        self.pos.checked_sub(1).map(|p| self.code[p])
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    fn at_keyword(&self, word: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(word))
    }

    fn bump(&mut self) -> Option<TokenId> {
        let id = self.current_id()?;
        self.pos += 1;
        Some(id)
    }

    fn eat(&mut self, text: &str) -> Option<TokenId> {
        if self.at(text) {
            self.bump()
        } else {
            None
        }
    }

    /// Code index of the partner of the current bracket, within bounds
    fn partner_pos(&self) -> Option<usize> {
        let id = self.current_id()?;
        let partner = self.partners[id]?;
        let index = self.code_index[partner];
        (index > self.pos && index < self.end).then_some(index)
    }

    /// Step over a bracketed group, landing after its closer
    fn skip_group(&mut self) -> Option<TokenId> {
        match self.partner_pos() {
            Some(close) => {
                self.pos = close + 1;
                Some(self.code[close])
            }
            None => {
                self.pos = self.end;
                None
            }
        }
    }

    fn with_end<R>(&mut self, end: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.end;
        self.end = end.min(saved);
        let result = f(self);
        self.end = saved;
        result
    }

    /// Skip to just past the next `;` or balanced group at this level
    fn recover(&mut self) {
        while let Some(token) = self.peek() {
            match token.text.as_str() {
                ";" => {
                    self.bump();
                    return;
                }
                "(" | "[" | "{" => {
                    let was_brace = token.is("{");
                    self.skip_group();
                    if was_brace {
                        self.eat(";");
                        return;
                    }
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ---- declarations ----

    fn is_type_name(&self, name: &str) -> bool {
        is_known_type_name(name, &self.unit.typedef_names)
    }

    fn is_qualifier(token: &Token) -> bool {
        QUALIFIERS.contains(&token.text.as_str())
            && matches!(token.kind, TokenKind::Keyword | TokenKind::Identifier)
    }

    fn is_type_word(token: &Token) -> bool {
        TYPE_WORDS.contains(&token.text.as_str())
            && matches!(token.kind, TokenKind::Keyword | TokenKind::Identifier)
    }

    /// An identifier at the current position acts as a type name
    fn identifier_is_type_here(&self, scope: Scope) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        if self.is_type_name(&token.text) {
            return true;
        }
        match self.peek_at(1) {
            Some(next) if next.is_identifier() => true,
            Some(next) if next.is("*") => true,
            Some(next) if Self::is_qualifier(next) => true,
            Some(next) if next.is("(") => self.peek_at(2).is_some_and(|t| t.is("*")),
            Some(next) if scope == Scope::Params => next.is(",") || next.is("["),
            None if scope == Scope::Params => true,
            _ => false,
        }
    }

    /// Whether a statement starting here is a declaration
    fn looks_like_declaration(&self) -> bool {
        let Some(first) = self.peek() else {
            return false;
        };
        if first.kind == TokenKind::Keyword {
            return first.is("typedef")
                || first.is("struct")
                || first.is("union")
                || first.is("enum")
                || Self::is_type_word(first)
                || Self::is_qualifier(first);
        }
        if !first.is_identifier() {
            return false;
        }
        if Self::is_type_word(first) || Self::is_qualifier(first) {
            return true;
        }
        let Some(second) = self.peek_at(1) else {
            return false;
        };
        if second.is_identifier() || Self::is_qualifier(second) {
            return true;
        }
        if self.is_type_name(&first.text) && (second.is("*") || second.is("(")) {
            return second.is("*") || self.peek_at(2).is_some_and(|t| t.is("*"));
        }
        if second.is("*") {
            // T *p; / T **p = ...;
            let mut n = 1;
            while self.peek_at(n).is_some_and(|t| t.is("*") || Self::is_qualifier(t)) {
                n += 1;
            }
            let named = self.peek_at(n).is_some_and(|t| t.is_identifier());
            let follows = self
                .peek_at(n + 1)
                .is_some_and(|t| matches!(t.text.as_str(), ";" | "=" | "," | "[" | ")"));
            return named && follows;
        }
        false
    }

    fn header(
        &self,
        name: Option<TokenId>,
        ctx: DeclCtx,
        first: TokenId,
        last: TokenId,
    ) -> DeclHeader {
        let line = name
            .map(|n| self.tokens[n].line)
            .unwrap_or(self.tokens[first].line);
        DeclHeader {
            name: name.map(|n| self.tokens[n].text.clone()),
            name_token: name,
            parent: ctx.parent,
            depth: ctx.depth,
            line,
            span: TokenSpan::new(first, last.max(first)),
        }
    }

    fn push(&mut self, node: DeclNode) -> DeclId {
        self.unit.decls.push(node);
        self.unit.decls.len() - 1
    }

    fn parse_declaration(&mut self, ctx: DeclCtx) -> DeclGroup {
        let mut group = DeclGroup::default();
        let Some(first) = self.current_id() else {
            return group;
        };
        group.first = Some(first);

        let spec_start = self.pos;
        let mut typedef_keyword = None;
        let mut seen_type = false;
        let mut base = TypeSummary::default();
        let mut tag: Option<TagRef> = None;

        // the type summary follows the spelling of the type's first word
        let mut spelled = false;
        while let Some(token) = self.peek() {
            if token.is_keyword("typedef") {
                typedef_keyword = self.bump();
            } else if token.is_keyword("struct") || token.is_keyword("union") || token.is_keyword("enum") {
                if !spelled {
                    base.enumeration = token.is_keyword("enum");
                    base.record = token.is_keyword("struct");
                }
                spelled = true;
                tag = Some(self.parse_tag(ctx, typedef_keyword, first));
                seen_type = true;
            } else if Self::is_type_word(token) {
                if !spelled {
                    base.char = token.is("char");
                }
                spelled = true;
                seen_type = true;
                self.bump();
            } else if Self::is_qualifier(token) {
                if CV_QUALIFIERS.contains(&token.text.as_str()) {
                    spelled = true;
                }
                self.bump();
            } else if token.text.starts_with("__attribute") || token.text == "__declspec" {
                self.bump();
                if self.at("(") {
                    self.skip_group();
                }
            } else if token.is_identifier() && !seen_type && self.identifier_is_type_here(ctx.scope) {
                spelled = true;
                seen_type = true;
                self.bump();
            } else {
                break;
            }
        }

        let specifiers = (self.pos > spec_start)
            .then(|| TokenSpan::new(self.code[spec_start], self.code[self.pos - 1]));

        // `struct X { ... };` and `struct X;`
        if self.at(";") || (ctx.scope == Scope::Params && self.peek().is_none()) {
            if let Some(tag) = tag {
                let node = tag.node.or_else(|| self.forward_tag(tag, ctx, first));
                if ctx.scope != Scope::Params {
                    let semi = self.bump();
                    if let Some(id) = node {
                        self.set_tag_terminator(id, semi);
                    }
                    group.semicolon = semi;
                }
                group.ids.extend(node);
                group.last = self.previous_id();
                return group;
            }
        }

        loop {
            let before = self.pos;
            let raw = self.parse_declarator(ctx);
            if raw.is_empty() {
                if self.pos == before {
                    break;
                }
            }

            let mut ty = base;
            ty.pointer = !raw.stars.is_empty() && raw.group.is_none();
            ty.function_pointer = raw.group.is_some();
            ty.array = raw.array;

            let declarator = Declarator {
                specifiers,
                stars: raw.stars.clone(),
                group: raw.group,
                params: raw.params,
            };
            let last_so_far = self.previous_id().unwrap_or(first);

            if raw.is_function() && typedef_keyword.is_none() {
                let function = Function {
                    header: self.header(raw.name, ctx, first, last_so_far),
                    declarator,
                    params: raw.param_ids.clone(),
                    semicolon: None,
                    body: None,
                };
                if self.at("{") && ctx.scope == Scope::File {
                    let id = self.push(DeclNode::FunctionDef(function));
                    self.adopt(&raw.param_ids, id);
                    let body_ctx = DeclCtx {
                        scope: Scope::Block,
                        parent: Some(id),
                        depth: ctx.depth + 1,
                    };
                    let block = self.parse_block(body_ctx);
                    if let DeclNode::FunctionDef(f) = &mut self.unit.decls[id] {
                        if let Some(close) = block.as_ref().and_then(|b| b.close) {
                            f.header.span.last = close;
                        }
                        f.body = block;
                    }
                    group.ids.push(id);
                    group.last = self.previous_id();
                    return group;
                }
                let id = self.push(DeclNode::FunctionDecl(function));
                self.adopt(&raw.param_ids, id);
                group.ids.push(id);
            } else if let Some(keyword) = typedef_keyword {
                let id = self.push(DeclNode::Typedef(Typedef {
                    header: self.header(raw.name, ctx, first, last_so_far),
                    keyword,
                    ty,
                    declarator,
                    target: tag.and_then(|t| t.node),
                    semicolon: None,
                }));
                if let Some(name) = raw.name {
                    self.unit.typedef_names.insert(self.tokens[name].text.clone());
                }
                group.ids.push(id);
            } else {
                let kind = match ctx.scope {
                    Scope::File => VarKind::Global,
                    Scope::Block => VarKind::Local,
                    Scope::Record => VarKind::Field,
                    Scope::Params => VarKind::Parameter,
                };
                let initializer = if self.at("=") {
                    let equals = self.bump().unwrap_or(last_so_far);
                    self.unit.roles[equals] = TokenRole::Binary;
                    let value = self.scan_expression(&[",", ";"]);
                    Some(Initializer { equals, value })
                } else {
                    None
                };
                if ctx.scope == Scope::Record && self.at(":") {
                    self.bump();
                    self.scan_expression(&[",", ";"]);
                }
                let last = self.previous_id().unwrap_or(first);
                let id = self.push(DeclNode::Variable(Variable {
                    header: self.header(raw.name, ctx, first, last),
                    kind,
                    ty,
                    declarator,
                    initializer,
                    semicolon: None,
                }));
                group.ids.push(id);
            }

            if ctx.scope != Scope::Params && self.eat(",").is_some() {
                continue;
            }
            break;
        }

        if ctx.scope != Scope::Params {
            group.semicolon = self.eat(";");
            if group.semicolon.is_none() && ctx.scope != Scope::File {
                // leave the cursor on something the caller can recover from
                while self.peek().is_some() && !self.at(";") && !self.at("}") && !self.at("{") {
                    self.bump();
                }
                group.semicolon = self.eat(";");
            }
        }
        group.last = self.previous_id();

        let terminator = group.semicolon;
        let last = group.last.unwrap_or(first);
        for &id in &group.ids {
            match &mut self.unit.decls[id] {
                DeclNode::Variable(v) => {
                    v.semicolon = terminator;
                    v.header.span.last = last;
                }
                DeclNode::FunctionDecl(f) => {
                    f.semicolon = terminator;
                    f.header.span.last = last;
                }
                DeclNode::Typedef(t) => {
                    t.semicolon = terminator;
                    t.header.span.last = last;
                }
                _ => {}
            }
        }
        group
    }

    fn adopt(&mut self, children: &[DeclId], parent: DeclId) {
        for &child in children {
            self.unit.decls[child].header_mut().parent = Some(parent);
        }
    }

    fn set_tag_terminator(&mut self, id: DeclId, semicolon: Option<TokenId>) {
        match &mut self.unit.decls[id] {
            DeclNode::Struct(r) | DeclNode::Union(r) => {
                r.semicolon = semicolon;
                if let Some(semi) = semicolon {
                    r.header.span.last = semi;
                }
            }
            DeclNode::Enum(e) => {
                e.semicolon = semicolon;
                if let Some(semi) = semicolon {
                    e.header.span.last = semi;
                }
            }
            _ => {}
        }
    }

    /// `struct X;` with no body
    fn forward_tag(&mut self, tag: TagRef, ctx: DeclCtx, first: TokenId) -> Option<DeclId> {
        let header = self.header(tag.name, ctx, first, self.previous_id().unwrap_or(first));
        let keyword = &self.tokens[tag.keyword];
        let node = if keyword.is("enum") {
            DeclNode::Enum(EnumDecl {
                header,
                keyword: tag.keyword,
                typedef_keyword: None,
                braces: None,
                constants: Vec::new(),
                semicolon: None,
            })
        } else {
            let record = Record {
                header,
                keyword: tag.keyword,
                typedef_keyword: None,
                braces: None,
                fields: Vec::new(),
                semicolon: None,
            };
            if keyword.is("union") {
                DeclNode::Union(record)
            } else {
                DeclNode::Struct(record)
            }
        };
        Some(self.push(node))
    }

    /// `struct|union|enum [Name] [{ ... }]`; only definitions become nodes here
    fn parse_tag(&mut self, ctx: DeclCtx, typedef_keyword: Option<TokenId>, first: TokenId) -> TagRef {
        let keyword = self.bump().unwrap_or(first);
        let is_enum = self.tokens[keyword].is("enum");
        let is_union = self.tokens[keyword].is("union");

        while self.peek().is_some_and(|t| t.text.starts_with("__attribute")) {
            self.bump();
            if self.at("(") {
                self.skip_group();
            }
        }
        let name = if self.peek().is_some_and(|t| t.is_identifier()) {
            self.bump()
        } else {
            None
        };

        if !self.at("{") {
            return TagRef {
                keyword,
                name,
                node: None,
            };
        }

        let open_pos = self.pos;
        let open = self.code[open_pos];
        let close_pos = self.partner_pos();
        let body_end = close_pos.unwrap_or(self.end);
        let close = close_pos.map(|c| self.code[c]);
        let header = self.header(name, ctx, first, close.unwrap_or(open));
        let id = if is_enum {
            self.push(DeclNode::Enum(EnumDecl {
                header,
                keyword,
                typedef_keyword,
                braces: close.map(|c| (open, c)),
                constants: Vec::new(),
                semicolon: None,
            }))
        } else {
            let record = Record {
                header,
                keyword,
                typedef_keyword,
                braces: close.map(|c| (open, c)),
                fields: Vec::new(),
                semicolon: None,
            };
            self.push(if is_union {
                DeclNode::Union(record)
            } else {
                DeclNode::Struct(record)
            })
        };

        self.pos = open_pos + 1;
        let child_ctx = ctx.nested(Scope::Record, Some(id));
        let children = self.with_end(body_end, |p| {
            if is_enum {
                p.parse_enum_constants(child_ctx)
            } else {
                p.parse_fields(child_ctx)
            }
        });
        self.pos = close_pos.map(|c| c + 1).unwrap_or(body_end);

        match &mut self.unit.decls[id] {
            DeclNode::Enum(e) => e.constants = children,
            DeclNode::Struct(r) | DeclNode::Union(r) => r.fields = children,
            _ => {}
        }

        TagRef {
            keyword,
            name,
            node: Some(id),
        }
    }

    fn parse_fields(&mut self, ctx: DeclCtx) -> Vec<DeclId> {
        let mut fields = Vec::new();
        while self.peek().is_some() {
            if self.eat(";").is_some() {
                continue;
            }
            let before = self.pos;
            let group = self.parse_declaration(ctx);
            for id in group.ids {
                if matches!(&self.unit.decls[id], DeclNode::Variable(v) if v.kind == VarKind::Field) {
                    fields.push(id);
                }
            }
            if self.pos == before {
                self.recover();
            }
        }
        fields
    }

    fn parse_enum_constants(&mut self, ctx: DeclCtx) -> Vec<DeclId> {
        let mut constants = Vec::new();
        while self.peek().is_some() {
            let before = self.pos;
            if self.peek().is_some_and(|t| t.is_identifier()) {
                let name = self.bump();
                let value = if self.at("=") {
                    let equals = self.bump().unwrap_or(before);
                    self.unit.roles[equals] = TokenRole::Binary;
                    let value = self.scan_expression(&[","]);
                    Some(Initializer { equals, value })
                } else {
                    None
                };
                let first = name.unwrap_or(self.code[before]);
                let last = self.previous_id().unwrap_or(first);
                let header = self.header(name, ctx, first, last);
                constants.push(self.push(DeclNode::EnumConstant(EnumConstant { header, value })));
            }
            if self.eat(",").is_none() && self.pos == before {
                self.bump();
            }
        }
        constants
    }

    fn parse_declarator(&mut self, ctx: DeclCtx) -> RawDeclarator {
        let mut raw = RawDeclarator::default();

        while self.at("*") {
            if let Some(star) = self.bump() {
                self.unit.roles[star] = TokenRole::PointerDecl;
                raw.stars.push(star);
            }
            while self.peek().is_some_and(Self::is_qualifier) {
                self.bump();
            }
        }

        if self.at("(") && self.peek_at(1).is_some_and(|t| t.is("*") || t.is("^")) {
            let open = self.current_id();
            let close_pos = self.partner_pos();
            self.bump();
            if let (Some(open), Some(close_pos)) = (open, close_pos) {
                let name = self.with_end(close_pos, |p| {
                    while p.at("*") || p.at("^") {
                        if let Some(star) = p.bump() {
                            p.unit.roles[star] = TokenRole::PointerDecl;
                            raw.stars.push(star);
                        }
                        while p.peek().is_some_and(Self::is_qualifier) {
                            p.bump();
                        }
                    }
                    let name = if p.peek().is_some_and(|t| t.is_identifier()) {
                        p.bump()
                    } else {
                        None
                    };
                    while p.at("[") {
                        p.bracket_expression();
                    }
                    name
                });
                raw.name = name;
                raw.group = Some(Parens {
                    open,
                    close: self.code[close_pos],
                });
                self.pos = close_pos + 1;
            }
        } else if self.peek().is_some_and(|t| t.is_identifier()) {
            raw.name = self.bump();
        }

        loop {
            if self.at("[") {
                raw.array = true;
                self.bracket_expression();
            } else if self.at("(") && raw.params.is_none() && (raw.name.is_some() || raw.group.is_some()) {
                // only a function's own parameters become declarations
                let register = raw.group.is_none() && ctx.scope == Scope::File;
                let param_ctx = ctx.nested(Scope::Params, None);
                if let Some((parens, ids)) = self.parse_params(param_ctx, register) {
                    raw.params = Some(parens);
                    raw.param_ids = ids;
                } else {
                    break;
                }
            } else if self.peek().is_some_and(|t| t.text.starts_with("__attribute") || t.text == "__asm__" || t.text == "asm") {
                self.bump();
                if self.at("(") {
                    self.skip_group();
                }
            } else {
                break;
            }
        }
        raw
    }

    /// `[ ... ]` with its contents recorded as an expression
    fn bracket_expression(&mut self) {
        let Some(close_pos) = self.partner_pos() else {
            self.bump();
            return;
        };
        self.bump();
        self.with_end(close_pos, |p| {
            p.scan_expression(&[]);
        });
        self.pos = close_pos + 1;
    }

    fn parse_params(&mut self, ctx: DeclCtx, register: bool) -> Option<(Parens, Vec<DeclId>)> {
        let open = self.current_id()?;
        let close_pos = self.partner_pos()?;
        self.bump();
        let arena_len = self.unit.decls.len();
        let mut ids = Vec::new();

        self.with_end(close_pos, |p| {
            while p.peek().is_some() {
                let before = p.pos;
                if p.at("...") {
                    p.bump();
                } else if p.at_keyword("void") && p.peek_at(1).is_none() {
                    p.bump();
                } else {
                    let group = p.parse_declaration(ctx);
                    ids.extend(group.ids.into_iter().filter(|&id| {
                        matches!(&p.unit.decls[id], DeclNode::Variable(_))
                    }));
                }
                if p.eat(",").is_none() {
                    if p.pos == before {
                        p.bump();
                    }
                    // skip whatever the declaration parser did not understand
                    while p.peek().is_some() && !p.at(",") {
                        if p.at("(") || p.at("[") {
                            p.skip_group();
                        } else {
                            p.bump();
                        }
                    }
                    p.eat(",");
                }
            }
        });

        if !register {
            self.unit.decls.truncate(arena_len);
            ids.clear();
        }
        self.pos = close_pos + 1;
        Some((
            Parens {
                open,
                close: self.code[close_pos],
            },
            ids,
        ))
    }

    // ---- expressions ----

    /// Consume an expression up to (not including) one of `stops` at depth 0.
    ///
    /// Brace groups are consumed only where an initializer list can start.
    fn scan_expression(&mut self, stops: &[&str]) -> Option<TokenSpan> {
        let start = self.pos;
        let mut pending_ternary = 0usize;
        while let Some(token) = self.peek() {
            let text = token.text.as_str();
            if text == ":" && pending_ternary > 0 {
                pending_ternary -= 1;
                self.bump();
                continue;
            }
            if stops.contains(&text) {
                break;
            }
            match text {
                "?" => {
                    pending_ternary += 1;
                    self.bump();
                }
                "(" | "[" => {
                    if self.partner_pos().is_none() {
                        break;
                    }
                    self.skip_group();
                }
                "{" => {
                    if !self.brace_starts_initializer() || self.partner_pos().is_none() {
                        break;
                    }
                    self.skip_group();
                }
                "}" | ";" => break,
                _ => {
                    self.bump();
                }
            }
        }
        if self.pos == start {
            return None;
        }
        let span = TokenSpan::new(self.code[start], self.code[self.pos - 1]);
        self.unit.expressions.push(span);
        Some(span)
    }

    fn brace_starts_initializer(&self) -> bool {
        let Some(prev) = self.previous_id() else {
            return false;
        };
        let token = &self.tokens[prev];
        if matches!(token.text.as_str(), "=" | "," | "(" | "{" | "return") {
            return true;
        }
        // compound literal: `(Type){ ... }`
        if token.is(")") {
            if let Some(open) = self.partners[prev] {
                let inner: Vec<&Token> = ((open + 1)..prev)
                    .map(|i| &self.tokens[i])
                    .filter(|t| t.is_code())
                    .collect();
                return !inner.is_empty()
                    && inner.iter().all(|t| {
                        Self::is_type_word(t)
                            || Self::is_qualifier(t)
                            || t.is("*")
                            || t.is_keyword("struct")
                            || t.is_keyword("union")
                            || t.is_keyword("enum")
                            || (t.is_identifier())
                    })
                    && (Self::is_type_word(inner[0])
                        || inner[0].kind == TokenKind::Keyword
                        || self.is_type_name(&inner[0].text));
            }
        }
        false
    }

    // ---- statements ----

    fn parse_block(&mut self, ctx: DeclCtx) -> Option<Block> {
        let open_pos = self.pos;
        let open = self.eat("{")?;
        let close_pos = {
            let partner = self.partners[open].map(|p| self.code_index[p]);
            partner.filter(|&p| p > open_pos && p < self.end)
        };
        let end = close_pos.unwrap_or(self.end);

        let stmts = self.with_end(end, |p| {
            let mut stmts = Vec::new();
            while p.peek().is_some() {
                let before = p.pos;
                if let Some(stmt) = p.parse_stmt(ctx) {
                    stmts.push(stmt);
                }
                if p.pos == before {
                    p.bump();
                }
            }
            stmts
        });

        let close = close_pos.map(|c| self.code[c]);
        self.pos = close_pos.map(|c| c + 1).unwrap_or(end);
        Some(Block { open, stmts, close })
    }

    fn parse_stmt(&mut self, ctx: DeclCtx) -> Option<Stmt> {
        let token = self.peek()?;
        if token.is("{") {
            let inner = DeclCtx {
                depth: ctx.depth + 1,
                ..ctx
            };
            return self.parse_block(inner).map(Stmt::Block);
        }
        if token.is(";") {
            return self.bump().map(Stmt::Empty);
        }
        if token.kind == TokenKind::Keyword {
            match token.text.as_str() {
                "if" => return self.parse_if(ctx),
                "for" => return self.parse_for(ctx),
                "while" => return self.parse_while(ctx),
                "do" => return self.parse_do(ctx),
                "switch" => return self.parse_switch(ctx),
                "case" => return self.parse_case(ctx, false),
                "default" if self.peek_at(1).is_some_and(|t| t.is(":")) => {
                    return self.parse_case(ctx, true)
                }
                "return" => return self.parse_simple(SimpleKind::Return),
                "break" => return self.parse_simple(SimpleKind::Break),
                "continue" => return self.parse_simple(SimpleKind::Continue),
                "goto" => return self.parse_simple(SimpleKind::Goto),
                _ => {}
            }
        }
        if token.is_identifier() && self.peek_at(1).is_some_and(|t| t.is(":")) {
            let first = self.bump()?;
            self.bump();
            return Some(Stmt::Simple(SimpleStmt {
                kind: SimpleKind::Label,
                first,
                last: first,
                semicolon: None,
            }));
        }
        if self.looks_like_declaration() {
            let group = self.parse_declaration(ctx);
            let first = group.first?;
            return Some(Stmt::Decl(DeclStmt {
                first,
                last: group.last.unwrap_or(first),
                decls: group.ids,
                semicolon: group.semicolon,
            }));
        }
        self.parse_simple(SimpleKind::Expression)
    }

    fn parse_simple(&mut self, kind: SimpleKind) -> Option<Stmt> {
        let first = self.current_id()?;
        if kind != SimpleKind::Expression {
            self.bump();
        }
        let span = self.scan_expression(&[";"]);
        let last = span.map(|s| s.last).unwrap_or(first);
        let semicolon = self.eat(";");
        Some(Stmt::Simple(SimpleStmt {
            kind,
            first,
            last,
            semicolon,
        }))
    }

    /// `( ... )` after a control keyword, contents recorded as an expression
    fn parse_condition(&mut self) -> Option<Parens> {
        if !self.at("(") {
            return None;
        }
        let close_pos = self.partner_pos()?;
        let open = self.bump()?;
        self.with_end(close_pos, |p| {
            p.scan_expression(&[]);
        });
        self.pos = close_pos + 1;
        Some(Parens {
            open,
            close: self.code[close_pos],
        })
    }

    /// Body of a control statement; a missing body degrades to an empty statement
    fn parse_body(&mut self, ctx: DeclCtx, fallback: TokenId) -> Box<Stmt> {
        Box::new(self.parse_stmt(ctx).unwrap_or(Stmt::Empty(fallback)))
    }

    fn parse_if(&mut self, ctx: DeclCtx) -> Option<Stmt> {
        let keyword = self.bump()?;
        let Some(cond) = self.parse_condition() else {
            return self.degrade(keyword);
        };
        let then = self.parse_body(ctx, cond.close);
        let otherwise = if self.at_keyword("else") {
            let keyword = self.bump()?;
            Some(ElseBranch {
                keyword,
                body: self.parse_body(ctx, keyword),
            })
        } else {
            None
        };
        Some(Stmt::If(IfStmt {
            keyword,
            cond,
            then,
            otherwise,
        }))
    }

    fn parse_for(&mut self, ctx: DeclCtx) -> Option<Stmt> {
        let keyword = self.bump()?;
        if !self.at("(") {
            return self.degrade(keyword);
        }
        let Some(close_pos) = self.partner_pos() else {
            return self.degrade(keyword);
        };
        let open = self.bump()?;

        let (first_semi, second_semi, init_decls) = self.with_end(close_pos, |p| {
            let mut init_decls = Vec::new();
            let first_semi = if p.at(";") {
                p.bump()
            } else if p.looks_like_declaration() {
                let group = p.parse_declaration(ctx);
                init_decls = group.ids;
                group.semicolon
            } else {
                p.scan_expression(&[";"]);
                p.eat(";")
            };
            p.scan_expression(&[";"]);
            let second_semi = p.eat(";");
            p.scan_expression(&[]);
            (first_semi, second_semi, init_decls)
        });
        self.pos = close_pos + 1;

        let header = Parens {
            open,
            close: self.code[close_pos],
        };
        let body = self.parse_body(ctx, header.close);
        Some(Stmt::For(ForStmt {
            keyword,
            header,
            first_semi,
            second_semi,
            init_decls,
            body,
        }))
    }

    fn parse_while(&mut self, ctx: DeclCtx) -> Option<Stmt> {
        let keyword = self.bump()?;
        let Some(cond) = self.parse_condition() else {
            return self.degrade(keyword);
        };
        let body = self.parse_body(ctx, cond.close);
        Some(Stmt::While(WhileStmt {
            keyword,
            cond,
            body,
        }))
    }

    fn parse_do(&mut self, ctx: DeclCtx) -> Option<Stmt> {
        let keyword = self.bump()?;
        let body = self.parse_body(ctx, keyword);
        let while_keyword = if self.at_keyword("while") {
            self.bump()
        } else {
            None
        };
        let cond = while_keyword.and_then(|_| self.parse_condition());
        let semicolon = self.eat(";");
        Some(Stmt::DoWhile(DoWhileStmt {
            keyword,
            body,
            while_keyword,
            cond,
            semicolon,
        }))
    }

    fn parse_switch(&mut self, ctx: DeclCtx) -> Option<Stmt> {
        let keyword = self.bump()?;
        let Some(cond) = self.parse_condition() else {
            return self.degrade(keyword);
        };
        let body = self.parse_body(ctx, cond.close);
        Some(Stmt::Switch(SwitchStmt {
            keyword,
            cond,
            body,
        }))
    }

    fn parse_case(&mut self, ctx: DeclCtx, is_default: bool) -> Option<Stmt> {
        let keyword = self.bump()?;
        let value = if is_default {
            None
        } else {
            self.scan_expression(&[":"]).map(|s| (s.first, s.last))
        };
        let colon = self.eat(":");
        let body = if colon.is_some() && self.at("{") {
            let inner = DeclCtx {
                depth: ctx.depth + 1,
                ..ctx
            };
            self.parse_block(inner)
        } else {
            None
        };
        let label = CaseLabel {
            keyword,
            value,
            colon,
            body,
        };
        Some(if is_default {
            Stmt::Default(label)
        } else {
            Stmt::Case(label)
        })
    }

    /// A control keyword without its parentheses: treat the rest as a plain statement
    fn degrade(&mut self, keyword: TokenId) -> Option<Stmt> {
        let span = self.scan_expression(&[";"]);
        let semicolon = self.eat(";");
        Some(Stmt::Simple(SimpleStmt {
            kind: SimpleKind::Expression,
            first: keyword,
            last: span.map(|s| s.last).unwrap_or(keyword),
            semicolon,
        }))
    }
}
