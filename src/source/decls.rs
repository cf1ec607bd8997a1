//! Declaration-level model of a translation unit
//!
//! Nodes live in one arena (`Vec<DeclNode>`) and refer to each other by index;
//! a child names its enclosing scope through `parent` and never owns it. Every
//! position is a token index into the file's token stream.

use super::stmts::Block;

/// Index into the file's token stream
pub type TokenId = usize;

/// Index into the declaration arena
pub type DeclId = usize;

/// Inclusive token range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenSpan {
    pub first: TokenId,
    pub last: TokenId,
}

impl TokenSpan {
    pub fn new(first: TokenId, last: TokenId) -> Self {
        Self { first, last }
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.first <= id && id <= self.last
    }
}

/// A `( ... )` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parens {
    pub open: TokenId,
    pub close: TokenId,
}

/// Fields shared by every declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclHeader {
    /// `None` for anonymous records and unnamed parameters
    pub name: Option<String>,
    pub name_token: Option<TokenId>,
    /// Enclosing function or record
    pub parent: Option<DeclId>,
    /// Nesting depth, 0 at file scope
    pub depth: u32,
    /// Line of the name, or of the first token when unnamed
    pub line: u32,
    /// Whole declaration, specifiers through terminator
    pub span: TokenSpan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Global,
    Local,
    Parameter,
    Field,
}

/// What the declared type looks like, as far as spelling tells
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeSummary {
    pub pointer: bool,
    pub array: bool,
    pub function_pointer: bool,
    /// Spelled starting with `char`
    pub char: bool,
    /// Spelled starting with `struct`
    pub record: bool,
    /// Spelled starting with `enum`
    pub enumeration: bool,
}

/// Pointer and grouping details of one declarator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarator {
    /// Specifier tokens shared with sibling declarators
    pub specifiers: Option<TokenSpan>,
    /// `*` tokens in front of the name, outermost first
    pub stars: Vec<TokenId>,
    /// `( *name )` of a function pointer
    pub group: Option<Parens>,
    /// Parameter list of a function or function pointer
    pub params: Option<Parens>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub header: DeclHeader,
    pub declarator: Declarator,
    pub params: Vec<DeclId>,
    /// Terminator of a prototype
    pub semicolon: Option<TokenId>,
    pub body: Option<Block>,
}

impl Function {
    pub fn param_parens(&self) -> Option<Parens> {
        self.declarator.params
    }

    /// First line through the closing brace, inclusive
    pub fn line_span(&self, tokens: &[super::Token]) -> Option<(u32, u32)> {
        let body = self.body.as_ref()?;
        let close = body.close?;
        Some((tokens[self.header.span.first].line, tokens[close].line))
    }
}

/// `= ...` part of a declarator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Initializer {
    pub equals: TokenId,
    /// Absent when nothing follows `=`
    pub value: Option<TokenSpan>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub header: DeclHeader,
    pub kind: VarKind,
    pub ty: TypeSummary,
    pub declarator: Declarator,
    pub initializer: Option<Initializer>,
    pub semicolon: Option<TokenId>,
}

/// A struct or union
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: DeclHeader,
    pub keyword: TokenId,
    pub typedef_keyword: Option<TokenId>,
    /// `None` for a forward declaration
    pub braces: Option<(TokenId, TokenId)>,
    pub fields: Vec<DeclId>,
    /// Set when the record is the whole declaration: `struct X { ... };`
    pub semicolon: Option<TokenId>,
}

impl Record {
    pub fn is_definition(&self) -> bool {
        self.braces.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDecl {
    pub header: DeclHeader,
    pub keyword: TokenId,
    pub typedef_keyword: Option<TokenId>,
    pub braces: Option<(TokenId, TokenId)>,
    pub constants: Vec<DeclId>,
    pub semicolon: Option<TokenId>,
}

impl EnumDecl {
    pub fn is_definition(&self) -> bool {
        self.braces.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumConstant {
    pub header: DeclHeader,
    pub value: Option<Initializer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typedef {
    pub header: DeclHeader,
    pub keyword: TokenId,
    pub ty: TypeSummary,
    pub declarator: Declarator,
    /// Record or enum defined inside this typedef
    pub target: Option<DeclId>,
    pub semicolon: Option<TokenId>,
}

/// `#define NAME ...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    /// `name_token` is the directive token; the name itself sits at `name_column`
    pub header: DeclHeader,
    pub name_column: u32,
    pub function_like: bool,
    /// `#ifndef X` immediately followed by `#define X`
    pub header_guard: bool,
}

/// One declaration of the translation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclNode {
    FunctionDecl(Function),
    FunctionDef(Function),
    Variable(Variable),
    Struct(Record),
    Union(Record),
    Enum(EnumDecl),
    EnumConstant(EnumConstant),
    Typedef(Typedef),
    Macro(Macro),
}

impl DeclNode {
    pub fn header(&self) -> &DeclHeader {
        match self {
            Self::FunctionDecl(f) | Self::FunctionDef(f) => &f.header,
            Self::Variable(v) => &v.header,
            Self::Struct(r) | Self::Union(r) => &r.header,
            Self::Enum(e) => &e.header,
            Self::EnumConstant(c) => &c.header,
            Self::Typedef(t) => &t.header,
            Self::Macro(m) => &m.header,
        }
    }

    pub fn header_mut(&mut self) -> &mut DeclHeader {
        match self {
            Self::FunctionDecl(f) | Self::FunctionDef(f) => &mut f.header,
            Self::Variable(v) => &mut v.header,
            Self::Struct(r) | Self::Union(r) => &mut r.header,
            Self::Enum(e) => &mut e.header,
            Self::EnumConstant(c) => &mut c.header,
            Self::Typedef(t) => &mut t.header,
            Self::Macro(m) => &mut m.header,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.header().name.as_deref()
    }

    pub fn line(&self) -> u32 {
        self.header().line
    }

    pub fn span(&self) -> TokenSpan {
        self.header().span
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Self::FunctionDecl(f) | Self::FunctionDef(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Self::Struct(r) | Self::Union(r) => Some(r),
            _ => None,
        }
    }

    /// `struct`, `union` or `enum` keyword of a tagged type
    pub fn tag_keyword(&self) -> Option<TokenId> {
        match self {
            Self::Struct(r) | Self::Union(r) => Some(r.keyword),
            Self::Enum(e) => Some(e.keyword),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(name: &str) -> DeclHeader {
        DeclHeader {
            name: Some(name.to_string()),
            name_token: Some(1),
            parent: None,
            depth: 0,
            line: 3,
            span: TokenSpan::new(0, 2),
        }
    }

    #[test]
    fn test_header_access() {
        let node = DeclNode::Variable(Variable {
            header: header("count"),
            kind: VarKind::Global,
            ty: TypeSummary::default(),
            declarator: Declarator::default(),
            initializer: None,
            semicolon: Some(2),
        });
        assert_eq!(node.name(), Some("count"));
        assert_eq!(node.line(), 3);
        assert!(node.as_variable().is_some());
        assert!(node.as_function().is_none());
        assert!(node.span().contains(2));
        assert!(!node.span().contains(3));
    }
}
