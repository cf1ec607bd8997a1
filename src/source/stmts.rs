//! Statement tree of function bodies

use super::decls::{DeclId, Parens, TokenId};

/// `{ ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub open: TokenId,
    pub stmts: Vec<Stmt>,
    /// Missing only in truncated input
    pub close: Option<TokenId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfStmt {
    pub keyword: TokenId,
    pub cond: Parens,
    pub then: Box<Stmt>,
    pub otherwise: Option<ElseBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElseBranch {
    pub keyword: TokenId,
    pub body: Box<Stmt>,
}

impl ElseBranch {
    pub fn is_else_if(&self) -> bool {
        matches!(*self.body, Stmt::If(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForStmt {
    pub keyword: TokenId,
    pub header: Parens,
    /// Ends the initialiser
    pub first_semi: Option<TokenId>,
    /// Ends the condition
    pub second_semi: Option<TokenId>,
    /// Variables declared in the initialiser
    pub init_decls: Vec<DeclId>,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhileStmt {
    pub keyword: TokenId,
    pub cond: Parens,
    pub body: Box<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoWhileStmt {
    pub keyword: TokenId,
    pub body: Box<Stmt>,
    pub while_keyword: Option<TokenId>,
    pub cond: Option<Parens>,
    pub semicolon: Option<TokenId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchStmt {
    pub keyword: TokenId,
    pub cond: Parens,
    pub body: Box<Stmt>,
}

/// `case X:` or `default:`, with the block when one directly follows the colon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseLabel {
    pub keyword: TokenId,
    /// First and last token of the case expression
    pub value: Option<(TokenId, TokenId)>,
    pub colon: Option<TokenId>,
    pub body: Option<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleKind {
    Expression,
    Return,
    Break,
    Continue,
    Goto,
    /// `name:`
    Label,
}

/// A statement that ends at its semicolon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleStmt {
    pub kind: SimpleKind,
    pub first: TokenId,
    /// Last token before the semicolon
    pub last: TokenId,
    pub semicolon: Option<TokenId>,
}

/// Local declarations sharing one set of specifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclStmt {
    pub first: TokenId,
    pub last: TokenId,
    pub decls: Vec<DeclId>,
    pub semicolon: Option<TokenId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Block(Block),
    If(IfStmt),
    For(ForStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    Switch(SwitchStmt),
    Case(CaseLabel),
    Default(CaseLabel),
    Simple(SimpleStmt),
    Decl(DeclStmt),
    Empty(TokenId),
}

impl Stmt {
    pub fn first_token(&self) -> TokenId {
        match self {
            Self::Block(b) => b.open,
            Self::If(s) => s.keyword,
            Self::For(s) => s.keyword,
            Self::While(s) => s.keyword,
            Self::DoWhile(s) => s.keyword,
            Self::Switch(s) => s.keyword,
            Self::Case(c) | Self::Default(c) => c.keyword,
            Self::Simple(s) => s.first,
            Self::Decl(d) => d.first,
            Self::Empty(semi) => *semi,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Self::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block(_))
    }

    /// Control statements nest their body one level deeper
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            Self::If(_) | Self::For(_) | Self::While(_) | Self::DoWhile(_) | Self::Switch(_)
        )
    }

    /// Visit this statement and every statement nested in it, parents first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Stmt)) {
        visit(self);
        match self {
            Self::Block(b) => b.walk(visit),
            Self::If(s) => {
                s.then.walk(visit);
                if let Some(otherwise) = &s.otherwise {
                    otherwise.body.walk(visit);
                }
            }
            Self::For(s) => s.body.walk(visit),
            Self::While(s) => s.body.walk(visit),
            Self::DoWhile(s) => s.body.walk(visit),
            Self::Switch(s) => s.body.walk(visit),
            Self::Case(c) | Self::Default(c) => {
                if let Some(body) = &c.body {
                    body.walk(visit);
                }
            }
            Self::Simple(_) | Self::Decl(_) | Self::Empty(_) => {}
        }
    }
}

impl Block {
    /// Visit every statement inside this block, recursively
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Stmt)) {
        for stmt in &self.stmts {
            stmt.walk(visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walk_visits_nested_statements() {
        let inner = Stmt::Simple(SimpleStmt {
            kind: SimpleKind::Break,
            first: 5,
            last: 5,
            semicolon: Some(6),
        });
        let tree = Stmt::While(WhileStmt {
            keyword: 0,
            cond: Parens { open: 1, close: 3 },
            body: Box::new(Stmt::Block(Block {
                open: 4,
                stmts: vec![inner],
                close: Some(7),
            })),
        });

        let mut firsts = Vec::new();
        tree.walk(&mut |s| firsts.push(s.first_token()));
        assert_eq!(firsts, vec![0, 4, 5]);
        assert!(tree.is_control());
        assert!(!tree.is_block());
    }
}
