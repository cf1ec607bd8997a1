//! Operator roles inside expressions
//!
//! The same spelling plays different parts in C: `*` multiplies, dereferences
//! or declares a pointer. Whitespace rules depend on which, so every operator
//! token of an expression is classified once after parsing.

use super::decls::{Parens, TokenId, TokenSpan};
use super::lexer::{Token, TokenKind};
use super::parser::{is_known_type_name, QUALIFIERS, TYPE_WORDS};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenRole {
    #[default]
    Other,
    Binary,
    Prefix,
    Postfix,
    /// `.` or `->`
    Member,
    TernaryQuestion,
    TernaryColon,
    /// `,` between arguments, initializers or comma-operator operands
    Comma,
    /// `*` of a declarator
    PointerDecl,
    /// `*` inside a cast or `sizeof` type
    PointerType,
}

/// `name( ... )` inside an expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub name: TokenId,
    pub parens: Parens,
}

const BINARY: &[&str] = &[
    "/", "%", "<<", ">>", "<", ">", "<=", ">=", "==", "!=", "^", "|", "&&", "||", "=", "+=",
    "-=", "*=", "/=", "%=", "<<=", ">>=", "&=", "^=", "|=",
];

struct Classifier<'a> {
    tokens: &'a [Token],
    partners: &'a [Option<TokenId>],
    typedefs: &'a HashSet<String>,
    roles: &'a mut [TokenRole],
    cast_closers: HashSet<TokenId>,
    calls: Vec<CallSite>,
}

/// Assign roles to the operators of every expression span and collect calls
pub fn classify(
    tokens: &[Token],
    partners: &[Option<TokenId>],
    typedefs: &HashSet<String>,
    expressions: &[TokenSpan],
    roles: &mut [TokenRole],
) -> Vec<CallSite> {
    let mut classifier = Classifier {
        tokens,
        partners,
        typedefs,
        roles,
        cast_closers: HashSet::new(),
        calls: Vec::new(),
    };
    let mut seen = HashSet::new();
    for span in expressions {
        if seen.insert((span.first, span.last)) {
            classifier.span(*span);
        }
    }
    let mut calls = classifier.calls;
    calls.sort_by_key(|c| c.name);
    calls.dedup();
    calls
}

impl Classifier<'_> {
    fn ends_operand(&self, id: TokenId) -> bool {
        let token = &self.tokens[id];
        match token.kind {
            TokenKind::Identifier | TokenKind::Number | TokenKind::Str | TokenKind::Char => true,
            TokenKind::Punct => {
                (token.is(")") && !self.cast_closers.contains(&id)) || token.is("]")
            }
            TokenKind::Operator => self.roles[id] == TokenRole::Postfix,
            _ => false,
        }
    }

    /// Whether `( ... )` holds nothing but a type name
    fn group_is_type(&self, open: TokenId, close: TokenId) -> bool {
        let inner: Vec<&Token> = ((open + 1)..close)
            .map(|i| &self.tokens[i])
            .filter(|t| t.is_code())
            .collect();
        let Some(first) = inner.first() else {
            return false;
        };
        let tagged = |t: &Token| t.is_keyword("struct") || t.is_keyword("union") || t.is_keyword("enum");
        let type_word = |t: &Token| TYPE_WORDS.contains(&t.text.as_str());
        let starts_type = type_word(first)
            || tagged(first)
            || QUALIFIERS.contains(&first.text.as_str())
            || (first.is_identifier() && is_known_type_name(&first.text, self.typedefs));
        if !starts_type {
            return false;
        }
        inner.iter().enumerate().all(|(i, t)| {
            type_word(t)
                || tagged(t)
                || QUALIFIERS.contains(&t.text.as_str())
                || t.is("*")
                || (t.is_identifier()
                    && (is_known_type_name(&t.text, self.typedefs)
                        || (i > 0 && tagged(inner[i - 1]))))
        })
    }

    fn span(&mut self, span: TokenSpan) {
        let mut prev: Option<TokenId> = None;
        let mut depth = 0u32;
        let mut ternaries: Vec<u32> = Vec::new();
        let tokens = self.tokens;

        for id in span.first..=span.last {
            let token = &tokens[id];
            if !token.is_code() {
                continue;
            }
            let after_operand = prev.is_some_and(|p| self.ends_operand(p));
            let role = match token.text.as_str() {
                "(" => {
                    depth += 1;
                    if let Some(close) = self.partners[id] {
                        let prev_token = prev.map(|p| &tokens[p]);
                        if let Some(name) = prev.filter(|_| prev_token.is_some_and(|t| t.is_identifier())) {
                            self.calls.push(CallSite {
                                name,
                                parens: Parens { open: id, close },
                            });
                        } else if !after_operand && self.group_is_type(id, close) {
                            if !prev_token.is_some_and(|t| t.is_keyword("sizeof")) {
                                self.cast_closers.insert(close);
                            }
                            for inner in (id + 1)..close {
                                if tokens[inner].is("*") {
                                    self.roles[inner] = TokenRole::PointerType;
                                }
                            }
                        }
                    }
                    None
                }
                ")" => {
                    depth = depth.saturating_sub(1);
                    while ternaries.last().is_some_and(|&d| d > depth) {
                        ternaries.pop();
                    }
                    None
                }
                "++" | "--" => Some(if after_operand {
                    TokenRole::Postfix
                } else {
                    TokenRole::Prefix
                }),
                "*" if self.roles[id] == TokenRole::PointerType => None,
                "*" | "&" | "-" | "+" => Some(if after_operand {
                    TokenRole::Binary
                } else {
                    TokenRole::Prefix
                }),
                "!" | "~" => Some(TokenRole::Prefix),
                "." | "->" => Some(TokenRole::Member),
                "," => Some(TokenRole::Comma),
                "?" => {
                    ternaries.push(depth);
                    Some(TokenRole::TernaryQuestion)
                }
                ":" if ternaries.last() == Some(&depth) => {
                    ternaries.pop();
                    Some(TokenRole::TernaryColon)
                }
                text if BINARY.contains(&text) && token.kind == TokenKind::Operator => {
                    Some(TokenRole::Binary)
                }
                _ => None,
            };
            if let Some(role) = role {
                self.roles[id] = role;
            }
            prev = Some(id);
        }
    }
}
