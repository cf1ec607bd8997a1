//! Tokenizer for C source text
//!
//! Runs over sanitized text (tabs expanded, carriage returns removed) so every
//! column it reports is an expanded column. Comments and preprocessor
//! directives are kept as tokens; nothing is expanded or skipped.

use std::fmt;
use std::ops::Range;

/// Coarse token classes; the exact spelling lives in [`Token::text`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Keyword,
    Number,
    Str,
    Char,
    /// Operators, including `?` `:` `.` `->` and `...`
    Operator,
    /// `( ) [ ] { } ; ,`, and the digraphs `<: :> <% %>`
    Punct,
    Comment,
    /// A whole logical preprocessor line, continuations included
    Directive,
    /// A character no C token starts with
    Unknown,
}

/// A token with its exact position in the expanded text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based line of the first character
    pub line: u32,
    /// 1-based column of the first character
    pub column: u32,
    /// Line of the last character
    pub end_line: u32,
    /// Column just past the last character on `end_line`
    pub end_column: u32,
    /// Byte offsets into the sanitized text
    pub span: Range<usize>,
    /// Digraph the punctuator was written as; `text` holds the plain form
    pub digraph: Option<&'static str>,
}

impl Token {
    /// Whether this token is spelled `text`
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_comment(&self) -> bool {
        self.kind == TokenKind::Comment
    }

    pub fn is_directive(&self) -> bool {
        self.kind == TokenKind::Directive
    }

    /// Tokens the parser sees: everything but comments and directives
    pub fn is_code(&self) -> bool {
        !self.is_comment() && !self.is_directive()
    }

    pub fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Identifier
    }

    pub fn is_keyword(&self, text: &str) -> bool {
        self.kind == TokenKind::Keyword && self.text == text
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, TokenKind::Number | TokenKind::Str | TokenKind::Char)
    }

    /// The token as written in the source
    pub fn spelling(&self) -> &str {
        self.digraph.unwrap_or(&self.text)
    }

    /// Indent of this token when it starts its line
    pub fn indent(&self) -> u32 {
        self.column.saturating_sub(1)
    }
}

/// Tokenizer failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lexer error at line {}, column {}: {}",
            self.line, self.column, self.message
        )
    }
}

impl std::error::Error for LexError {}

/// C keywords; `#define`-ing any of these is an error
pub const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Alignas", "_Alignof", "_Atomic", "_Bool",
    "_Complex", "_Generic", "_Imaginary", "_Noreturn", "_Static_assert", "_Thread_local",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

// longest first so maximal munch falls out of a linear scan
/// Digraphs and the punctuators they stand for
const DIGRAPH_PUNCTUATORS: &[(&str, &str)] = &[("<:", "["), (":>", "]"), ("<%", "{"), ("%>", "}")];

const OPERATORS: &[&str] = &[
    "<<=", ">>=", "...", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||",
    "+=", "-=", "*=", "/=", "%=", "&=", "^=", "|=", "##", "+", "-", "*", "/", "%", "<", ">", "=",
    "!", "&", "|", "^", "~", "?", ":", ".", "#",
];

/// Lexer for sanitized C source
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    byte: usize,
    line: u32,
    column: u32,
    /// Only whitespace seen since the last newline
    at_line_start: bool,
    /// Keep going past malformed literals and comments
    recover: bool,
    problems: Vec<LexError>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            byte: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            recover: false,
            problems: Vec::new(),
        }
    }

    /// Tokenize everything, closing malformed literals and comments where
    /// they end.
    ///
    /// An unterminated literal stops at the end of its line and an
    /// unterminated block comment swallows the rest of the input; each such
    /// place is returned as a problem next to the tokens.
    pub fn tokenize_recovering(mut self) -> (Vec<Token>, Vec<LexError>) {
        self.recover = true;
        match self.tokenize() {
            Ok(tokens) => (tokens, self.problems),
            // next_token never runs at end of input
            Err(e) => (Vec::new(), vec![e]),
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            let token = self.next_token()?;
            self.at_line_start = false;
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        let start = self.mark();
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Err(self.error_at(&start, "Unexpected end of file")),
        };

        if ch == '#' && self.at_line_start {
            return Ok(self.directive(start));
        }
        if ch == '/' && self.peek_at(1) == Some('/') {
            return Ok(self.line_comment(start));
        }
        if ch == '/' && self.peek_at(1) == Some('*') {
            return self.block_comment(start);
        }
        if ch == '"' {
            return self.quoted(start, '"', TokenKind::Str);
        }
        if ch == '\'' {
            return self.quoted(start, '\'', TokenKind::Char);
        }
        if ch.is_ascii_digit() || (ch == '.' && self.peek_at(1).is_some_and(|c| c.is_ascii_digit())) {
            return Ok(self.number(start));
        }
        if ch.is_ascii_alphabetic() || ch == '_' {
            return self.word(start);
        }
        if let Some(&(digraph, punct)) = DIGRAPH_PUNCTUATORS.iter().find(|(d, _)| self.matches(d)) {
            self.advance();
            self.advance();
            let mut token = self.finish(start, TokenKind::Punct);
            token.text = punct.to_string();
            token.digraph = Some(digraph);
            return Ok(token);
        }
        if matches!(ch, '(' | ')' | '[' | ']' | '{' | '}' | ';' | ',') {
            self.advance();
            return Ok(self.finish(start, TokenKind::Punct));
        }
        for op in OPERATORS {
            if self.matches(op) {
                for _ in 0..op.chars().count() {
                    self.advance();
                }
                return Ok(self.finish(start, TokenKind::Operator));
            }
        }

        self.advance();
        Ok(self.finish(start, TokenKind::Unknown))
    }

    /// `#...` up to an unescaped newline; block comments inside are swallowed
    fn directive(&mut self, start: Mark) -> Token {
        while let Some(ch) = self.peek() {
            match ch {
                '\n' => break,
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '/' if self.peek_at(1) == Some('*') => {
                    self.advance();
                    self.advance();
                    while !self.is_at_end() && !self.matches("*/") {
                        self.advance();
                    }
                    self.advance();
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
        let mut token = self.finish(start, TokenKind::Directive);
        token.text = token.text.trim_end().to_string();
        token
    }

    fn line_comment(&mut self, start: Mark) -> Token {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
        self.finish(start, TokenKind::Comment)
    }

    fn block_comment(&mut self, start: Mark) -> Result<Token, LexError> {
        self.advance();
        self.advance();
        loop {
            if self.is_at_end() {
                let partial = self.finish(start, TokenKind::Comment);
                return self.malformed(&start, "Unterminated block comment", partial);
            }
            if self.matches("*/") {
                self.advance();
                self.advance();
                return Ok(self.finish(start, TokenKind::Comment));
            }
            self.advance();
        }
    }

    fn quoted(&mut self, start: Mark, quote: char, kind: TokenKind) -> Result<Token, LexError> {
        self.advance();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let what = if kind == TokenKind::Str {
                        "Unterminated string literal"
                    } else {
                        "Unterminated character literal"
                    };
                    let partial = self.finish(start, kind);
                    return self.malformed(&start, what, partial);
                }
                Some('\\') => {
                    self.advance();
                    self.advance();
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(self.finish(start, kind));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn number(&mut self, start: Mark) -> Token {
        while let Some(ch) = self.peek() {
            let exponent_sign = matches!(ch, '+' | '-')
                && self.position > start.position
                && matches!(self.input[self.position - 1], 'e' | 'E' | 'p' | 'P');
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || exponent_sign {
                self.advance();
            } else {
                break;
            }
        }
        self.finish(start, TokenKind::Number)
    }

    fn word(&mut self, start: Mark) -> Result<Token, LexError> {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let word: String = self.input[start.position..self.position].iter().collect();
        // encoding prefixes glue onto the literal that follows
        if matches!(word.as_str(), "L" | "u" | "U" | "u8") {
            match self.peek() {
                Some('"') => return self.quoted_with_prefix(start, '"', TokenKind::Str),
                Some('\'') => return self.quoted_with_prefix(start, '\'', TokenKind::Char),
                _ => {}
            }
        }

        let kind = if is_keyword(&word) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Ok(self.finish(start, kind))
    }

    fn quoted_with_prefix(
        &mut self,
        start: Mark,
        quote: char,
        kind: TokenKind,
    ) -> Result<Token, LexError> {
        let literal_start = self.mark();
        let literal = self.quoted(literal_start, quote, kind)?;
        let mut token = self.finish(start, kind);
        token.end_column = literal.end_column;
        Ok(token)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                '\n' => {
                    self.advance();
                    self.at_line_start = true;
                }
                ' ' | '\t' | '\x0b' | '\x0c' => {
                    self.advance();
                }
                // a backslash-newline outside a directive just joins lines
                '\\' if self.peek_at(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                _ => break,
            }
        }
    }

    fn finish(&self, start: Mark, kind: TokenKind) -> Token {
        Token {
            kind,
            text: self.input[start.position..self.position].iter().collect(),
            line: start.line,
            column: start.column,
            end_line: self.last_line(),
            end_column: self.column,
            span: start.byte..self.byte,
            digraph: None,
        }
    }

    /// Line of the most recently consumed character
    fn last_line(&self) -> u32 {
        if self.position > 0 && self.input[self.position - 1] == '\n' {
            self.line - 1
        } else {
            self.line
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            position: self.position,
            byte: self.byte,
            line: self.line,
            column: self.column,
        }
    }

    fn error_at(&self, start: &Mark, message: &str) -> LexError {
        LexError {
            message: message.to_string(),
            line: start.line,
            column: start.column,
        }
    }

    fn malformed(&mut self, start: &Mark, message: &str, partial: Token) -> Result<Token, LexError> {
        let error = self.error_at(start, message);
        if self.recover {
            self.problems.push(error);
            Ok(partial)
        } else {
            Err(error)
        }
    }

    fn matches(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(offset, expected)| self.peek_at(offset) == Some(expected))
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;
        self.byte += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    position: usize,
    byte: usize,
    line: u32,
    column: u32,
}

/// Convenience wrapper over [`Lexer::tokenize`]
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

/// Convenience wrapper over [`Lexer::tokenize_recovering`]
pub fn tokenize_recovering(input: &str) -> (Vec<Token>, Vec<LexError>) {
    Lexer::new(input).tokenize_recovering()
}
