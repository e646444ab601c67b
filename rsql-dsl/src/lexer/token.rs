//! Lexer token types

use rsql_core::ComparisonOp;
use std::fmt;

// ============================================================================
// LEXER TYPES
// ============================================================================

/// Characters that end a bare word.
pub const RESERVED_CHARS: &[char] = &['"', '\'', '(', ')', ';', ',', '=', '!', '<', '>', '~'];

/// Whether `c` may appear in an unquoted word.
pub fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !RESERVED_CHARS.contains(&c)
}

/// Token kinds for RSQL.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Delimiters
    LParen,
    RParen,
    /// `;` (AND)
    Semicolon,
    /// `,` (OR at top level, separator inside a value list)
    Comma,

    // Operators
    Op(ComparisonOp),

    // Literals
    /// Unquoted run of word characters: a selector, a value, or an
    /// `and`/`or` keyword depending on position.
    Word(String),
    /// Quoted string with escapes resolved.
    Quoted(String),

    // Special
    Eof,
    Error(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Op(op) => write!(f, "'{}'", op),
            TokenKind::Word(w) => write!(f, "'{}'", w),
            TokenKind::Quoted(s) => write!(f, "quoted string '{}'", s),
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Error(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Source location span. `start`/`end` are byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// A bare word equal to `keyword`, ignoring ASCII case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Word(w) if w.eq_ignore_ascii_case(keyword))
    }
}
