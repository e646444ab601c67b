//! RSQL DSL - Filter Parser & Compiler
//!
//! This crate turns RSQL filter strings into store-facing query plans.
//!
//! Architecture:
//! ```text
//! RSQL string ("name==target*;tag!=Tag1")
//!     ↓
//! Lexer (tokens with spans)
//!     ↓
//! Parser (FilterExpr, AND before OR)
//!     ↓
//! Resolver (registry lookup, path + operator validation)
//!     ↓
//! Normalizer + Translator (typed operands, joins, negation policy)
//!     ↓
//! QueryPlan (executed by rsql-storage)
//!     ↓
//! Pretty Printer (for round-trip testing)
//! ```

pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod pretty_printer;

// Re-export key types for convenience
pub use compiler::*;
pub use lexer::{tokenize, Lexer, Span, Token, TokenKind};
pub use parser::*;
pub use pretty_printer::pretty_print;
