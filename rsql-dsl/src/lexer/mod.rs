//! Lexer module for RSQL filters

pub mod token;
pub mod scanner;

pub use token::*;
pub use scanner::*;
