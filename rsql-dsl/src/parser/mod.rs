//! Parser module for RSQL filters

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::*;
