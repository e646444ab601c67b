//! Canonical printer for RSQL ASTs
//!
//! Output uses `;`/`,` connectives, named operators and single quotes, and
//! re-parses to the same AST.

use crate::lexer::is_word_char;
use crate::parser::*;
use std::fmt::{self, Write};

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let needs_quotes =
            self.quoted || self.text.is_empty() || !self.text.chars().all(is_word_char);
        if !needs_quotes {
            return f.write_str(&self.text);
        }
        f.write_char('\'')?;
        for c in self.text.chars() {
            if c == '\'' || c == '\\' {
                f.write_char('\\')?;
            }
            f.write_char(c)?;
        }
        f.write_char('\'')
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.selector, self.op)?;
        if self.op.is_multi_value() {
            f.write_char('(')?;
            for (i, arg) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_char(',')?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_char(')')
        } else {
            match self.arguments.first() {
                Some(arg) => write!(f, "{}", arg),
                None => f.write_str("''"),
            }
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Comparison(c) => write!(f, "{}", c),
            FilterExpr::Logical { op, left, right } => {
                let sep = match op {
                    LogicalOp::And => ';',
                    LogicalOp::Or => ',',
                };
                write!(f, "{}{}{}", left, sep, right)
            }
            FilterExpr::Group(inner) => write!(f, "({})", inner),
        }
    }
}

/// Print an AST in canonical form.
pub fn pretty_print(expr: &FilterExpr) -> String {
    expr.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::ComparisonOp;

    #[test]
    fn test_quotes_only_when_needed() {
        assert_eq!(Argument::bare("target*").to_string(), "target*");
        assert_eq!(Argument::quoted("target*").to_string(), "'target*'");
        assert_eq!(Argument::bare("").to_string(), "''");
        assert_eq!(Argument::bare("a b").to_string(), "'a b'");
        assert_eq!(Argument::quoted("it's").to_string(), r"'it\'s'");
    }

    #[test]
    fn test_print_multi_value_always_parenthesised() {
        let expr = FilterExpr::comparison("tag", ComparisonOp::In, vec![Argument::bare("a")]);
        assert_eq!(pretty_print(&expr), "tag=in=(a)");
    }

    #[test]
    fn test_print_reparses_to_same_ast() -> Result<(), rsql_core::SyntaxError> {
        let source = "(a==1,b=out=(x,'y,z'));c=ge=${NOW_TS},d==''";
        let ast = parse(source)?;
        let printed = pretty_print(&ast);
        assert_eq!(parse(&printed)?, ast);
        Ok(())
    }
}
