//! AST types for RSQL filters

use rsql_core::ComparisonOp;
use serde::{Deserialize, Serialize};

// ============================================================================
// AST TYPES
// ============================================================================

/// Logical connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

/// A raw comparison argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub text: String,
    /// Quoted arguments are always plain text: `'null'` is not the absence
    /// marker and `'${NOW_TS}'` is not a placeholder.
    pub quoted: bool,
}

impl Argument {
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }

    /// The unquoted `null` token.
    pub fn is_null_marker(&self) -> bool {
        !self.quoted && self.text == "null"
    }
}

/// Comparison leaf: `<selector><operator><arguments>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    /// Raw field path; segments are not validated by the parser.
    pub selector: String,
    pub op: ComparisonOp,
    /// One element for single-value operators, one or more for `=in=`/`=out=`.
    pub arguments: Vec<Argument>,
}

/// Parsed filter expression. Never mutated after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterExpr {
    Comparison(Comparison),
    Logical {
        op: LogicalOp,
        left: Box<FilterExpr>,
        right: Box<FilterExpr>,
    },
    /// Explicit parentheses.
    Group(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn comparison(
        selector: impl Into<String>,
        op: ComparisonOp,
        arguments: Vec<Argument>,
    ) -> Self {
        FilterExpr::Comparison(Comparison {
            selector: selector.into(),
            op,
            arguments,
        })
    }

    pub fn and(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Logical {
            op: LogicalOp::And,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Logical {
            op: LogicalOp::Or,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn group(inner: FilterExpr) -> Self {
        FilterExpr::Group(Box::new(inner))
    }

    /// All comparison leaves, left to right.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            FilterExpr::Comparison(c) => out.push(c),
            FilterExpr::Logical { left, right, .. } => {
                left.collect_comparisons(out);
                right.collect_comparisons(out);
            }
            FilterExpr::Group(inner) => inner.collect_comparisons(out),
        }
    }
}
