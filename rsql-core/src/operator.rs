//! Comparison operators

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// RSQL comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    In,
    Out,
    Lt,
    Gt,
    Le,
    Ge,
}

impl ComparisonOp {
    pub const ALL: [ComparisonOp; 8] = [
        ComparisonOp::Eq,
        ComparisonOp::Ne,
        ComparisonOp::In,
        ComparisonOp::Out,
        ComparisonOp::Lt,
        ComparisonOp::Gt,
        ComparisonOp::Le,
        ComparisonOp::Ge,
    ];

    /// Look up an operator by its textual form. Named operators (`=in=`,
    /// `=lt=`, ...) match case-insensitively; symbolic aliases (`<`, `>=`)
    /// are accepted for the ordering operators.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => return Some(ComparisonOp::Eq),
            "!=" => return Some(ComparisonOp::Ne),
            "<" => return Some(ComparisonOp::Lt),
            ">" => return Some(ComparisonOp::Gt),
            "<=" => return Some(ComparisonOp::Le),
            ">=" => return Some(ComparisonOp::Ge),
            _ => {}
        }
        let name = symbol.strip_prefix('=')?.strip_suffix('=')?;
        match name.to_ascii_lowercase().as_str() {
            "in" => Some(ComparisonOp::In),
            "out" => Some(ComparisonOp::Out),
            "lt" => Some(ComparisonOp::Lt),
            "gt" => Some(ComparisonOp::Gt),
            "le" => Some(ComparisonOp::Le),
            "ge" => Some(ComparisonOp::Ge),
            _ => None,
        }
    }

    /// Canonical textual form.
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::In => "=in=",
            ComparisonOp::Out => "=out=",
            ComparisonOp::Lt => "=lt=",
            ComparisonOp::Gt => "=gt=",
            ComparisonOp::Le => "=le=",
            ComparisonOp::Ge => "=ge=",
        }
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            ComparisonOp::Lt | ComparisonOp::Gt | ComparisonOp::Le | ComparisonOp::Ge
        )
    }

    /// `!=` and `=out=`.
    pub fn is_negated(&self) -> bool {
        matches!(self, ComparisonOp::Ne | ComparisonOp::Out)
    }

    /// Operators that take a parenthesised value list.
    pub fn is_multi_value(&self) -> bool {
        matches!(self, ComparisonOp::In | ComparisonOp::Out)
    }

    /// Evaluate this operator given the ordering of `actual` against `expected`.
    pub fn eval_ordering(&self, ord: Ordering) -> bool {
        match self {
            ComparisonOp::Eq | ComparisonOp::In => ord == Ordering::Equal,
            ComparisonOp::Ne | ComparisonOp::Out => ord != Ordering::Equal,
            ComparisonOp::Lt => ord == Ordering::Less,
            ComparisonOp::Le => ord != Ordering::Greater,
            ComparisonOp::Gt => ord == Ordering::Greater,
            ComparisonOp::Ge => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
