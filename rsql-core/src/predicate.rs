//! Store-facing predicate plan
//!
//! Output of translation and input of the query executor. A plan is a tree
//! of [`Predicate`]s over the root entity plus the set of joins it uses.
//! `Display` renders a SQL-like form for logs.

use crate::{ComparisonOp, EntityType, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// JOINS
// ============================================================================

/// Identity of a join target (`assignedDistributionSet`, `metadata`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JoinId(String);

impl JoinId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JoinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    /// Single associated entity.
    Association,
    /// Key/value child rows.
    Map,
}

/// A join introduced by the plan. At most one per [`JoinId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Join {
    pub id: JoinId,
    pub kind: JoinKind,
}

// ============================================================================
// VALUE TESTS
// ============================================================================

/// A typed comparison operand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    Text(String),
    Number(i64),
    Timestamp(Timestamp),
    Bool(bool),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Operand::Number(n) => write!(f, "{}", n),
            Operand::Timestamp(ts) => write!(f, "'{}'", ts.to_rfc3339()),
            Operand::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Escape character used in [`LikePattern`]s.
pub const LIKE_ESCAPE: char = '\\';

/// SQL LIKE pattern: `%` is any sequence, `_` any single character, and
/// `\` escapes the next character.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LikePattern {
    pub pattern: String,
    pub case_insensitive: bool,
}

impl LikePattern {
    /// Convert an RSQL value where `*` is the only wildcard. Every other
    /// LIKE metacharacter is escaped so it matches literally.
    pub fn from_wildcard(raw: &str, case_insensitive: bool) -> Self {
        let mut pattern = String::with_capacity(raw.len() + 2);
        for c in raw.chars() {
            match c {
                '*' => pattern.push('%'),
                '%' | '_' | LIKE_ESCAPE => {
                    pattern.push(LIKE_ESCAPE);
                    pattern.push(c);
                }
                _ => pattern.push(c),
            }
        }
        Self {
            pattern,
            case_insensitive,
        }
    }

    /// Matches only the empty string.
    pub fn empty(case_insensitive: bool) -> Self {
        Self {
            pattern: String::new(),
            case_insensitive,
        }
    }

    /// The exact text this pattern matches, if it has no wildcards.
    pub fn literal(&self) -> Option<String> {
        if self.has_wildcards() {
            return None;
        }
        let mut text = String::with_capacity(self.pattern.len());
        let mut escaped = false;
        for c in self.pattern.chars() {
            if escaped || c != LIKE_ESCAPE {
                text.push(c);
                escaped = false;
            } else {
                escaped = true;
            }
        }
        (!escaped).then_some(text)
    }

    /// Whether the pattern contains an unescaped wildcard.
    pub fn has_wildcards(&self) -> bool {
        let mut escaped = false;
        for c in self.pattern.chars() {
            match c {
                _ if escaped => escaped = false,
                LIKE_ESCAPE => escaped = true,
                '%' | '_' => return true,
                _ => {}
            }
        }
        false
    }
}

/// Test applied to a single column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueTest {
    Like(LikePattern),
    Equals(Operand),
    /// Ordering comparison; `op` is one of `<`, `<=`, `>`, `>=`.
    Compare(ComparisonOp, Operand),
    IsNull,
    AnyOf(Vec<ValueTest>),
    Not(Box<ValueTest>),
}

impl ValueTest {
    /// Collapse a list of alternatives, avoiding a one-element `AnyOf`. An
    /// empty list matches nothing.
    pub fn any_of(mut tests: Vec<ValueTest>) -> ValueTest {
        if tests.len() == 1 {
            tests.remove(0)
        } else {
            ValueTest::AnyOf(tests)
        }
    }

    pub fn negate(self) -> ValueTest {
        match self {
            ValueTest::Not(inner) => *inner,
            other => ValueTest::Not(Box::new(other)),
        }
    }
}

// ============================================================================
// PREDICATES
// ============================================================================

/// Condition tree over the root entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// Column of the root entity passes `test`.
    Column { column: String, test: ValueTest },
    /// Some joined row (restricted to `key` for maps) passes `test` on `column`.
    Exists {
        join: JoinId,
        key: Option<String>,
        column: String,
        test: ValueTest,
    },
    /// No joined row exists (restricted to `key` for maps).
    Absent { join: JoinId, key: Option<String> },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(left: Predicate, right: Predicate) -> Predicate {
        match (left, right) {
            (Predicate::And(mut l), Predicate::And(r)) => {
                l.extend(r);
                Predicate::And(l)
            }
            (Predicate::And(mut l), r) => {
                l.push(r);
                Predicate::And(l)
            }
            (l, r) => Predicate::And(vec![l, r]),
        }
    }

    pub fn or(left: Predicate, right: Predicate) -> Predicate {
        match (left, right) {
            (Predicate::Or(mut l), Predicate::Or(r)) => {
                l.extend(r);
                Predicate::Or(l)
            }
            (Predicate::Or(mut l), r) => {
                l.push(r);
                Predicate::Or(l)
            }
            (l, r) => Predicate::Or(vec![l, r]),
        }
    }

    pub fn negate(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            other => Predicate::Not(Box::new(other)),
        }
    }
}

/// A translated filter, ready for execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub entity: EntityType,
    /// Joins in first-use order, one per association identity.
    pub joins: Vec<Join>,
    pub predicate: Predicate,
}

// ============================================================================
// RENDERING
// ============================================================================

struct TestDisplay<'a> {
    column: &'a str,
    test: &'a ValueTest,
}

impl fmt::Display for TestDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = self.column;
        match self.test {
            ValueTest::Like(p) => {
                let keyword = if p.case_insensitive { "ILIKE" } else { "LIKE" };
                write!(f, "{} {} '{}'", column, keyword, p.pattern.replace('\'', "''"))
            }
            ValueTest::Equals(operand) => write!(f, "{} = {}", column, operand),
            ValueTest::Compare(op, operand) => {
                let symbol = match op {
                    ComparisonOp::Lt => "<",
                    ComparisonOp::Le => "<=",
                    ComparisonOp::Gt => ">",
                    ComparisonOp::Ge => ">=",
                    other => other.symbol(),
                };
                write!(f, "{} {} {}", column, symbol, operand)
            }
            ValueTest::IsNull => write!(f, "{} IS NULL", column),
            ValueTest::AnyOf(tests) if tests.is_empty() => f.write_str("FALSE"),
            ValueTest::AnyOf(tests) => {
                f.write_str("(")?;
                for (i, test) in tests.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" OR ")?;
                    }
                    write!(f, "{}", TestDisplay { column, test })?;
                }
                f.write_str(")")
            }
            ValueTest::Not(inner) => write!(f, "NOT ({})", TestDisplay { column, test: inner }),
        }
    }
}

fn write_scope(f: &mut fmt::Formatter<'_>, join: &JoinId, key: &Option<String>) -> fmt::Result {
    match key {
        Some(key) => write!(f, "{}[key = '{}']", join, key.replace('\'', "''")),
        None => write!(f, "{}", join),
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Column { column, test } => write!(f, "{}", TestDisplay { column, test }),
            Predicate::Exists {
                join,
                key,
                column,
                test,
            } => {
                f.write_str("EXISTS ")?;
                write_scope(f, join, key)?;
                write!(f, "({})", TestDisplay { column, test })
            }
            Predicate::Absent { join, key } => {
                f.write_str("NOT EXISTS ")?;
                write_scope(f, join, key)
            }
            Predicate::And(parts) | Predicate::Or(parts) => {
                let sep = if matches!(self, Predicate::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(sep)?;
                    }
                    write!(f, "{}", part)?;
                }
                f.write_str(")")
            }
            Predicate::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_conversion_escapes_like_metacharacters() {
        let p = LikePattern::from_wildcard("ab*_%\\", true);
        assert_eq!(p.pattern, "ab%\\_\\%\\\\");
        assert!(p.has_wildcards());

        let literal = LikePattern::from_wildcard("100%_off", false);
        assert_eq!(literal.pattern, "100\\%\\_off");
        assert!(!literal.has_wildcards());
        assert_eq!(literal.literal().as_deref(), Some("100%_off"));
        assert_eq!(p.literal(), None);
        assert_eq!(LikePattern::from_wildcard("a\\b", true).literal().as_deref(), Some("a\\b"));
    }

    #[test]
    fn test_and_or_flatten() {
        let leaf = |c: &str| Predicate::Column {
            column: c.to_string(),
            test: ValueTest::IsNull,
        };
        let and = Predicate::and(Predicate::and(leaf("a"), leaf("b")), leaf("c"));
        assert!(matches!(&and, Predicate::And(parts) if parts.len() == 3));

        let or = Predicate::or(leaf("a"), Predicate::or(leaf("b"), leaf("c")));
        assert!(matches!(&or, Predicate::Or(parts) if parts.len() == 2));
    }

    #[test]
    fn test_double_negation_collapses() {
        let p = Predicate::Absent {
            join: JoinId::new("tags"),
            key: None,
        };
        assert_eq!(p.clone().negate().negate(), p);
        assert_eq!(ValueTest::IsNull.negate().negate(), ValueTest::IsNull);
    }

    #[test]
    fn test_display() {
        let p = Predicate::or(
            Predicate::Absent {
                join: JoinId::new("metadata"),
                key: Some("metaKey".to_string()),
            },
            Predicate::Exists {
                join: JoinId::new("metadata"),
                key: Some("metaKey".to_string()),
                column: "value".to_string(),
                test: ValueTest::Not(Box::new(ValueTest::Like(LikePattern::from_wildcard(
                    "v*", true,
                )))),
            },
        );
        assert_eq!(
            p.to_string(),
            "(NOT EXISTS metadata[key = 'metaKey'] OR EXISTS metadata[key = 'metaKey'](NOT (value ILIKE 'v%')))"
        );

        let nothing = Predicate::Exists {
            join: JoinId::new("tags"),
            key: None,
            column: "name".to_string(),
            test: ValueTest::any_of(Vec::new()),
        };
        assert_eq!(nothing.to_string(), "EXISTS tags(FALSE)");
    }
}
