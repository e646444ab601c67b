//! In-memory evaluation of query plans
//!
//! A [`QueryPlan`] is compiled once per query: LIKE patterns become anchored
//! regexes. Evaluation is two-valued. A null column fails every value test
//! except `IsNull`, so the complement of a test includes nulls.

use crate::record::{Filterable, Row, StoreValue, KEY_COLUMN};
use regex::Regex;
use rsql_core::{
    ComparisonOp, EntityType, LikePattern, Operand, Predicate, QueryPlan, StorageError, ValueTest,
    LIKE_ESCAPE,
};
use std::cmp::Ordering;
use std::collections::HashMap;

// ============================================================================
// VALUE MATCHERS
// ============================================================================

#[derive(Debug, Clone)]
enum Matcher {
    Like(Regex),
    /// Wildcard-free pattern; `text` is lower-cased when case-insensitive.
    Literal {
        text: String,
        case_insensitive: bool,
    },
    Equals(Operand),
    Compare(ComparisonOp, Operand),
    IsNull,
    AnyOf(Vec<Matcher>),
    Not(Box<Matcher>),
}

impl Matcher {
    fn compile(test: &ValueTest) -> Result<Self, StorageError> {
        Ok(match test {
            ValueTest::Like(pattern) => match pattern.literal() {
                Some(text) if pattern.case_insensitive => Matcher::Literal {
                    text: text.to_lowercase(),
                    case_insensitive: true,
                },
                Some(text) => Matcher::Literal {
                    text,
                    case_insensitive: false,
                },
                None => Matcher::Like(like_regex(pattern)?),
            },
            ValueTest::Equals(operand) => Matcher::Equals(operand.clone()),
            ValueTest::Compare(op, operand) => Matcher::Compare(*op, operand.clone()),
            ValueTest::IsNull => Matcher::IsNull,
            ValueTest::AnyOf(tests) => Matcher::AnyOf(
                tests
                    .iter()
                    .map(Matcher::compile)
                    .collect::<Result<_, _>>()?,
            ),
            ValueTest::Not(inner) => Matcher::Not(Box::new(Matcher::compile(inner)?)),
        })
    }

    fn matches(&self, value: StoreValue<'_>) -> bool {
        match self {
            Matcher::Like(re) => matches!(value, StoreValue::Text(s) if re.is_match(s)),
            Matcher::Literal {
                text,
                case_insensitive,
            } => match value {
                StoreValue::Text(s) if *case_insensitive => s.to_lowercase() == *text,
                StoreValue::Text(s) => s == text,
                _ => false,
            },
            Matcher::Equals(operand) => compare_values(value, operand) == Some(Ordering::Equal),
            Matcher::Compare(op, operand) => {
                compare_values(value, operand).is_some_and(|ord| op.eval_ordering(ord))
            }
            Matcher::IsNull => value.is_null(),
            Matcher::AnyOf(matchers) => matchers.iter().any(|m| m.matches(value)),
            Matcher::Not(inner) => !inner.matches(value),
        }
    }
}

/// Translate a LIKE pattern into an anchored regex.
fn like_regex(like: &LikePattern) -> Result<Regex, StorageError> {
    let mut source = String::with_capacity(like.pattern.len() + 8);
    source.push_str(if like.case_insensitive { "(?is)^" } else { "(?s)^" });

    let mut buf = [0u8; 4];
    let mut chars = like.pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            LIKE_ESCAPE => {
                let escaped = chars.next().ok_or_else(|| StorageError::InvalidPattern {
                    pattern: like.pattern.clone(),
                    reason: "dangling escape".to_string(),
                })?;
                source.push_str(&regex::escape(escaped.encode_utf8(&mut buf)));
            }
            other => source.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    source.push('$');

    Regex::new(&source).map_err(|e| StorageError::InvalidPattern {
        pattern: like.pattern.clone(),
        reason: e.to_string(),
    })
}

/// Order a stored value against an operand of the same type. Mismatched
/// types and nulls are incomparable.
fn compare_values(value: StoreValue<'_>, operand: &Operand) -> Option<Ordering> {
    match (value, operand) {
        (StoreValue::Text(a), Operand::Text(b)) => Some(a.cmp(b.as_str())),
        (StoreValue::Number(a), Operand::Number(b)) => Some(a.cmp(b)),
        (StoreValue::Timestamp(a), Operand::Timestamp(b)) => Some(a.cmp(b)),
        (StoreValue::Bool(a), Operand::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

// ============================================================================
// PREDICATE NODES
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    Column {
        column: String,
        matcher: Matcher,
    },
    Exists {
        join: String,
        key: Option<String>,
        column: String,
        matcher: Matcher,
    },
    Absent {
        join: String,
        key: Option<String>,
    },
    And(Vec<Node>),
    Or(Vec<Node>),
    Not(Box<Node>),
}

impl Node {
    fn compile(predicate: &Predicate) -> Result<Self, StorageError> {
        let all = |parts: &[Predicate]| {
            parts
                .iter()
                .map(Node::compile)
                .collect::<Result<Vec<_>, _>>()
        };
        Ok(match predicate {
            Predicate::Column { column, test } => Node::Column {
                column: column.clone(),
                matcher: Matcher::compile(test)?,
            },
            Predicate::Exists {
                join,
                key,
                column,
                test,
            } => Node::Exists {
                join: join.as_str().to_string(),
                key: key.clone(),
                column: column.clone(),
                matcher: Matcher::compile(test)?,
            },
            Predicate::Absent { join, key } => Node::Absent {
                join: join.as_str().to_string(),
                key: key.clone(),
            },
            Predicate::And(parts) => Node::And(all(parts)?),
            Predicate::Or(parts) => Node::Or(all(parts)?),
            Predicate::Not(inner) => Node::Not(Box::new(Node::compile(inner)?)),
        })
    }

    fn eval<'a, T: Filterable>(&'a self, rows: &mut JoinCache<'a, T>) -> bool {
        match self {
            Node::Column { column, matcher } => matcher.matches(rows.item.column(column)),
            Node::Exists {
                join,
                key,
                column,
                matcher,
            } => rows
                .rows(join)
                .iter()
                .filter(|row| key_matches(row, key.as_deref()))
                .any(|row| matcher.matches(row.get(column))),
            Node::Absent { join, key } => !rows
                .rows(join)
                .iter()
                .any(|row| key_matches(row, key.as_deref())),
            Node::And(parts) => parts.iter().all(|p| p.eval(rows)),
            Node::Or(parts) => parts.iter().any(|p| p.eval(rows)),
            Node::Not(inner) => !inner.eval(rows),
        }
    }
}

fn key_matches(row: &Row<'_>, key: Option<&str>) -> bool {
    match key {
        Some(key) => row.get(KEY_COLUMN) == StoreValue::Text(key),
        None => true,
    }
}

/// Join rows of one entity, materialised at most once per join.
struct JoinCache<'a, T> {
    item: &'a T,
    rows: HashMap<&'a str, Vec<Row<'a>>>,
}

impl<'a, T: Filterable> JoinCache<'a, T> {
    fn new(item: &'a T) -> Self {
        Self {
            item,
            rows: HashMap::new(),
        }
    }

    fn rows(&mut self, join: &'a str) -> &[Row<'a>] {
        let item = self.item;
        self.rows.entry(join).or_insert_with(|| item.join_rows(join))
    }
}

// ============================================================================
// COMPILED PLAN
// ============================================================================

/// A query plan ready to be evaluated against entities.
#[derive(Debug, Clone)]
pub struct CompiledPlan {
    entity: EntityType,
    root: Node,
}

impl CompiledPlan {
    pub fn compile(plan: &QueryPlan) -> Result<Self, StorageError> {
        Ok(Self {
            entity: plan.entity,
            root: Node::compile(&plan.predicate)?,
        })
    }

    pub fn entity(&self) -> EntityType {
        self.entity
    }

    pub fn matches<T: Filterable>(&self, item: &T) -> bool {
        let mut rows = JoinCache::new(item);
        self.root.eval(&mut rows)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rsql_core::{JoinId, Target};

    fn like(p: &str, ci: bool) -> Regex {
        like_regex(&LikePattern::from_wildcard(p, ci)).unwrap()
    }

    fn plan(predicate: Predicate) -> CompiledPlan {
        CompiledPlan::compile(&QueryPlan {
            entity: EntityType::Target,
            joins: Vec::new(),
            predicate,
        })
        .unwrap()
    }

    #[test]
    fn test_like_regex_wildcards_and_literals() {
        assert!(like("target*", true).is_match("TargetId123"));
        assert!(!like("target*", false).is_match("TargetId123"));
        assert!(like("*d12*", true).is_match("targetId123"));
        assert!(!like("target", true).is_match("target1"));

        let literal = like("50%_off.*", true);
        assert!(literal.is_match("50%_off.anything"));
        assert!(!literal.is_match("50x_off.z"));
        assert!(!literal.is_match("50%Xoff.z"));

        assert!(like("a\\b", true).is_match("a\\b"));
        assert!(like("", true).is_match(""));
        assert!(!like("", true).is_match("x"));
        assert!(like("line*", true).is_match("line1\nline2"));
    }

    #[test]
    fn test_wildcard_free_patterns_compare_text() {
        let compile = |raw: &str, ci: bool| {
            Matcher::compile(&ValueTest::Like(LikePattern::from_wildcard(raw, ci))).unwrap()
        };
        let exact = compile("Tag_1%", true);
        assert!(matches!(exact, Matcher::Literal { .. }));
        assert!(exact.matches(StoreValue::Text("tag_1%")));
        assert!(!exact.matches(StoreValue::Text("TagX1%")));
        assert!(!exact.matches(StoreValue::Null));

        let strict = compile("Tag1", false);
        assert!(strict.matches(StoreValue::Text("Tag1")));
        assert!(!strict.matches(StoreValue::Text("tag1")));

        assert!(matches!(compile("Tag*", true), Matcher::Like(_)));
        assert!(compile("", true).matches(StoreValue::Text("")));
    }

    #[test]
    fn test_dangling_escape_is_invalid() {
        let bad = LikePattern {
            pattern: "abc\\".to_string(),
            case_insensitive: true,
        };
        assert!(matches!(
            like_regex(&bad),
            Err(StorageError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_null_fails_value_tests_but_passes_complement() {
        let matcher = Matcher::compile(&ValueTest::Like(LikePattern::from_wildcard("x", true))).unwrap();
        assert!(!matcher.matches(StoreValue::Null));
        assert!(Matcher::Not(Box::new(matcher)).matches(StoreValue::Null));
        assert!(Matcher::IsNull.matches(StoreValue::Null));
    }

    #[test]
    fn test_ordering_compare() {
        let t = |ms| Utc.timestamp_millis_opt(ms).unwrap();
        let le = Matcher::Compare(ComparisonOp::Le, Operand::Timestamp(t(1000)));
        assert!(le.matches(StoreValue::Timestamp(t(1000))));
        assert!(le.matches(StoreValue::Timestamp(t(999))));
        assert!(!le.matches(StoreValue::Timestamp(t(1001))));
        assert!(!le.matches(StoreValue::Null));

        let gt = Matcher::Compare(ComparisonOp::Gt, Operand::Number(3));
        assert!(gt.matches(StoreValue::Number(4)));
        assert!(!gt.matches(StoreValue::Text("4")));
    }

    #[test]
    fn test_exists_restricts_map_rows_by_key() {
        let target = Target::new("t")
            .with_metadata("a", "1")
            .with_metadata("b", "2");
        let exists = |key: &str, value: &str| {
            plan(Predicate::Exists {
                join: JoinId::new("metadata"),
                key: Some(key.to_string()),
                column: "value".to_string(),
                test: ValueTest::Like(LikePattern::from_wildcard(value, true)),
            })
        };
        assert!(exists("a", "1").matches(&target));
        assert!(!exists("a", "2").matches(&target));
        assert!(!exists("c", "*").matches(&target));

        let absent = plan(Predicate::Absent {
            join: JoinId::new("metadata"),
            key: Some("c".to_string()),
        });
        assert!(absent.matches(&target));
    }

    #[test]
    fn test_boolean_structure() {
        let target = Target::new("dev").with_tag("x");
        let name = |v: &str| Predicate::Column {
            column: "name".to_string(),
            test: ValueTest::Like(LikePattern::from_wildcard(v, true)),
        };
        assert!(plan(Predicate::Or(vec![name("a"), name("dev")])).matches(&target));
        assert!(!plan(Predicate::And(vec![name("a"), name("dev")])).matches(&target));
        assert!(plan(name("a").negate()).matches(&target));
    }
}
