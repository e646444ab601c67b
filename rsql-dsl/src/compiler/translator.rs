//! Predicate translation
//!
//! Leaf policy by field target:
//! - column: test on the root entity's column
//! - collection: existential test over the collection rows
//! - association / map: existential test over the joined row (map rows are
//!   restricted to the key first), with one join per association identity
//!
//! Negation on a column or collection is the plain complement. On an
//! association or map it is built explicitly as
//! `absent(join) OR exists(join, NOT test)` so an entity without the
//! association or key satisfies the negative filter.

use super::normalizer::{normalize, NormalizedValue, Term, ValueContext};
use super::resolver::{FieldTarget, ValidatedComparison, ValidatedExpr};
use rsql_core::{
    EntityType, FilterError, Join, JoinId, JoinKind, LikePattern, Predicate, QueryPlan,
    ValueTest,
};
use std::collections::HashSet;

/// Row scope of a joined test.
struct Scope {
    join: JoinId,
    key: Option<String>,
    column: String,
}

impl Scope {
    fn exists(&self, test: ValueTest) -> Predicate {
        Predicate::Exists {
            join: self.join.clone(),
            key: self.key.clone(),
            column: self.column.clone(),
            test,
        }
    }

    fn absent(&self) -> Predicate {
        Predicate::Absent {
            join: self.join.clone(),
            key: self.key.clone(),
        }
    }
}

/// Translates one validated expression into a [`QueryPlan`].
#[derive(Debug, Default)]
pub struct Translator {
    joins: Vec<Join>,
    seen: HashSet<JoinId>,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn translate(
        mut self,
        expr: &ValidatedExpr,
        entity: EntityType,
        ctx: &ValueContext,
    ) -> Result<QueryPlan, FilterError> {
        let predicate = self.translate_expr(expr, ctx)?;
        Ok(QueryPlan {
            entity,
            joins: self.joins,
            predicate,
        })
    }

    fn translate_expr(
        &mut self,
        expr: &ValidatedExpr,
        ctx: &ValueContext,
    ) -> Result<Predicate, FilterError> {
        match expr {
            ValidatedExpr::Comparison(c) => self.translate_leaf(c, ctx),
            ValidatedExpr::And(l, r) => {
                let left = self.translate_expr(l, ctx)?;
                let right = self.translate_expr(r, ctx)?;
                Ok(Predicate::and(left, right))
            }
            ValidatedExpr::Or(l, r) => {
                let left = self.translate_expr(l, ctx)?;
                let right = self.translate_expr(r, ctx)?;
                Ok(Predicate::or(left, right))
            }
        }
    }

    fn translate_leaf(
        &mut self,
        cmp: &ValidatedComparison,
        ctx: &ValueContext,
    ) -> Result<Predicate, FilterError> {
        let value = normalize(&cmp.path, cmp.op, &cmp.arguments, cmp.field.domain, ctx)?;
        let ordering = if cmp.op.is_ordering() {
            Some(ordering_test(cmp, &value)?)
        } else {
            None
        };
        let negated = cmp.op.is_negated();
        let ci = ctx.case_insensitive;

        let scope = match &cmp.field.target {
            FieldTarget::Column { column } => {
                let test = ordering.unwrap_or_else(|| column_test(&value, ci));
                let positive = Predicate::Column {
                    column: column.to_string(),
                    test,
                };
                return Ok(if negated { positive.negate() } else { positive });
            }
            FieldTarget::Collection { join, column } => Scope {
                join: JoinId::new(*join),
                key: None,
                column: column.to_string(),
            },
            FieldTarget::Association { join, column } => Scope {
                join: self.use_join(join, JoinKind::Association),
                key: None,
                column: column.to_string(),
            },
            FieldTarget::Map { join, key } => Scope {
                join: self.use_join(join, JoinKind::Map),
                key: Some(key.clone()),
                column: "value".to_string(),
            },
        };

        if let Some(test) = ordering {
            return Ok(scope.exists(test));
        }

        if matches!(cmp.field.target, FieldTarget::Collection { .. }) {
            // A tag name is never null: the marker matches no element.
            let value = value.without_absent();
            let positive = existential(&scope, &value, ci);
            return Ok(if negated { positive.negate() } else { positive });
        }

        Ok(if negated {
            absence_counts_as_not_equal(&scope, &value, ci)
        } else {
            existential(&scope, &value, ci)
        })
    }

    fn use_join(&mut self, name: &str, kind: JoinKind) -> JoinId {
        let id = JoinId::new(name);
        if self.seen.insert(id.clone()) {
            self.joins.push(Join {
                id: id.clone(),
                kind,
            });
        }
        id
    }
}

/// Ordering comparisons take exactly one typed operand.
fn ordering_test(cmp: &ValidatedComparison, value: &NormalizedValue) -> Result<ValueTest, FilterError> {
    match value.terms.as_slice() {
        [Term::Exact(operand)] => Ok(ValueTest::Compare(cmp.op, operand.clone())),
        _ => Err(FilterError::InvalidValue {
            path: cmp.path.clone(),
            value: cmp
                .arguments
                .first()
                .map(|a| a.text.clone())
                .unwrap_or_default(),
            reason: "ordering requires a single typed value".to_string(),
        }),
    }
}

/// Tests for the literal values: patterns and exact operands.
fn value_tests(value: &NormalizedValue) -> Vec<ValueTest> {
    value
        .terms
        .iter()
        .filter_map(|term| match term {
            Term::Pattern(p) => Some(ValueTest::Like(p.clone())),
            Term::Exact(o) => Some(ValueTest::Equals(o.clone())),
            Term::Absent | Term::Empty => None,
        })
        .collect()
}

fn empty_tests(ci: bool) -> [ValueTest; 2] {
    [ValueTest::IsNull, ValueTest::Like(LikePattern::empty(ci))]
}

fn column_test(value: &NormalizedValue, ci: bool) -> ValueTest {
    let mut tests = value_tests(value);
    if value.has_empty() {
        tests.extend(empty_tests(ci));
    } else if value.has_absent() {
        tests.push(ValueTest::IsNull);
    }
    ValueTest::any_of(tests)
}

/// Positive test over joined rows: some row matches, or (for `''`/`null`)
/// no row exists. With no operand left, nothing matches.
fn existential(scope: &Scope, value: &NormalizedValue, ci: bool) -> Predicate {
    let mut tests = value_tests(value);
    if value.has_empty() {
        tests.extend(empty_tests(ci));
    }

    let mut parts = Vec::new();
    if value.has_empty() || value.has_absent() {
        parts.push(scope.absent());
    }
    if !tests.is_empty() || parts.is_empty() {
        // An empty alternative list matches no row.
        parts.push(scope.exists(ValueTest::any_of(tests)));
    }

    match parts.len() {
        1 => parts.remove(0),
        _ => Predicate::Or(parts),
    }
}

/// Negative test over an association or map. If the operands themselves
/// mention absence (`null` or `''`), only present rows can satisfy the
/// filter; otherwise absence satisfies it.
fn absence_counts_as_not_equal(scope: &Scope, value: &NormalizedValue, ci: bool) -> Predicate {
    let mut excluded = value_tests(value);
    if value.has_empty() {
        excluded.extend(empty_tests(ci));
    }

    if value.has_empty() || value.has_absent() {
        return if excluded.is_empty() {
            scope.absent().negate()
        } else {
            scope.exists(ValueTest::any_of(excluded).negate())
        };
    }

    Predicate::or(
        scope.absent(),
        scope.exists(ValueTest::any_of(excluded).negate()),
    )
}

/// Translate a validated expression with a fresh join set.
pub fn translate(
    expr: &ValidatedExpr,
    entity: EntityType,
    ctx: &ValueContext,
) -> Result<QueryPlan, FilterError> {
    Translator::new().translate(expr, entity, ctx)
}

// ============================================================================
// TESTS
// ============================================================================
