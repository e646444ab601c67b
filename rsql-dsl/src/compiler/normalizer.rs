//! Operand normalization
//!
//! Turns raw argument strings into typed terms: LIKE patterns for text,
//! coerced operands for timestamps, numbers, booleans and enums, the
//! absence marker for unquoted `null` in value lists, and placeholder
//! substitution from values captured once per translation.

use crate::parser::Argument;
use chrono::{DateTime, TimeZone, Utc};
use rsql_core::{
    placeholder_name, ComparisonOp, FilterError, LikePattern, Operand, Placeholder,
    PlaceholderValues, ValueDomain,
};

/// Per-translation inputs to normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueContext {
    pub placeholders: PlaceholderValues,
    pub case_insensitive: bool,
}

/// One normalized operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    /// Unquoted `null` inside `=in=`/`=out=`: the association or key is absent.
    Absent,
    /// `''`: absent or empty.
    Empty,
    /// Text pattern; `*` already mapped to `%`.
    Pattern(LikePattern),
    /// Typed literal.
    Exact(Operand),
}

/// Normalized operands of one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedValue {
    pub terms: Vec<Term>,
}

impl NormalizedValue {
    pub fn has_absent(&self) -> bool {
        self.terms.iter().any(|t| matches!(t, Term::Absent))
    }

    pub fn has_empty(&self) -> bool {
        self.terms.iter().any(|t| matches!(t, Term::Empty))
    }

    /// The same operands with every absence marker dropped.
    pub fn without_absent(self) -> Self {
        Self {
            terms: self
                .terms
                .into_iter()
                .filter(|t| !matches!(t, Term::Absent))
                .collect(),
        }
    }
}

/// Normalize the arguments of one comparison on a field of `domain`.
pub fn normalize(
    path: &str,
    op: ComparisonOp,
    arguments: &[Argument],
    domain: ValueDomain,
    ctx: &ValueContext,
) -> Result<NormalizedValue, FilterError> {
    let terms = arguments
        .iter()
        .map(|arg| normalize_argument(path, op, arg, domain, ctx))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(NormalizedValue { terms })
}

fn normalize_argument(
    path: &str,
    op: ComparisonOp,
    arg: &Argument,
    domain: ValueDomain,
    ctx: &ValueContext,
) -> Result<Term, FilterError> {
    let invalid = |reason: String| FilterError::InvalidValue {
        path: path.to_string(),
        value: arg.text.clone(),
        reason,
    };
    // Values outside a closed domain are treated like unknown fields.
    let unsupported = |reason: String| FilterError::unsupported_field(path, &arg.text, reason);

    if op.is_multi_value() && arg.is_null_marker() {
        return Ok(Term::Absent);
    }

    if !arg.quoted {
        if let Some(name) = placeholder_name(&arg.text) {
            let placeholder =
                Placeholder::from_name(name).ok_or_else(|| FilterError::UnknownPlaceholder {
                    token: arg.text.clone(),
                })?;
            if !domain.is_temporal() {
                return Err(invalid(format!(
                    "placeholder {} is only valid on timestamp fields",
                    placeholder.token()
                )));
            }
            return Ok(Term::Exact(Operand::Timestamp(
                ctx.placeholders.resolve(placeholder),
            )));
        }
    }

    let text = arg.text.as_str();
    if text.is_empty() {
        if op.is_ordering() {
            return Err(invalid("ordering requires a value".to_string()));
        }
        return Ok(Term::Empty);
    }

    if !domain.accepts_wildcards() && text.contains('*') {
        return Err(unsupported(format!(
            "wildcards are not supported on {} fields",
            domain
        )));
    }

    let operand = match domain {
        ValueDomain::Text => {
            return Ok(Term::Pattern(LikePattern::from_wildcard(
                text,
                ctx.case_insensitive,
            )))
        }
        ValueDomain::Timestamp => Operand::Timestamp(parse_timestamp(text).ok_or_else(|| {
            invalid("expected epoch milliseconds or an RFC 3339 timestamp".to_string())
        })?),
        ValueDomain::Number => Operand::Number(
            text.parse()
                .map_err(|_| invalid("expected an integer".to_string()))?,
        ),
        ValueDomain::Bool => {
            if text.eq_ignore_ascii_case("true") {
                Operand::Bool(true)
            } else if text.eq_ignore_ascii_case("false") {
                Operand::Bool(false)
            } else {
                return Err(invalid("expected true or false".to_string()));
            }
        }
        ValueDomain::Enum(variants) => {
            let variant = variants
                .iter()
                .find(|v| v.eq_ignore_ascii_case(text))
                .ok_or_else(|| unsupported(format!("is not one of: {}", variants.join(", "))))?;
            Operand::Text(variant.to_string())
        }
    };

    Ok(Term::Exact(operand))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(millis) = text.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::{FilterConfig, FixedClock, UPDATE_STATUS_NAMES};

    const NOW_MILLIS: i64 = 1_700_000_000_000;

    fn ctx() -> ValueContext {
        let clock = FixedClock::at_millis(NOW_MILLIS).unwrap();
        ValueContext {
            placeholders: PlaceholderValues::capture(&clock, &FilterConfig::default()),
            case_insensitive: true,
        }
    }

    fn one(op: ComparisonOp, arg: Argument, domain: ValueDomain) -> Result<Term, FilterError> {
        let mut value = normalize("field", op, &[arg], domain, &ctx())?;
        Ok(value.terms.remove(0))
    }

    #[test]
    fn test_text_wildcards_become_like_patterns() {
        let term = one(ComparisonOp::Eq, Argument::bare("target*"), ValueDomain::Text).unwrap();
        assert_eq!(term, Term::Pattern(LikePattern::from_wildcard("target*", true)));
        match term {
            Term::Pattern(p) => assert_eq!(p.pattern, "target%"),
            other => panic!("unexpected {:?}", other),
        }

        let term = one(ComparisonOp::Eq, Argument::quoted("50%_off"), ValueDomain::Text).unwrap();
        assert_eq!(term, Term::Pattern(LikePattern::from_wildcard("50%_off", true)));
    }

    #[test]
    fn test_empty_string() {
        let term = one(ComparisonOp::Eq, Argument::quoted(""), ValueDomain::Text).unwrap();
        assert_eq!(term, Term::Empty);
    }

    #[test]
    fn test_null_marker_only_in_lists_and_unquoted() {
        let value = normalize(
            "tag",
            ComparisonOp::In,
            &[Argument::bare("null"), Argument::quoted("null"), Argument::bare("x")],
            ValueDomain::Text,
            &ctx(),
        )
        .unwrap();
        assert_eq!(value.terms[0], Term::Absent);
        assert!(matches!(&value.terms[1], Term::Pattern(p) if p.pattern == "null"));
        assert!(value.has_absent());
        assert!(!value.has_empty());

        let term = one(ComparisonOp::Eq, Argument::bare("null"), ValueDomain::Text).unwrap();
        assert!(matches!(term, Term::Pattern(_)));
    }

    #[test]
    fn test_placeholders() {
        let now = one(ComparisonOp::Le, Argument::bare("${NOW_TS}"), ValueDomain::Timestamp).unwrap();
        assert_eq!(now, Term::Exact(Operand::Timestamp(ctx().placeholders.now)));

        let overdue = one(ComparisonOp::Lt, Argument::bare("${OVERDUE_TS}"), ValueDomain::Timestamp).unwrap();
        match overdue {
            Term::Exact(Operand::Timestamp(ts)) => {
                assert_eq!(ts.timestamp_millis(), NOW_MILLIS - 600_000)
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_placeholder() {
        let err = one(ComparisonOp::Eq, Argument::bare("${LATER}"), ValueDomain::Timestamp).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnknownPlaceholder {
                token: "${LATER}".to_string()
            }
        );
    }

    #[test]
    fn test_placeholder_rejected_on_text_field_and_ignored_when_quoted() {
        let err = one(ComparisonOp::Eq, Argument::bare("${NOW_TS}"), ValueDomain::Text).unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));

        let quoted = one(ComparisonOp::Eq, Argument::quoted("${NOW_TS}"), ValueDomain::Text).unwrap();
        assert_eq!(quoted, Term::Pattern(LikePattern::from_wildcard("${NOW_TS}", true)));
        assert!(matches!(quoted, Term::Pattern(p) if !p.has_wildcards()));
    }

    #[test]
    fn test_timestamp_coercion() {
        let millis = one(ComparisonOp::Gt, Argument::bare("1000"), ValueDomain::Timestamp).unwrap();
        assert!(matches!(millis, Term::Exact(Operand::Timestamp(ts)) if ts.timestamp_millis() == 1000));

        let rfc = one(
            ComparisonOp::Gt,
            Argument::quoted("1970-01-01T00:00:01+00:00"),
            ValueDomain::Timestamp,
        )
        .unwrap();
        assert!(matches!(rfc, Term::Exact(Operand::Timestamp(ts)) if ts.timestamp_millis() == 1000));

        assert!(one(ComparisonOp::Gt, Argument::bare("yesterday"), ValueDomain::Timestamp).is_err());
        assert!(one(ComparisonOp::Eq, Argument::bare("17*"), ValueDomain::Timestamp).is_err());
        assert!(one(ComparisonOp::Gt, Argument::quoted(""), ValueDomain::Timestamp).is_err());
    }

    #[test]
    fn test_number_bool_enum() {
        assert_eq!(
            one(ComparisonOp::Eq, Argument::bare("42"), ValueDomain::Number).unwrap(),
            Term::Exact(Operand::Number(42))
        );
        assert_eq!(
            one(ComparisonOp::Eq, Argument::bare("TRUE"), ValueDomain::Bool).unwrap(),
            Term::Exact(Operand::Bool(true))
        );
        let status = ValueDomain::Enum(UPDATE_STATUS_NAMES);
        assert_eq!(
            one(ComparisonOp::Eq, Argument::bare("In_Sync"), status).unwrap(),
            Term::Exact(Operand::Text("in_sync".to_string()))
        );
        assert!(one(ComparisonOp::Eq, Argument::bare("noExist*"), status).is_err());
        assert!(one(ComparisonOp::Eq, Argument::bare("broken"), status).is_err());
        assert!(one(ComparisonOp::Eq, Argument::bare("4.2"), ValueDomain::Number).is_err());
    }

    #[test]
    fn test_closed_domain_rejections_are_unsupported_fields() {
        let status = ValueDomain::Enum(UPDATE_STATUS_NAMES);
        for (arg, domain) in [
            ("noExist*", status),
            ("broken", status),
            ("17*", ValueDomain::Timestamp),
            ("4*", ValueDomain::Number),
        ] {
            match one(ComparisonOp::Eq, Argument::bare(arg), domain) {
                Err(FilterError::UnsupportedField { segment, .. }) => assert_eq!(segment, arg),
                other => panic!("{}: unexpected {:?}", arg, other),
            }
        }

        let err = one(ComparisonOp::Gt, Argument::bare("yesterday"), ValueDomain::Timestamp).unwrap_err();
        assert_eq!(err.code(), "invalid_value");
    }
}
