//! Path resolution and structural validation
//!
//! Walks every comparison leaf, resolves its selector against the schema
//! registry and checks the operator against the field's value domain. Pure:
//! the store is never consulted, so an unknown map key is valid here and
//! simply matches nothing at execution time.

use crate::parser::{Argument, FilterExpr, LogicalOp};
use rsql_core::{
    ComparisonOp, EntityType, FieldKind, FieldMapping, FilterError, SchemaRegistry, ValueDomain,
};

/// Where a resolved field lives in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldTarget {
    /// Column of the root entity.
    Column { column: &'static str },
    /// Column of a joined single entity.
    Association {
        join: &'static str,
        column: &'static str,
    },
    /// Value of the `key` row in a key/value child table.
    Map { join: &'static str, key: String },
    /// Column of a joined collection.
    Collection {
        join: &'static str,
        column: &'static str,
    },
}

/// A selector resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Canonical registry name of the root segment.
    pub root: &'static str,
    pub kind: FieldKind,
    pub target: FieldTarget,
    pub domain: ValueDomain,
}

/// A comparison whose field and operator have been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedComparison {
    pub path: String,
    pub field: ResolvedField,
    pub op: ComparisonOp,
    pub arguments: Vec<Argument>,
}

/// Validated expression. Groups are dropped: the tree shape already
/// encodes precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedExpr {
    Comparison(ValidatedComparison),
    And(Box<ValidatedExpr>, Box<ValidatedExpr>),
    Or(Box<ValidatedExpr>, Box<ValidatedExpr>),
}

impl ValidatedExpr {
    pub fn comparisons(&self) -> Vec<&ValidatedComparison> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(expr) = stack.pop() {
            match expr {
                ValidatedExpr::Comparison(c) => out.push(c),
                ValidatedExpr::And(l, r) | ValidatedExpr::Or(l, r) => {
                    stack.push(r);
                    stack.push(l);
                }
            }
        }
        out
    }
}

/// Validate every leaf of `expr` for `entity`. Stops at the first offending
/// leaf, left to right.
pub fn resolve(
    expr: &FilterExpr,
    entity: EntityType,
    registry: &SchemaRegistry,
) -> Result<ValidatedExpr, FilterError> {
    match expr {
        FilterExpr::Comparison(c) => {
            let field = resolve_path(&c.selector, entity, registry)?;
            if !field.domain.supports(c.op) {
                return Err(FilterError::UnsupportedOperator {
                    path: c.selector.clone(),
                    operator: c.op.symbol().to_string(),
                    domain: field.domain.name().to_string(),
                });
            }
            Ok(ValidatedExpr::Comparison(ValidatedComparison {
                path: c.selector.clone(),
                field,
                op: c.op,
                arguments: c.arguments.clone(),
            }))
        }
        FilterExpr::Logical { op, left, right } => {
            let left = Box::new(resolve(left, entity, registry)?);
            let right = Box::new(resolve(right, entity, registry)?);
            Ok(match op {
                LogicalOp::And => ValidatedExpr::And(left, right),
                LogicalOp::Or => ValidatedExpr::Or(left, right),
            })
        }
        FilterExpr::Group(inner) => resolve(inner, entity, registry),
    }
}

/// Resolve one selector. The path is split on the first dot only; for map
/// fields the remainder is the key, verbatim.
pub fn resolve_path(
    path: &str,
    entity: EntityType,
    registry: &SchemaRegistry,
) -> Result<ResolvedField, FilterError> {
    let (root, rest) = match path.split_once('.') {
        Some((root, rest)) => (root, Some(rest)),
        None => (path, None),
    };

    let descriptor = registry.describe(entity, root).ok_or_else(|| {
        FilterError::unsupported_field(path, root, format!("is not a filterable {} field", entity))
    })?;

    let (target, domain) = match descriptor.mapping {
        FieldMapping::Simple { column, domain } => {
            reject_sub_path(path, descriptor.name, rest)?;
            (FieldTarget::Column { column }, domain)
        }
        FieldMapping::Virtual {
            join,
            column,
            domain,
        } => {
            reject_sub_path(path, descriptor.name, rest)?;
            (FieldTarget::Collection { join, column }, domain)
        }
        FieldMapping::Association { join, sub_fields } => {
            let allowed = || {
                sub_fields
                    .iter()
                    .map(|sf| sf.name)
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let sub = rest.ok_or_else(|| {
                FilterError::unsupported_field(
                    path,
                    root,
                    format!("requires a sub-field (one of: {})", allowed()),
                )
            })?;
            if sub.contains('.') {
                return Err(FilterError::unsupported_field(
                    path,
                    sub,
                    "nests deeper than one level",
                ));
            }
            let sub_field = descriptor.sub_field(sub).ok_or_else(|| {
                FilterError::unsupported_field(
                    path,
                    sub,
                    format!("is not an allowed sub-field (one of: {})", allowed()),
                )
            })?;
            (
                FieldTarget::Association {
                    join,
                    column: sub_field.column,
                },
                sub_field.domain,
            )
        }
        FieldMapping::Map { join } => {
            let key = validate_map_key(path, root, rest)?;
            (
                FieldTarget::Map {
                    join,
                    key: key.to_string(),
                },
                ValueDomain::Text,
            )
        }
    };

    Ok(ResolvedField {
        root: descriptor.name,
        kind: descriptor.kind(),
        target,
        domain,
    })
}

fn reject_sub_path(path: &str, root: &str, rest: Option<&str>) -> Result<(), FilterError> {
    match rest {
        Some(sub) => Err(FilterError::unsupported_field(
            path,
            sub,
            format!("is not allowed: {} has no sub-fields", root),
        )),
        None => Ok(()),
    }
}

fn validate_map_key<'p>(path: &'p str, root: &str, rest: Option<&'p str>) -> Result<&'p str, FilterError> {
    let key = rest.ok_or_else(|| {
        FilterError::unsupported_field(path, root, "requires a key: use FIELD.key")
    })?;
    if key.is_empty() {
        return Err(FilterError::unsupported_field(path, key, "is an empty key"));
    }
    if key.starts_with('.') {
        return Err(FilterError::unsupported_field(
            path,
            key,
            "must be separated from the field by exactly one dot",
        ));
    }
    if key.chars().all(|c| c == '*') {
        return Err(FilterError::unsupported_field(
            path,
            key,
            "is a wildcard, not a key",
        ));
    }
    Ok(key)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn target(path: &str) -> Result<ResolvedField, FilterError> {
        resolve_path(path, EntityType::Target, SchemaRegistry::global())
    }

    fn failing_segment(path: &str) -> String {
        match target(path) {
            Err(FilterError::UnsupportedField { segment, .. }) => segment,
            other => panic!("expected UnsupportedField for {:?}, got {:?}", path, other),
        }
    }

    #[test]
    fn test_simple_field() {
        let field = target("controllerid").unwrap();
        assert_eq!(field.root, "CONTROLLERID");
        assert_eq!(field.target, FieldTarget::Column { column: "controllerId" });
        assert_eq!(field.domain, ValueDomain::Text);
    }

    #[test]
    fn test_unknown_root_names_root() {
        assert_eq!(failing_segment("wrongfield"), "wrongfield");
        assert_eq!(failing_segment("wrongfield.sub"), "wrongfield");
    }

    #[test]
    fn test_simple_and_virtual_reject_sub_paths() {
        assert_eq!(failing_segment("name.first"), "first");
        assert_eq!(failing_segment("tag.name"), "name");
    }

    #[test]
    fn test_association_whitelist() {
        let field = target("assignedds.VERSION").unwrap();
        assert_eq!(
            field.target,
            FieldTarget::Association {
                join: "assignedDistributionSet",
                column: "version"
            }
        );
        assert!(target("targettype.name").is_ok());
        assert_eq!(failing_segment("targettype.ID"), "ID");
        assert_eq!(failing_segment("targettype.description"), "description");
        assert_eq!(failing_segment("targettype"), "targettype");
        assert_eq!(failing_segment("assignedds.name.x"), "name.x");
    }

    #[test]
    fn test_map_paths() {
        let valid = [
            ("attribute.revision", "revision"),
            ("ATTRIBUTE.test.dot", "test.dot"),
            ("metadata.key.dot*", "key.dot*"),
            ("metadata.key.*", "key.*"),
            ("metadata.key.", "key."),
            ("metadata.key*", "key*"),
        ];
        for (path, key) in valid {
            let field = target(path).unwrap_or_else(|e| panic!("{}: {}", path, e));
            assert_eq!(
                field.target,
                FieldTarget::Map {
                    join: if path.to_ascii_uppercase().starts_with("ATTRIBUTE") {
                        "controllerAttributes"
                    } else {
                        "metadata"
                    },
                    key: key.to_string()
                },
                "{}",
                path
            );
        }

        let invalid = [
            "ATTRIBUTE.",
            "ATTRIBUTE..x",
            "ATTRIBUTE..",
            "ATTRIBUTE*",
            "ATTRIBUTE.*",
            "ATTRIBUTE",
            "METADATA.",
            "METADATA..x",
            "METADATA*",
            "METADATA.*",
            "METADATA",
        ];
        for path in invalid {
            assert!(
                matches!(target(path), Err(FilterError::UnsupportedField { .. })),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn test_operator_domain_check() {
        let expr = parse("name=lt=abc").unwrap();
        let err = resolve(&expr, EntityType::Target, SchemaRegistry::global()).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { ref domain, .. } if domain == "text"));

        let expr = parse("createdat=gt=0;lastcontact<=${NOW}").unwrap();
        assert!(resolve(&expr, EntityType::Target, SchemaRegistry::global()).is_ok());
    }

    #[test]
    fn test_first_offending_leaf_is_reported() {
        let expr = parse("name==a;bogus==b,other==c").unwrap();
        let err = resolve(&expr, EntityType::Target, SchemaRegistry::global()).unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedField { ref segment, .. } if segment == "bogus"));
    }

    #[test]
    fn test_groups_are_flattened() {
        let expr = parse("(name==a)").unwrap();
        let validated = resolve(&expr, EntityType::Target, SchemaRegistry::global()).unwrap();
        assert!(matches!(validated, ValidatedExpr::Comparison(_)));
        assert_eq!(validated.comparisons().len(), 1);
    }

    #[test]
    fn test_entity_specific_registries() {
        let registry = SchemaRegistry::global();
        assert!(resolve_path("complete", EntityType::DistributionSet, registry).is_ok());
        assert!(resolve_path("complete", EntityType::Target, registry).is_err());
        assert!(resolve_path("type.key", EntityType::DistributionSet, registry).is_ok());
        assert!(resolve_path("type.version", EntityType::DistributionSet, registry).is_err());
    }
}
