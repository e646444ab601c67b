//! Field Schema Registry
//!
//! A static, per-entity catalogue of the fields a filter may reference. Each
//! entry is a [`FieldDescriptor`] whose [`FieldMapping`] says how the field
//! reaches storage. Lookups are case-insensitive on the root name.
//!
//! Association sub-fields are a closed whitelist: a sub-field missing from
//! the descriptor is rejected even if the associated entity has it.

use crate::{ComparisonOp, EntityType, UPDATE_STATUS_NAMES};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// KINDS AND DOMAINS
// ============================================================================

/// Classification of a registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Scalar column on the root entity.
    Simple,
    /// Joined sub-entity, one level deep, with whitelisted sub-fields.
    Association,
    /// Open key/value child table; the sub-path is a caller-supplied key.
    Map,
    /// Collection association addressed without a sub-path (tag names).
    Virtual,
}

/// Value domain of a field. Drives operator validity and operand coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDomain {
    Text,
    Timestamp,
    Number,
    Bool,
    /// Closed set of lower-case variant names.
    Enum(&'static [&'static str]),
}

impl ValueDomain {
    pub fn name(&self) -> &'static str {
        match self {
            ValueDomain::Text => "text",
            ValueDomain::Timestamp => "timestamp",
            ValueDomain::Number => "number",
            ValueDomain::Bool => "bool",
            ValueDomain::Enum(_) => "enum",
        }
    }

    pub fn is_orderable(&self) -> bool {
        matches!(self, ValueDomain::Timestamp | ValueDomain::Number)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ValueDomain::Timestamp)
    }

    /// Only text values may carry `*` wildcards.
    pub fn accepts_wildcards(&self) -> bool {
        matches!(self, ValueDomain::Text)
    }

    pub fn supports(&self, op: ComparisonOp) -> bool {
        !op.is_ordering() || self.is_orderable()
    }
}

impl fmt::Display for ValueDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// A whitelisted sub-field of an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubField {
    pub name: &'static str,
    pub column: &'static str,
    pub domain: ValueDomain,
}

impl SubField {
    pub const fn text(name: &'static str, column: &'static str) -> Self {
        Self {
            name,
            column,
            domain: ValueDomain::Text,
        }
    }
}

/// How a field reaches storage. Each kind carries exactly what it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMapping {
    Simple {
        column: &'static str,
        domain: ValueDomain,
    },
    Association {
        join: &'static str,
        sub_fields: &'static [SubField],
    },
    /// Rows carry `key` and `value` columns; values are text.
    Map { join: &'static str },
    Virtual {
        join: &'static str,
        column: &'static str,
        domain: ValueDomain,
    },
}

/// A registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub mapping: FieldMapping,
}

impl FieldDescriptor {
    pub const fn simple(name: &'static str, column: &'static str, domain: ValueDomain) -> Self {
        Self {
            name,
            aliases: &[],
            mapping: FieldMapping::Simple { column, domain },
        }
    }

    pub const fn association(
        name: &'static str,
        join: &'static str,
        sub_fields: &'static [SubField],
    ) -> Self {
        Self {
            name,
            aliases: &[],
            mapping: FieldMapping::Association { join, sub_fields },
        }
    }

    pub const fn map(name: &'static str, join: &'static str) -> Self {
        Self {
            name,
            aliases: &[],
            mapping: FieldMapping::Map { join },
        }
    }

    pub const fn virtual_collection(
        name: &'static str,
        join: &'static str,
        column: &'static str,
        domain: ValueDomain,
    ) -> Self {
        Self {
            name,
            aliases: &[],
            mapping: FieldMapping::Virtual {
                join,
                column,
                domain,
            },
        }
    }

    pub const fn with_aliases(self, aliases: &'static [&'static str]) -> Self {
        Self { aliases, ..self }
    }

    pub fn kind(&self) -> FieldKind {
        match self.mapping {
            FieldMapping::Simple { .. } => FieldKind::Simple,
            FieldMapping::Association { .. } => FieldKind::Association,
            FieldMapping::Map { .. } => FieldKind::Map,
            FieldMapping::Virtual { .. } => FieldKind::Virtual,
        }
    }

    /// Whitelisted sub-fields; empty for every kind but association.
    pub fn sub_fields(&self) -> &'static [SubField] {
        match self.mapping {
            FieldMapping::Association { sub_fields, .. } => sub_fields,
            _ => &[],
        }
    }

    /// Case-insensitive sub-field lookup.
    pub fn sub_field(&self, name: &str) -> Option<&'static SubField> {
        self.sub_fields()
            .iter()
            .find(|sf| sf.name.eq_ignore_ascii_case(name))
    }
}

// ============================================================================
// STATIC TABLES
// ============================================================================

const DS_REF_FIELDS: &[SubField] = &[
    SubField::text("name", "name"),
    SubField::text("version", "version"),
];

const TARGET_TYPE_REF_FIELDS: &[SubField] = &[SubField::text("name", "name")];

const DS_TYPE_REF_FIELDS: &[SubField] = &[
    SubField::text("key", "key"),
    SubField::text("name", "name"),
];

/// Filterable target fields.
pub const TARGET_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::simple("ID", "controllerId", ValueDomain::Text),
    FieldDescriptor::simple("NAME", "name", ValueDomain::Text),
    FieldDescriptor::simple("DESCRIPTION", "description", ValueDomain::Text),
    FieldDescriptor::simple("CREATEDAT", "createdAt", ValueDomain::Timestamp),
    FieldDescriptor::simple("LASTMODIFIEDAT", "lastModifiedAt", ValueDomain::Timestamp),
    FieldDescriptor::simple("CONTROLLERID", "controllerId", ValueDomain::Text),
    FieldDescriptor::simple(
        "UPDATESTATUS",
        "updateStatus",
        ValueDomain::Enum(UPDATE_STATUS_NAMES),
    ),
    FieldDescriptor::simple("IPADDRESS", "address", ValueDomain::Text),
    FieldDescriptor::map("ATTRIBUTE", "controllerAttributes"),
    FieldDescriptor::association("ASSIGNEDDS", "assignedDistributionSet", DS_REF_FIELDS),
    FieldDescriptor::association("INSTALLEDDS", "installedDistributionSet", DS_REF_FIELDS),
    FieldDescriptor::virtual_collection("TAG", "tags", "name", ValueDomain::Text),
    FieldDescriptor::simple(
        "LASTCONTROLLERREQUESTAT",
        "lastTargetQuery",
        ValueDomain::Timestamp,
    )
    .with_aliases(&["LASTCONTACT"]),
    FieldDescriptor::map("METADATA", "metadata"),
    FieldDescriptor::association("TARGETTYPE", "targetType", TARGET_TYPE_REF_FIELDS),
];

/// Filterable target type fields.
pub const TARGET_TYPE_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::simple("ID", "id", ValueDomain::Number),
    FieldDescriptor::simple("NAME", "name", ValueDomain::Text),
    FieldDescriptor::simple("DESCRIPTION", "description", ValueDomain::Text),
];

/// Filterable distribution set fields.
pub const DISTRIBUTION_SET_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::simple("ID", "id", ValueDomain::Number),
    FieldDescriptor::simple("NAME", "name", ValueDomain::Text),
    FieldDescriptor::simple("VERSION", "version", ValueDomain::Text),
    FieldDescriptor::simple("DESCRIPTION", "description", ValueDomain::Text),
    FieldDescriptor::simple("CREATEDAT", "createdAt", ValueDomain::Timestamp),
    FieldDescriptor::simple("LASTMODIFIEDAT", "lastModifiedAt", ValueDomain::Timestamp),
    FieldDescriptor::simple("COMPLETE", "complete", ValueDomain::Bool),
    FieldDescriptor::association("TYPE", "type", DS_TYPE_REF_FIELDS),
    FieldDescriptor::virtual_collection("TAG", "tags", "name", ValueDomain::Text),
    FieldDescriptor::map("METADATA", "metadata"),
];

// ============================================================================
// REGISTRY
// ============================================================================

struct EntityTable {
    fields: &'static [FieldDescriptor],
    by_name: HashMap<String, usize>,
}

/// Immutable field catalogue for every entity type.
pub struct SchemaRegistry {
    tables: HashMap<EntityType, EntityTable>,
}

static GLOBAL: Lazy<SchemaRegistry> = Lazy::new(|| {
    SchemaRegistry::from_tables(&[
        (EntityType::Target, TARGET_FIELDS),
        (EntityType::TargetType, TARGET_TYPE_FIELDS),
        (EntityType::DistributionSet, DISTRIBUTION_SET_FIELDS),
    ])
});

impl SchemaRegistry {
    /// The process-wide registry, built on first use.
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL
    }

    /// Build a registry from explicit tables. Later duplicates of a name
    /// within one table are ignored.
    pub fn from_tables(tables: &[(EntityType, &'static [FieldDescriptor])]) -> Self {
        let tables = tables
            .iter()
            .map(|(entity, fields)| {
                let mut by_name = HashMap::new();
                for (idx, field) in fields.iter().enumerate() {
                    for name in std::iter::once(&field.name).chain(field.aliases) {
                        by_name.entry(name.to_ascii_uppercase()).or_insert(idx);
                    }
                }
                (*entity, EntityTable { fields, by_name })
            })
            .collect();
        Self { tables }
    }

    /// Look up a root field name, ignoring case.
    pub fn describe(&self, entity: EntityType, field_name: &str) -> Option<&FieldDescriptor> {
        let table = self.tables.get(&entity)?;
        let idx = table.by_name.get(&field_name.to_ascii_uppercase())?;
        table.fields.get(*idx)
    }

    /// Every field of an entity, in declaration order.
    pub fn fields(&self, entity: EntityType) -> &[FieldDescriptor] {
        self.tables.get(&entity).map(|t| t.fields).unwrap_or(&[])
    }
}

impl fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entities: Vec<_> = self.tables.keys().collect();
        entities.sort();
        f.debug_struct("SchemaRegistry")
            .field("entities", &entities)
            .finish()
    }
}
