//! Row view of filterable entities
//!
//! The executor never sees entity structs directly. It reads named columns
//! of the root entity and the rows of named joins, using the same column and
//! join names the schema registry maps fields to.

use rsql_core::{DistributionSet, EntityType, Target, TargetType, Timestamp};
use std::collections::BTreeMap;

/// A single column value borrowed from an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreValue<'a> {
    Text(&'a str),
    Number(i64),
    Timestamp(Timestamp),
    Bool(bool),
    Null,
}

impl<'a> StoreValue<'a> {
    pub fn is_null(&self) -> bool {
        matches!(self, StoreValue::Null)
    }

    fn text(value: &'a Option<String>) -> Self {
        value.as_deref().map_or(StoreValue::Null, StoreValue::Text)
    }
}

/// One row of a joined table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row<'a> {
    cells: Vec<(&'static str, StoreValue<'a>)>,
}

impl<'a> Row<'a> {
    pub fn new(cells: Vec<(&'static str, StoreValue<'a>)>) -> Self {
        Self { cells }
    }

    /// Value of `column`, or null when the row has no such column.
    pub fn get(&self, column: &str) -> StoreValue<'a> {
        self.cells
            .iter()
            .find(|(name, _)| *name == column)
            .map_or(StoreValue::Null, |(_, value)| *value)
    }
}

/// Column name of map keys.
pub const KEY_COLUMN: &str = "key";
/// Column name of map values.
pub const VALUE_COLUMN: &str = "value";

/// An entity the in-memory executor can filter.
pub trait Filterable: Clone + Send + Sync {
    const ENTITY: EntityType;

    /// Root columns, in the order used for sort validation.
    const COLUMNS: &'static [&'static str];

    /// Value of a root column; unknown columns read as null.
    fn column(&self, name: &str) -> StoreValue<'_>;

    /// Rows of a join; unknown joins have no rows.
    fn join_rows(&self, join: &str) -> Vec<Row<'_>>;
}

fn map_rows(map: &BTreeMap<String, String>) -> Vec<Row<'_>> {
    map.iter()
        .map(|(k, v)| {
            Row::new(vec![
                (KEY_COLUMN, StoreValue::Text(k)),
                (VALUE_COLUMN, StoreValue::Text(v)),
            ])
        })
        .collect()
}

fn tag_rows(tags: &[String]) -> Vec<Row<'_>> {
    tags.iter()
        .map(|t| Row::new(vec![("name", StoreValue::Text(t))]))
        .collect()
}

fn ds_row(ds: &DistributionSet) -> Row<'_> {
    Row::new(vec![
        ("id", StoreValue::Number(ds.id)),
        ("name", StoreValue::Text(&ds.name)),
        ("version", StoreValue::Text(&ds.version)),
    ])
}

impl Filterable for Target {
    const ENTITY: EntityType = EntityType::Target;
    const COLUMNS: &'static [&'static str] = &[
        "controllerId",
        "name",
        "description",
        "address",
        "createdAt",
        "lastModifiedAt",
        "updateStatus",
        "lastTargetQuery",
    ];

    fn column(&self, name: &str) -> StoreValue<'_> {
        match name {
            "controllerId" => StoreValue::Text(&self.controller_id),
            "name" => StoreValue::Text(&self.name),
            "description" => StoreValue::text(&self.description),
            "address" => StoreValue::text(&self.address),
            "createdAt" => StoreValue::Timestamp(self.created_at),
            "lastModifiedAt" => StoreValue::Timestamp(self.last_modified_at),
            "updateStatus" => StoreValue::Text(self.update_status.as_str()),
            "lastTargetQuery" => self
                .last_target_query
                .map_or(StoreValue::Null, StoreValue::Timestamp),
            _ => StoreValue::Null,
        }
    }

    fn join_rows(&self, join: &str) -> Vec<Row<'_>> {
        match join {
            "tags" => tag_rows(&self.tags),
            "controllerAttributes" => map_rows(&self.attributes),
            "metadata" => map_rows(&self.metadata),
            "assignedDistributionSet" => self.assigned_ds.iter().map(ds_row).collect(),
            "installedDistributionSet" => self.installed_ds.iter().map(ds_row).collect(),
            "targetType" => self
                .target_type
                .iter()
                .map(|tt| {
                    Row::new(vec![
                        ("id", StoreValue::Number(tt.id)),
                        ("name", StoreValue::Text(&tt.name)),
                        ("description", StoreValue::text(&tt.description)),
                    ])
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Filterable for TargetType {
    const ENTITY: EntityType = EntityType::TargetType;
    const COLUMNS: &'static [&'static str] = &["id", "name", "description"];

    fn column(&self, name: &str) -> StoreValue<'_> {
        match name {
            "id" => StoreValue::Number(self.id),
            "name" => StoreValue::Text(&self.name),
            "description" => StoreValue::text(&self.description),
            _ => StoreValue::Null,
        }
    }

    fn join_rows(&self, _join: &str) -> Vec<Row<'_>> {
        Vec::new()
    }
}

impl Filterable for DistributionSet {
    const ENTITY: EntityType = EntityType::DistributionSet;
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "version",
        "description",
        "createdAt",
        "lastModifiedAt",
        "complete",
    ];

    fn column(&self, name: &str) -> StoreValue<'_> {
        match name {
            "id" => StoreValue::Number(self.id),
            "name" => StoreValue::Text(&self.name),
            "version" => StoreValue::Text(&self.version),
            "description" => StoreValue::text(&self.description),
            "createdAt" => StoreValue::Timestamp(self.created_at),
            "lastModifiedAt" => StoreValue::Timestamp(self.last_modified_at),
            "complete" => StoreValue::Bool(self.complete),
            _ => StoreValue::Null,
        }
    }

    fn join_rows(&self, join: &str) -> Vec<Row<'_>> {
        match join {
            "tags" => tag_rows(&self.tags),
            "metadata" => map_rows(&self.metadata),
            "type" => self
                .ds_type
                .iter()
                .map(|t| {
                    Row::new(vec![
                        ("key", StoreValue::Text(&t.key)),
                        ("name", StoreValue::Text(&t.name)),
                    ])
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::{SchemaRegistry, FieldMapping, UpdateStatus};

    #[test]
    fn test_target_columns_and_nulls() {
        let target = Target::new("dev-1")
            .with_description("desc")
            .with_status(UpdateStatus::InSync);
        assert_eq!(target.column("controllerId"), StoreValue::Text("dev-1"));
        assert_eq!(target.column("name"), StoreValue::Text("dev-1"));
        assert_eq!(target.column("description"), StoreValue::Text("desc"));
        assert_eq!(target.column("updateStatus"), StoreValue::Text("in_sync"));
        assert!(target.column("address").is_null());
        assert!(target.column("lastTargetQuery").is_null());
        assert!(target.column("bogus").is_null());
    }

    #[test]
    fn test_map_and_association_rows() {
        let target = Target::new("dev-1")
            .with_attribute("revision", "1.1")
            .with_metadata("a", "1")
            .with_metadata("b", "2")
            .with_type(TargetType::new(7, "Gateway"));

        let attrs = target.join_rows("controllerAttributes");
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].get(KEY_COLUMN), StoreValue::Text("revision"));
        assert_eq!(attrs[0].get(VALUE_COLUMN), StoreValue::Text("1.1"));

        assert_eq!(target.join_rows("metadata").len(), 2);
        assert_eq!(target.join_rows("targetType")[0].get("name"), StoreValue::Text("Gateway"));
        assert!(target.join_rows("assignedDistributionSet").is_empty());
        assert!(target.join_rows("nothing").is_empty());
    }

    /// Every column and join the registry maps to must be readable.
    #[test]
    fn test_registry_columns_are_known_to_records() {
        let registry = SchemaRegistry::global();
        let check = |entity: EntityType, columns: &[&str]| {
            for field in registry.fields(entity) {
                if let FieldMapping::Simple { column, .. } = field.mapping {
                    assert!(columns.contains(&column), "{} {}", entity, column);
                }
            }
        };
        check(EntityType::Target, Target::COLUMNS);
        check(EntityType::TargetType, TargetType::COLUMNS);
        check(EntityType::DistributionSet, DistributionSet::COLUMNS);
    }
}
