//! Filterable entity records

use crate::Timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// UPDATE STATUS
// ============================================================================

/// Lower-case names of every [`UpdateStatus`], in declaration order.
pub const UPDATE_STATUS_NAMES: &[&str] = &["error", "in_sync", "pending", "registered", "unknown"];

/// Software update state of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateStatus {
    Error,
    InSync,
    Pending,
    Registered,
    #[default]
    Unknown,
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Error => "error",
            UpdateStatus::InSync => "in_sync",
            UpdateStatus::Pending => "pending",
            UpdateStatus::Registered => "registered",
            UpdateStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn epoch() -> Timestamp {
    DateTime::<Utc>::UNIX_EPOCH
}

// ============================================================================
// DISTRIBUTION SETS
// ============================================================================

/// Type of a distribution set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSetType {
    pub key: String,
    pub name: String,
}

/// A bundle of software modules that can be assigned to targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSet {
    pub id: i64,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub last_modified_at: Timestamp,
    pub complete: bool,
    pub ds_type: Option<DistributionSetType>,
    pub tags: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

impl DistributionSet {
    pub fn new(id: i64, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            version: version.into(),
            description: None,
            created_at: epoch(),
            last_modified_at: epoch(),
            complete: false,
            ds_type: None,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_type(mut self, key: impl Into<String>, name: impl Into<String>) -> Self {
        self.ds_type = Some(DistributionSetType {
            key: key.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn complete(mut self) -> Self {
        self.complete = true;
        self
    }

    pub fn created(mut self, at: Timestamp) -> Self {
        self.created_at = at;
        self.last_modified_at = at;
        self
    }
}

// ============================================================================
// TARGET TYPES
// ============================================================================

/// Classification of targets (device families).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

impl TargetType {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

// ============================================================================
// TARGETS
// ============================================================================

/// A device that polls for software updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub controller_id: String,
    pub name: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub created_at: Timestamp,
    pub last_modified_at: Timestamp,
    pub update_status: UpdateStatus,
    /// Last time the controller polled, if ever.
    pub last_target_query: Option<Timestamp>,
    pub target_type: Option<TargetType>,
    pub assigned_ds: Option<DistributionSet>,
    pub installed_ds: Option<DistributionSet>,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    pub metadata: BTreeMap<String, String>,
}

impl Target {
    /// A new target named after its controller id.
    pub fn new(controller_id: impl Into<String>) -> Self {
        let controller_id = controller_id.into();
        Self {
            name: controller_id.clone(),
            controller_id,
            description: None,
            address: None,
            created_at: epoch(),
            last_modified_at: epoch(),
            update_status: UpdateStatus::Unknown,
            last_target_query: None,
            target_type: None,
            assigned_ds: None,
            installed_ds: None,
            tags: Vec::new(),
            attributes: BTreeMap::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_status(mut self, status: UpdateStatus) -> Self {
        self.update_status = status;
        self
    }

    pub fn polled_at(mut self, at: Timestamp) -> Self {
        self.last_target_query = Some(at);
        self
    }

    pub fn created(mut self, at: Timestamp) -> Self {
        self.created_at = at;
        self.last_modified_at = at;
        self
    }

    pub fn with_type(mut self, target_type: TargetType) -> Self {
        self.target_type = Some(target_type);
        self
    }

    pub fn with_assigned_ds(mut self, ds: DistributionSet) -> Self {
        self.assigned_ds = Some(ds);
        self
    }

    pub fn with_installed_ds(mut self, ds: DistributionSet) -> Self {
        self.installed_ds = Some(ds);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
