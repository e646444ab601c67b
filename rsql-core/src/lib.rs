//! RSQL Core - Filter Types
//!
//! Shared vocabulary for RSQL filtering. Every other crate depends on this.
//! This crate holds data types and pure lookups only:
//! - the per-entity field schema registry
//! - the store-facing predicate plan
//! - placeholders, clocks and configuration
//! - the error taxonomy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod clock;
pub mod config;
pub mod entities;
pub mod error;
pub mod operator;
pub mod placeholder;
pub mod predicate;
pub mod registry;

pub use clock::*;
pub use config::*;
pub use entities::*;
pub use error::*;
pub use operator::*;
pub use placeholder::*;
pub use predicate::*;
pub use registry::*;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// ENTITY TYPES
// ============================================================================

/// Entity collections that can be filtered with RSQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    Target,
    TargetType,
    DistributionSet,
}

impl EntityType {
    pub const ALL: [EntityType; 3] = [
        EntityType::Target,
        EntityType::TargetType,
        EntityType::DistributionSet,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Target => "Target",
            EntityType::TargetType => "TargetType",
            EntityType::DistributionSet => "DistributionSet",
        }
    }

    /// Parse the entity-type token a caller passes alongside a filter.
    /// Matching ignores case, `-` and `_`.
    pub fn from_token(token: &str) -> Option<Self> {
        let normalized: String = token
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "target" | "targets" => Some(EntityType::Target),
            "targettype" | "targettypes" => Some(EntityType::TargetType),
            "distributionset" | "distributionsets" | "ds" => Some(EntityType::DistributionSet),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
