//! Error types for RSQL filtering

use crate::EntityType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Malformed RSQL text, reported with the fragment the parser choked on.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("Syntax error at line {line}, column {column}: {message} (near '{fragment}')")]
pub struct SyntaxError {
    pub message: String,
    pub fragment: String,
    pub line: usize,
    pub column: usize,
}

impl SyntaxError {
    pub fn new(
        message: impl Into<String>,
        fragment: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self {
            message: message.into(),
            fragment: fragment.into(),
            line,
            column,
        }
    }
}

/// Filter errors. All of them are caller input errors: they abort the whole
/// request and are never retried. An oversize page request is reported here
/// too since it is rejected before the store is reached.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("Unsupported field '{path}': '{segment}' {reason}")]
    UnsupportedField {
        path: String,
        segment: String,
        reason: String,
    },

    #[error("Operator '{operator}' is not supported on {domain} field '{path}'")]
    UnsupportedOperator {
        path: String,
        operator: String,
        domain: String,
    },

    #[error("Unknown placeholder: {token}")]
    UnknownPlaceholder { token: String },

    #[error("Invalid value '{value}' for field '{path}': {reason}")]
    InvalidValue {
        path: String,
        value: String,
        reason: String,
    },

    #[error("Page limit {limit} exceeds the maximum page size of {max}")]
    PageLimitExceeded { limit: usize, max: usize },
}

impl FilterError {
    /// Stable, machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            FilterError::Syntax(_) => "syntax_error",
            FilterError::UnsupportedField { .. } => "unsupported_field",
            FilterError::UnsupportedOperator { .. } => "unsupported_operator",
            FilterError::UnknownPlaceholder { .. } => "unknown_placeholder",
            FilterError::InvalidValue { .. } => "invalid_value",
            FilterError::PageLimitExceeded { .. } => "page_limit_exceeded",
        }
    }

    pub fn unsupported_field(
        path: &str,
        segment: &str,
        reason: impl Into<String>,
    ) -> Self {
        FilterError::UnsupportedField {
            path: path.to_string(),
            segment: segment.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the query executor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Unknown sort column: {column}")]
    UnknownSortColumn { column: String },

    #[error("Invalid pattern {pattern}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Plan for {plan} executed against a {store} store")]
    EntityMismatch { plan: EntityType, store: EntityType },

    #[error("Store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse configuration: {reason}")]
    Parse { reason: String },
}

/// Master error type for all RSQL errors.
#[derive(Debug, Clone, Error)]
pub enum RsqlError {
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<SyntaxError> for RsqlError {
    fn from(err: SyntaxError) -> Self {
        RsqlError::Filter(FilterError::Syntax(err))
    }
}

/// Result type alias for RSQL operations.
pub type RsqlResult<T> = Result<T, RsqlError>;

// =============================================================================
// TESTS
// =============================================================================
