//! Storage error types.

use strata_core::{ConditionError, EntityId};
use thiserror::Error;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No entity with the given id.
    #[error("entity not found: {0}")]
    NotFound(EntityId),

    /// A single-entity lookup matched more than one entity.
    #[error("selector matched {count} entities")]
    Ambiguous { count: usize },

    /// A write would give two entities the same unique value.
    #[error("duplicate value {value} for unique field {type_name}.{field}")]
    UniqueViolation {
        type_name: String,
        field: String,
        value: String,
    },

    /// A filter could not be evaluated.
    #[error("condition error: {0}")]
    Condition(#[from] ConditionError),

    /// The backend itself failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn unique_violation(
        type_name: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self::UniqueViolation {
            type_name: type_name.into(),
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
