//! Mutation error types.

use strata_core::ConditionError;
use strata_store::StoreError;
use thiserror::Error;

/// Result type for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Which uniqueness rule a write broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    /// A single create or update collided with an existing value.
    Duplicate,
    /// A bulk update would give several records the same unique value.
    Multiple,
}

/// Errors that can occur during mutation execution.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Malformed input, or a selector that matched more than one record.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// A required target does not exist.
    #[error("{type_name} not found for {selector}")]
    NotFound { type_name: String, selector: String },

    /// A uniqueness constraint was violated.
    #[error("Conflict: {message}")]
    Conflict { kind: ConflictKind, message: String },

    /// The store failed.
    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl MutationError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(type_name: impl Into<String>, selector: impl Into<String>) -> Self {
        Self::NotFound {
            type_name: type_name.into(),
            selector: selector.into(),
        }
    }

    pub fn duplicate(
        type_name: impl AsRef<str>,
        field: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Self {
        Self::Conflict {
            kind: ConflictKind::Duplicate,
            message: format!(
                "duplicate value {} for unique field {}.{}",
                value.as_ref(),
                type_name.as_ref(),
                field.as_ref()
            ),
        }
    }

    pub fn multiple(type_name: impl AsRef<str>, field: impl AsRef<str>, count: usize) -> Self {
        Self::Conflict {
            kind: ConflictKind::Multiple,
            message: format!(
                "cannot set unique field {}.{} to one value on multiple records ({} matched)",
                type_name.as_ref(),
                field.as_ref(),
                count
            ),
        }
    }

    pub fn unknown_type(name: impl AsRef<str>) -> Self {
        Self::validation(format!("unknown type {}", name.as_ref()))
    }

    pub fn unknown_field(type_name: impl AsRef<str>, field: impl AsRef<str>) -> Self {
        Self::validation(format!(
            "unknown field {} on type {}",
            field.as_ref(),
            type_name.as_ref()
        ))
    }

    /// The conflict kind, for conflict errors.
    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        match self {
            MutationError::Conflict { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, MutationError::Validation { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MutationError::NotFound { .. })
    }
}

impl From<StoreError> for MutationError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Ambiguous { count } => Self::validation(format!(
                "where matched {} records where exactly one is required",
                count
            )),
            StoreError::UniqueViolation {
                type_name,
                field,
                value,
            } => Self::duplicate(type_name, field, value),
            StoreError::Condition(e) => e.into(),
            other => Self::Storage(other),
        }
    }
}

impl From<ConditionError> for MutationError {
    fn from(e: ConditionError) -> Self {
        Self::validation(e.to_string())
    }
}
