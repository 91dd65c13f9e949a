//! Common error types for Strata core values.

use thiserror::Error;

/// Errors raised by malformed conditions.
///
/// A condition that simply does not hold is not an error; these variants
/// only cover shapes that cannot be evaluated at all.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConditionError {
    /// A range bound cannot be ordered against the field's value.
    #[error("Range on {field}: cannot compare {actual} against bound {bound}")]
    Incomparable {
        field: String,
        actual: String,
        bound: String,
    },

    /// A clause operand has a shape that cannot be evaluated.
    #[error("Malformed condition: {0}")]
    Malformed(String),
}

impl ConditionError {
    pub fn incomparable(
        field: impl Into<String>,
        actual: impl Into<String>,
        bound: impl Into<String>,
    ) -> Self {
        Self::Incomparable {
            field: field.into(),
            actual: actual.into(),
            bound: bound.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Result type for condition evaluation.
pub type ConditionResult<T> = Result<T, ConditionError>;
