//! Conditions over entity field values.
//!
//! A condition is a conjunction of clauses. The same type serves as the
//! row-selection predicate of bulk operations (`where.match`,
//! `where.exists`), as the selector of single-target operations and as the
//! gate of conditional updates (`conditions.range`).

use crate::{ConditionError, ConditionResult, Entity, Value};
use std::cmp::Ordering;
use std::fmt;

/// A single predicate on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// The field must equal the literal.
    Match { field: String, value: Value },
    /// The field's presence (non-null) must equal `present`.
    Exists { field: String, present: bool },
    /// The field must lie in `[lower, upper]`; a missing bound is open.
    Range {
        field: String,
        lower: Option<Value>,
        upper: Option<Value>,
    },
    /// The field must hold `value`, either as an array element or as its
    /// whole scalar value.
    Contains { field: String, value: Value },
}

impl Clause {
    /// The field this clause constrains.
    pub fn field(&self) -> &str {
        match self {
            Clause::Match { field, .. }
            | Clause::Exists { field, .. }
            | Clause::Range { field, .. }
            | Clause::Contains { field, .. } => field,
        }
    }

    /// Evaluate this clause against an entity.
    pub fn evaluate(&self, entity: &Entity) -> ConditionResult<bool> {
        let actual = entity.value_of(self.field());
        match self {
            Clause::Match { value, .. } => Ok(actual.loose_eq(value)),
            Clause::Exists { present, .. } => Ok(!actual.is_null() == *present),
            Clause::Contains { value, .. } => Ok(actual.contains(value)),
            Clause::Range {
                field,
                lower,
                upper,
            } => {
                if actual.is_null() {
                    return Ok(false);
                }
                let above = match lower {
                    Some(bound) => bound_order(field, &actual, bound)? != Ordering::Less,
                    None => true,
                };
                let below = match upper {
                    Some(bound) => bound_order(field, &actual, bound)? != Ordering::Greater,
                    None => true,
                };
                Ok(above && below)
            }
        }
    }
}

fn bound_order(field: &str, actual: &Value, bound: &Value) -> ConditionResult<Ordering> {
    if bound.is_list() || actual.is_list() {
        return Err(ConditionError::malformed(format!(
            "range on {} cannot use array operands",
            field
        )));
    }
    actual
        .compare(bound)
        .ok_or_else(|| ConditionError::incomparable(field, actual.type_name(), bound.type_name()))
}

/// A conjunction of clauses. The empty condition matches every entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Condition {
    clauses: Vec<Clause>,
}

impl Condition {
    /// The condition that matches everything.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality clause.
    pub fn matching(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Match {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Add a presence clause.
    pub fn exists(mut self, field: impl Into<String>, present: bool) -> Self {
        self.clauses.push(Clause::Exists {
            field: field.into(),
            present,
        });
        self
    }

    /// Add an inclusive range clause.
    pub fn range(
        mut self,
        field: impl Into<String>,
        lower: Option<Value>,
        upper: Option<Value>,
    ) -> Self {
        self.clauses.push(Clause::Range {
            field: field.into(),
            lower,
            upper,
        });
        self
    }

    /// Add a membership clause.
    pub fn containing(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Contains {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Add an arbitrary clause.
    pub fn with_clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Conjoin another condition.
    pub fn and(mut self, other: Condition) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    /// The clauses of this condition.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// True when there are no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluate every clause; all must hold.
    pub fn evaluate(&self, entity: &Entity) -> ConditionResult<bool> {
        for clause in &self.clauses {
            if !clause.evaluate(entity)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Match { field, value } => write!(f, "{} = {}", field, value),
            Clause::Exists { field, present: true } => write!(f, "{} exists", field),
            Clause::Exists { field, present: false } => write!(f, "{} is null", field),
            Clause::Range {
                field,
                lower,
                upper,
            } => {
                let show = |bound: &Option<Value>| {
                    bound.as_ref().map(Value::to_string).unwrap_or_else(|| "*".to_string())
                };
                write!(f, "{} in [{}, {}]", field, show(lower), show(upper))
            }
            Clause::Contains { field, value } => write!(f, "{} contains {}", field, value),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return write!(f, "*");
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " and ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}
