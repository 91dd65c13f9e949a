//! Entity records.
//!
//! An entity is a record of a declared type with an immutable id, its
//! field values and `created`/`updated` timestamps.

use crate::{EntityId, Fields, TypeId, Value};
use chrono::{DateTime, Utc};
use std::borrow::Cow;

/// Names of fields every entity carries without declaring them.
pub const ID_FIELD: &str = "id";
pub const CREATED_FIELD: &str = "created";
pub const UPDATED_FIELD: &str = "updated";

/// Returns true for `id`, `created` and `updated`.
pub fn is_builtin_field(name: &str) -> bool {
    matches!(name, ID_FIELD | CREATED_FIELD | UPDATED_FIELD)
}

/// A stored entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Unique identifier for this entity.
    pub id: EntityId,
    /// Concrete type of this entity (reference to registry).
    pub type_id: TypeId,
    /// When the entity was inserted. Never changes.
    pub created: DateTime<Utc>,
    /// When the entity was last written.
    pub updated: DateTime<Utc>,
    /// Field values, including stored relation references.
    pub fields: Fields,
}

impl Entity {
    /// Create a new entity stamped with `now` for both timestamps.
    pub fn new(id: EntityId, type_id: TypeId, fields: Fields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            type_id,
            created: now,
            updated: now,
            fields,
        }
    }

    /// Get a stored field value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Get a field value by name, resolving the built-in `id`, `created`
    /// and `updated` fields as well as stored ones.
    pub fn value_of(&self, name: &str) -> Cow<'_, Value> {
        match name {
            ID_FIELD => Cow::Owned(Value::Ref(self.id)),
            CREATED_FIELD => Cow::Owned(Value::Timestamp(self.created)),
            UPDATED_FIELD => Cow::Owned(Value::Timestamp(self.updated)),
            _ => self
                .fields
                .get(name)
                .map(Cow::Borrowed)
                .unwrap_or(Cow::Owned(Value::Null)),
        }
    }

    /// Set a field value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Merge `changes` into the stored fields and stamp `updated`.
    pub fn apply(&mut self, changes: Fields, now: DateTime<Utc>) {
        self.fields.extend(changes);
        self.updated = now;
    }
}
