//! Indexes for entity lookups.

use strata_core::{EntityId, TypeId, Value};
use std::collections::{BTreeSet, HashMap};

/// Type index: TypeId -> Set<EntityId>, kept in id order.
#[derive(Debug, Default)]
pub struct TypeIndex {
    index: HashMap<TypeId, BTreeSet<EntityId>>,
}

impl TypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, type_id: TypeId, id: EntityId) {
        self.index.entry(type_id).or_default().insert(id);
    }

    pub fn remove(&mut self, type_id: TypeId, id: EntityId) {
        if let Some(set) = self.index.get_mut(&type_id) {
            set.remove(&id);
            if set.is_empty() {
                self.index.remove(&type_id);
            }
        }
    }

    pub fn get(&self, type_id: TypeId) -> impl Iterator<Item = EntityId> + '_ {
        self.index
            .get(&type_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Ids of every entity of any of `type_ids`, ascending.
    pub fn get_all(&self, type_ids: &[TypeId]) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = type_ids.iter().flat_map(|&t| self.get(t)).collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Simplified value for unique indexing.
/// Nulls and arrays are not indexed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexValue {
    Bool(bool),
    Int(i64),
    /// Bit pattern of a float; integral floats index as Int.
    Float(u64),
    String(String),
    Date(i32),
    Timestamp(i64),
    Ref(u64),
}

impl IndexValue {
    pub fn from_value(value: &Value) -> Option<Self> {
        use chrono::Datelike;
        match value {
            Value::Bool(b) => Some(IndexValue::Bool(*b)),
            Value::Int(i) => Some(IndexValue::Int(*i)),
            Value::Float(f) if f.fract() == 0.0 && f.is_finite() => {
                Some(IndexValue::Int(*f as i64))
            }
            Value::Float(f) => Some(IndexValue::Float(f.to_bits())),
            Value::String(s) => Some(IndexValue::String(s.clone())),
            Value::Date(d) => Some(IndexValue::Date(d.num_days_from_ce())),
            Value::Timestamp(t) => Some(IndexValue::Timestamp(t.timestamp_micros())),
            Value::Ref(id) => Some(IndexValue::Ref(id.raw())),
            Value::Null | Value::List(_) => None,
        }
    }
}

/// Key for the unique index: (scope type, field name, value).
///
/// The scope is the type declaring the unique attribute, so values are
/// unique across all of that type's subtypes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UniqueKey {
    pub scope: TypeId,
    pub field: String,
    pub value: IndexValue,
}

/// Unique index: (scope, field, value) -> EntityId.
#[derive(Debug, Default)]
pub struct UniqueIndex {
    /// For each concrete type, its unique fields and their scopes.
    fields: HashMap<TypeId, Vec<(String, TypeId)>>,
    entries: HashMap<UniqueKey, EntityId>,
}

impl UniqueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `field` unique on concrete `type_id` within `scope`.
    pub fn register(&mut self, type_id: TypeId, field: impl Into<String>, scope: TypeId) {
        self.fields.entry(type_id).or_default().push((field.into(), scope));
    }

    /// Unique fields of a concrete type with their scopes.
    pub fn fields_of(&self, type_id: TypeId) -> &[(String, TypeId)] {
        self.fields.get(&type_id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn key(&self, type_id: TypeId, field: &str, value: &Value) -> Option<UniqueKey> {
        let scope = self
            .fields_of(type_id)
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, scope)| *scope)?;
        Some(UniqueKey {
            scope,
            field: field.to_string(),
            value: IndexValue::from_value(value)?,
        })
    }

    /// The entity holding `value` for `field`, if the field is unique on
    /// `type_id` and the value is indexed.
    pub fn lookup(&self, type_id: TypeId, field: &str, value: &Value) -> Option<EntityId> {
        let key = self.key(type_id, field, value)?;
        self.entries.get(&key).copied()
    }

    pub fn insert(&mut self, type_id: TypeId, field: &str, value: &Value, id: EntityId) {
        if let Some(key) = self.key(type_id, field, value) {
            self.entries.insert(key, id);
        }
    }

    pub fn remove(&mut self, type_id: TypeId, field: &str, value: &Value, id: EntityId) {
        if let Some(key) = self.key(type_id, field, value) {
            if self.entries.get(&key) == Some(&id) {
                self.entries.remove(&key);
            }
        }
    }
}
