//! Relation resolver.
//!
//! Executes a normalized mutation against an open store transaction. A
//! single recursive dispatch walks the operation tree; the per-kind logic
//! lives in `ops/`:
//! - `ops/create.rs` - entity creation with nested writes
//! - `ops/update.rs` - field changes on an existing entity
//! - `ops/delete.rs` - deletion with reference clearing
//! - `ops/link.rs` - nested relation operations, link and unlink
//! - `ops/bulk.rs` - updateMany / deleteMany

use chrono::{DateTime, Utc};
use strata_core::{Condition, Entity, EntityId, Fields, TypeId, Value};
use strata_registry::{Registry, RelationDef};
use strata_store::{StoreError, Transaction};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{MutationError, MutationResult};
use crate::input::Mutation;
use crate::result::Effects;

/// What a resolved mutation produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The created or updated entity, or None when no target matched.
    Entity(Option<EntityId>),
    /// A conditional update was rejected. Holds the snapshot the
    /// conditions were evaluated against.
    Rejected(Entity),
    /// The last state of the deleted entity, or None when no target matched.
    Deleted(Option<Entity>),
    /// Affected-record count of a bulk mutation.
    Count(usize),
}

/// Resolves mutations inside one transaction.
pub struct Resolver<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) txn: &'a mut dyn Transaction,
    pub(crate) now: DateTime<Utc>,
    pub(crate) config: &'a EngineConfig,
    pub(crate) effects: Effects,
}

impl<'a> Resolver<'a> {
    /// Create a resolver stamping every write with `now`.
    pub fn new(
        registry: &'a Registry,
        txn: &'a mut dyn Transaction,
        now: DateTime<Utc>,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            registry,
            txn,
            now,
            config,
            effects: Effects::new(),
        }
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }

    pub fn into_effects(self) -> Effects {
        self.effects
    }

    /// Resolve a top-level mutation on `type_id`.
    pub fn resolve(&mut self, type_id: TypeId, mutation: &Mutation) -> MutationResult<Resolution> {
        match mutation {
            Mutation::Create { data } => Ok(Resolution::Entity(Some(self.create(data)?))),
            Mutation::Update {
                selector,
                conditions,
                data,
            } => {
                let Some(target) = self.find_target(type_id, selector)? else {
                    debug!(%selector, "update matched nothing");
                    return Ok(Resolution::Entity(None));
                };
                if let Some(conditions) = conditions {
                    if !conditions.evaluate(&target)? {
                        debug!(id = %target.id, %conditions, "conditions rejected update");
                        return Ok(Resolution::Rejected(target));
                    }
                }
                self.update(&target, data)?;
                Ok(Resolution::Entity(Some(target.id)))
            }
            Mutation::Upsert {
                selector,
                create,
                update,
            } => match self.find_target(type_id, selector)? {
                Some(target) => {
                    self.update(&target, update)?;
                    Ok(Resolution::Entity(Some(target.id)))
                }
                None => Ok(Resolution::Entity(Some(self.create(create)?))),
            },
            Mutation::Delete { selector } => match self.find_target(type_id, selector)? {
                Some(target) => Ok(Resolution::Deleted(Some(self.delete(target.id)?))),
                None => Ok(Resolution::Deleted(None)),
            },
            Mutation::UpdateMany { filter, data } => {
                Ok(Resolution::Count(self.update_many(type_id, filter, data)?))
            }
            Mutation::DeleteMany { filter } => {
                Ok(Resolution::Count(self.delete_many(type_id, filter)?))
            }
        }
    }

    /// The single entity of `type_id` (or a subtype) matching `selector`.
    pub(crate) fn find_target(
        &self,
        type_id: TypeId,
        selector: &Condition,
    ) -> MutationResult<Option<Entity>> {
        let types = self.registry.concrete_types(type_id);
        Ok(self.txn.find_one(&types, selector)?)
    }

    /// Load an entity that must exist.
    pub(crate) fn load(&self, id: EntityId) -> MutationResult<Entity> {
        self.txn
            .get(id)?
            .ok_or(MutationError::Storage(StoreError::NotFound(id)))
    }

    /// Write `changes` to an existing entity and record it as updated.
    pub(crate) fn write(&mut self, id: EntityId, changes: Fields) -> MutationResult<Entity> {
        let entity = self.txn.update(id, changes, self.now)?;
        self.effects.record_updated(id);
        Ok(entity)
    }
}

/// Entities linked from `entity` through `rel`.
///
/// Owning relations read the stored references in stored order. Inverse
/// relations query the target types for records whose owning field points
/// back at `entity`, in id order.
pub fn linked(
    txn: &dyn Transaction,
    registry: &Registry,
    entity: &Entity,
    rel: &RelationDef,
) -> MutationResult<Vec<Entity>> {
    if rel.is_owning() {
        let mut result = Vec::new();
        for id in entity.value_of(&rel.name).refs() {
            if let Some(child) = txn.get(id)? {
                result.push(child);
            }
        }
        return Ok(result);
    }
    let Some(owning) = owning_side(registry, rel) else {
        return Ok(Vec::new());
    };
    let condition = references(owning, entity.id);
    Ok(txn.find_many(&rel.concrete_targets, &condition)?)
}

/// The owning relation an inverse relation mirrors.
pub(crate) fn owning_side<'r>(registry: &'r Registry, rel: &RelationDef) -> Option<&'r RelationDef> {
    let field = rel.inverse_of.as_deref()?;
    rel.concrete_targets
        .iter()
        .find_map(|&target| registry.get_relation(target, field))
}

/// The inverse relation mirroring an owning relation, if declared.
pub(crate) fn inverse_side<'r>(registry: &'r Registry, rel: &RelationDef) -> Option<&'r RelationDef> {
    let field = rel.mirror.as_deref()?;
    rel.concrete_targets
        .iter()
        .find_map(|&target| registry.get_relation(target, field))
}

/// Condition matching holders whose owning `rel` field references `id`.
pub(crate) fn references(rel: &RelationDef, id: EntityId) -> Condition {
    if rel.is_many() {
        Condition::all().containing(rel.name.clone(), Value::Ref(id))
    } else {
        Condition::all().matching(rel.name.clone(), Value::Ref(id))
    }
}

/// A one-field change set.
pub(crate) fn single(field: &str, value: Value) -> Fields {
    let mut fields = Fields::new();
    fields.insert(field.to_string(), value);
    fields
}
