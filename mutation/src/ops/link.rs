//! Nested relation operations, link and unlink.
//!
//! Link storage has four cases: the addressed relation is owning (the
//! parent stores the reference) or inverse (the child stores it in the
//! mirrored field), and the stored side is to-one or to-many. Every case
//! keeps the to-one invariant: an entity linked through a to-one side has
//! exactly one partner, and linking a new one releases the old.

use strata_core::{Condition, Entity, EntityId, TypeId, Value};
use strata_registry::RelationDef;
use tracing::debug;

use crate::config::MissingTargetPolicy;
use crate::error::{MutationError, MutationResult};
use crate::input::{RelationOp, RelationWrite};
use crate::resolver::{inverse_side, linked, owning_side, references, single, Resolver};
use crate::result::EdgeChange;

/// `value` with every reference to `id` removed. A to-one reference
/// becomes null.
pub(crate) fn without_ref(value: &Value, id: EntityId) -> Value {
    match value {
        Value::Ref(current) if *current == id => Value::Null,
        Value::List(items) => Value::List(
            items
                .iter()
                .filter(|item| item.as_ref_id() != Some(id))
                .cloned()
                .collect(),
        ),
        other => other.clone(),
    }
}

fn with_ref(value: &Value, id: EntityId) -> Value {
    let mut items = match value {
        Value::List(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };
    items.push(Value::Ref(id));
    Value::List(items)
}

impl Resolver<'_> {
    /// Resolve the relation writes of a payload on `parent`.
    pub(crate) fn write_relations(
        &mut self,
        parent: EntityId,
        writes: &[RelationWrite],
    ) -> MutationResult<()> {
        for write in writes {
            for group in &write.groups {
                for op in &group.ops {
                    self.relation_op(parent, &write.field, group.target, op)?;
                }
            }
        }
        Ok(())
    }

    fn relation_op(
        &mut self,
        parent_id: EntityId,
        field: &str,
        target: TypeId,
        op: &RelationOp,
    ) -> MutationResult<()> {
        let registry = self.registry;
        let parent = self.load(parent_id)?;
        let parent_type = registry.type_name(parent.type_id);
        let rel = registry
            .get_relation(parent.type_id, field)
            .ok_or_else(|| MutationError::unknown_field(parent_type, field))?;

        match op {
            RelationOp::Create(payload) => {
                let child = self.create(payload)?;
                self.link(parent_id, rel, child)
            }
            RelationOp::Connect(selector) => {
                let child = self.txn.find_one(&[target], selector)?.ok_or_else(|| {
                    MutationError::not_found(registry.type_name(target), selector.to_string())
                })?;
                self.link(parent_id, rel, child.id)
            }
            RelationOp::Disconnect(selector) => {
                for child in self.linked_matching(&parent, rel, target, selector.as_ref())? {
                    self.unlink(parent_id, rel, &child)?;
                }
                Ok(())
            }
            RelationOp::Delete(selector) => {
                for child in self.linked_matching(&parent, rel, target, selector.as_ref())? {
                    self.delete(child.id)?;
                }
                Ok(())
            }
            RelationOp::Update { selector, data } => {
                let children = self.linked_matching(&parent, rel, target, selector.as_ref())?;
                if children.is_empty() && selector.is_none() {
                    if self.config.missing_nested_target == MissingTargetPolicy::Error {
                        return Err(MutationError::not_found(
                            registry.type_name(target),
                            format!("{}.{} of {}", parent_type, field, parent_id),
                        ));
                    }
                    debug!(parent = %parent_id, field, "nested update found no linked entity");
                }
                for child in &children {
                    self.update(child, data)?;
                }
                Ok(())
            }
            RelationOp::Upsert {
                selector,
                create,
                update,
            } => {
                let existing = match selector {
                    Some(selector) => self.txn.find_one(&[target], selector)?,
                    None => self
                        .linked_matching(&parent, rel, target, None)?
                        .into_iter()
                        .next(),
                };
                match existing {
                    Some(child) => {
                        self.update(&child, update)?;
                        self.link(parent_id, rel, child.id)
                    }
                    None => {
                        let child = self.create(create)?;
                        self.link(parent_id, rel, child)
                    }
                }
            }
        }
    }

    /// Entities of `target` linked from `parent` through `rel` that satisfy
    /// `selector`.
    fn linked_matching(
        &self,
        parent: &Entity,
        rel: &RelationDef,
        target: TypeId,
        selector: Option<&Condition>,
    ) -> MutationResult<Vec<Entity>> {
        let mut result = Vec::new();
        for child in linked(&*self.txn, self.registry, parent, rel)? {
            if child.type_id != target {
                continue;
            }
            let selected = match selector {
                Some(selector) => selector.evaluate(&child)?,
                None => true,
            };
            if selected {
                result.push(child);
            }
        }
        Ok(result)
    }

    /// Link `child_id` to `parent_id` through `rel`. Linking an already
    /// linked pair changes nothing.
    pub(crate) fn link(
        &mut self,
        parent_id: EntityId,
        rel: &RelationDef,
        child_id: EntityId,
    ) -> MutationResult<()> {
        let registry = self.registry;
        let child = self.load(child_id)?;
        if !rel.accepts(child.type_id) {
            return Err(MutationError::validation(format!(
                "{} cannot be linked through {}",
                registry.type_name(child.type_id),
                rel.name
            )));
        }

        if rel.is_owning() {
            let parent = self.load(parent_id)?;
            let current = parent.value_of(&rel.name).into_owned();
            if current.refs().contains(&child_id) {
                return Ok(());
            }
            if inverse_side(registry, rel).map(|inv| !inv.is_many()).unwrap_or(false) {
                self.release_holders(rel, child_id, parent_id)?;
            }
            let next = if rel.is_many() {
                with_ref(&current, child_id)
            } else {
                for previous in current.refs() {
                    self.effects
                        .record_unlinked(EdgeChange::new(parent_id, rel.name.clone(), previous));
                }
                Value::Ref(child_id)
            };
            self.write(parent_id, single(&rel.name, next))?;
        } else {
            let owning = owning_side(registry, rel).ok_or_else(|| {
                MutationError::validation(format!("relation {} has no owning side", rel.name))
            })?;
            let current = child.value_of(&owning.name).into_owned();
            if current.refs().contains(&parent_id) {
                return Ok(());
            }
            if !rel.is_many() {
                let parent = self.load(parent_id)?;
                for occupant in linked(&*self.txn, registry, &parent, rel)? {
                    self.unlink(parent_id, rel, &occupant)?;
                }
            }
            let next = if owning.is_many() {
                with_ref(&current, parent_id)
            } else {
                for previous in current.refs() {
                    self.effects
                        .record_unlinked(EdgeChange::new(previous, rel.name.clone(), child_id));
                }
                Value::Ref(parent_id)
            };
            self.write(child_id, single(&owning.name, next))?;
        }

        self.effects
            .record_linked(EdgeChange::new(parent_id, rel.name.clone(), child_id));
        debug!(parent = %parent_id, field = %rel.name, child = %child_id, "linked");
        Ok(())
    }

    /// Remove the link between `parent_id` and `child` through `rel`.
    pub(crate) fn unlink(
        &mut self,
        parent_id: EntityId,
        rel: &RelationDef,
        child: &Entity,
    ) -> MutationResult<()> {
        if rel.is_owning() {
            let parent = self.load(parent_id)?;
            let cleared = without_ref(&parent.value_of(&rel.name), child.id);
            self.write(parent_id, single(&rel.name, cleared))?;
        } else {
            let Some(owning) = owning_side(self.registry, rel) else {
                return Ok(());
            };
            let cleared = without_ref(&child.value_of(&owning.name), parent_id);
            self.write(child.id, single(&owning.name, cleared))?;
        }
        self.effects
            .record_unlinked(EdgeChange::new(parent_id, rel.name.clone(), child.id));
        debug!(parent = %parent_id, field = %rel.name, child = %child.id, "unlinked");
        Ok(())
    }

    /// Clear `rel` references to `child_id` held by anyone but `keep`.
    /// Used when the child's side of the relation is to-one.
    fn release_holders(
        &mut self,
        rel: &RelationDef,
        child_id: EntityId,
        keep: EntityId,
    ) -> MutationResult<()> {
        let registry = self.registry;
        let child = self.load(child_id)?;
        let holder_types: Vec<TypeId> = registry
            .referencing_relations(child.type_id)
            .into_iter()
            .filter(|(_, r)| r.name == rel.name && r.mirror == rel.mirror)
            .map(|(holder_type, _)| holder_type)
            .collect();
        for holder in self.txn.find_many(&holder_types, &references(rel, child_id))? {
            if holder.id == keep {
                continue;
            }
            self.unlink(holder.id, rel, &child)?;
        }
        Ok(())
    }
}
