//! In-memory store.
//!
//! A transaction holds the store's lock for its whole lifetime and applies
//! writes directly to the shared state, recording an undo entry for each.
//! Commit discards the undo log; dropping an uncommitted transaction
//! replays it in reverse. This gives single-writer atomicity.

use crate::index::{TypeIndex, UniqueIndex};
use crate::{Store, StoreError, StoreResult, Transaction};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use strata_core::{Condition, Entity, EntityId, Fields, TypeId, Value};
use strata_registry::Registry;
use tracing::debug;

/// Shared state behind the store lock.
#[derive(Debug)]
struct StoreState {
    entities: BTreeMap<EntityId, Entity>,
    type_index: TypeIndex,
    unique_index: UniqueIndex,
    type_names: HashMap<TypeId, String>,
    next_id: u64,
}

impl StoreState {
    fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            type_index: TypeIndex::new(),
            unique_index: UniqueIndex::new(),
            type_names: HashMap::new(),
            next_id: 1,
        }
    }

    fn index(&mut self, entity: &Entity) {
        self.type_index.insert(entity.type_id, entity.id);
        let fields: Vec<String> = self
            .unique_index
            .fields_of(entity.type_id)
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        for field in fields {
            if let Some(value) = entity.get(&field) {
                self.unique_index.insert(entity.type_id, &field, value, entity.id);
            }
        }
    }

    fn unindex(&mut self, entity: &Entity) {
        self.type_index.remove(entity.type_id, entity.id);
        let fields: Vec<String> = self
            .unique_index
            .fields_of(entity.type_id)
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        for field in fields {
            if let Some(value) = entity.get(&field) {
                self.unique_index.remove(entity.type_id, &field, value, entity.id);
            }
        }
    }

    /// Fails when any unique field of `entity` is held by another entity.
    fn check_unique(&self, entity: &Entity) -> StoreResult<()> {
        for (field, _) in self.unique_index.fields_of(entity.type_id) {
            let Some(value) = entity.get(field) else {
                continue;
            };
            match self.unique_index.lookup(entity.type_id, field, value) {
                Some(holder) if holder != entity.id => {
                    let type_name = self
                        .type_names
                        .get(&entity.type_id)
                        .map(String::as_str)
                        .unwrap_or("unknown");
                    return Err(StoreError::unique_violation(
                        type_name,
                        field,
                        value.to_string(),
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn put(&mut self, entity: Entity) {
        self.index(&entity);
        self.entities.insert(entity.id, entity);
    }

    fn take(&mut self, id: EntityId) -> Option<Entity> {
        let entity = self.entities.remove(&id)?;
        self.unindex(&entity);
        Some(entity)
    }
}

/// In-memory [`Store`] with type and unique indexes.
#[derive(Debug)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Create a store for the entity types of `registry`, indexing every
    /// unique attribute of every concrete type.
    pub fn for_registry(registry: &Registry) -> Self {
        let mut state = StoreState::new();
        for type_def in registry.all_types() {
            state.type_names.insert(type_def.id, type_def.name.clone());
            if type_def.is_abstract {
                continue;
            }
            for attr in registry.unique_attrs(type_def.id) {
                let scope = registry
                    .attr_owner(type_def.id, &attr.name)
                    .unwrap_or(type_def.id);
                state.unique_index.register(type_def.id, attr.name.clone(), scope);
            }
        }
        Self {
            state: Mutex::new(state),
        }
    }

    /// Begin a transaction with its concrete type.
    pub fn transaction(&self) -> MemoryTransaction<'_> {
        // A panicking transaction undoes its writes in Drop before the
        // lock is released, so a poisoned state is still consistent.
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let first_id = state.next_id;
        MemoryTransaction {
            state,
            undo: Vec::new(),
            first_id,
            committed: false,
        }
    }

    /// Number of stored entities.
    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entities
            .len()
    }

    /// Whether the store holds no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Store for MemoryStore {
    fn begin(&self) -> StoreResult<Box<dyn Transaction + '_>> {
        Ok(Box::new(self.transaction()))
    }
}

/// Undo record for one write.
#[derive(Debug)]
enum Undo {
    Inserted(EntityId),
    Updated(Entity),
    Deleted(Entity),
}

/// A transaction over a [`MemoryStore`].
pub struct MemoryTransaction<'s> {
    state: MutexGuard<'s, StoreState>,
    undo: Vec<Undo>,
    first_id: u64,
    committed: bool,
}

impl MemoryTransaction<'_> {
    fn rollback(&mut self) {
        let writes = self.undo.len();
        while let Some(entry) = self.undo.pop() {
            match entry {
                Undo::Inserted(id) => {
                    self.state.take(id);
                }
                Undo::Updated(prior) => {
                    self.state.take(prior.id);
                    self.state.put(prior);
                }
                Undo::Deleted(prior) => {
                    self.state.put(prior);
                }
            }
        }
        self.state.next_id = self.first_id;
        debug!(writes, "memory transaction rolled back");
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn get(&self, id: EntityId) -> StoreResult<Option<Entity>> {
        Ok(self.state.entities.get(&id).cloned())
    }

    fn find_many(&self, type_ids: &[TypeId], condition: &Condition) -> StoreResult<Vec<Entity>> {
        let mut found = Vec::new();
        for id in self.state.type_index.get_all(type_ids) {
            let Some(entity) = self.state.entities.get(&id) else {
                continue;
            };
            if condition.evaluate(entity)? {
                found.push(entity.clone());
            }
        }
        Ok(found)
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.state.next_id);
        self.state.next_id += 1;
        id
    }

    fn insert(&mut self, entity: Entity) -> StoreResult<()> {
        if self.state.entities.contains_key(&entity.id) {
            return Err(StoreError::backend(format!(
                "entity {} already exists",
                entity.id
            )));
        }
        self.state.check_unique(&entity)?;
        self.undo.push(Undo::Inserted(entity.id));
        self.state.put(entity);
        Ok(())
    }

    fn update(&mut self, id: EntityId, changes: Fields, now: DateTime<Utc>) -> StoreResult<Entity> {
        let prior = self
            .state
            .entities
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))?;
        let mut next = prior.clone();
        next.apply(changes, now);
        self.state.check_unique(&next)?;

        self.state.take(id);
        self.state.put(next.clone());
        self.undo.push(Undo::Updated(prior));
        Ok(next)
    }

    fn delete(&mut self, id: EntityId) -> StoreResult<Entity> {
        let prior = self.state.take(id).ok_or(StoreError::NotFound(id))?;
        self.undo.push(Undo::Deleted(prior.clone()));
        Ok(prior)
    }

    fn exists_unique(
        &self,
        type_id: TypeId,
        field: &str,
        value: &Value,
        exclude: Option<EntityId>,
    ) -> bool {
        match self.state.unique_index.lookup(type_id, field, value) {
            Some(holder) => Some(holder) != exclude,
            None => false,
        }
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        debug!(writes = self.undo.len(), "memory transaction committed");
        self.undo.clear();
        self.committed = true;
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}
