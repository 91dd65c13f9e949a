//! Strata Store
//!
//! Transactional entity storage behind the mutation engine:
//! - The [`Store`] and [`Transaction`] traits the engine writes through
//! - [`MemoryStore`], an in-memory backend with type and unique indexes

mod error;
mod index;
mod memory;

pub use error::{StoreError, StoreResult};
pub use index::{IndexValue, TypeIndex, UniqueIndex};
pub use memory::{MemoryStore, MemoryTransaction};

use strata_core::{Condition, Entity, EntityId, Fields, TypeId, Value};
use chrono::{DateTime, Utc};

/// A source of transactions.
///
/// Each mutation request runs inside one transaction. Implementations must
/// make the writes of a transaction atomic: either all of them become
/// visible on [`Transaction::commit`] or none do.
pub trait Store: Send + Sync {
    /// Begin a transaction.
    fn begin(&self) -> StoreResult<Box<dyn Transaction + '_>>;
}

/// An open unit of work against a [`Store`].
///
/// Dropping a transaction without committing it rolls back every write it
/// made.
pub trait Transaction {
    /// Load an entity by id.
    fn get(&self, id: EntityId) -> StoreResult<Option<Entity>>;

    /// All entities of the given concrete types satisfying `condition`, in
    /// id (insertion) order.
    fn find_many(&self, type_ids: &[TypeId], condition: &Condition) -> StoreResult<Vec<Entity>>;

    /// The single entity matching `condition`, if any.
    fn find_one(&self, type_ids: &[TypeId], condition: &Condition) -> StoreResult<Option<Entity>> {
        let mut found = self.find_many(type_ids, condition)?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => Err(StoreError::Ambiguous { count }),
        }
    }

    /// Reserve a fresh entity id.
    fn allocate_id(&mut self) -> EntityId;

    /// Store a new entity.
    fn insert(&mut self, entity: Entity) -> StoreResult<()>;

    /// Merge `changes` into an entity and stamp its `updated` time.
    /// Returns the entity as written.
    fn update(&mut self, id: EntityId, changes: Fields, now: DateTime<Utc>) -> StoreResult<Entity>;

    /// Remove an entity, returning its last state.
    fn delete(&mut self, id: EntityId) -> StoreResult<Entity>;

    /// Whether another entity in the uniqueness scope of `type_id` already
    /// holds `value` for `field`. `exclude` names the entity being written.
    fn exists_unique(
        &self,
        type_id: TypeId,
        field: &str,
        value: &Value,
        exclude: Option<EntityId>,
    ) -> bool;

    /// Make the transaction's writes durable.
    fn commit(self: Box<Self>) -> StoreResult<()>;
}
