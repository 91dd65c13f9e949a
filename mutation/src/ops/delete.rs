//! Delete operation - removes an entity and every reference to it.

use strata_core::{Entity, EntityId};
use tracing::debug;

use crate::error::MutationResult;
use crate::resolver::{references, single, Resolver};
use crate::result::EdgeChange;

use super::link::without_ref;

impl Resolver<'_> {
    /// Delete an entity, first clearing owning references held by others.
    /// Returns the entity's last state.
    pub(crate) fn delete(&mut self, id: EntityId) -> MutationResult<Entity> {
        let registry = self.registry;
        let entity = self.load(id)?;

        for (holder_type, rel) in registry.referencing_relations(entity.type_id) {
            let holders = self.txn.find_many(&[holder_type], &references(rel, id))?;
            for holder in holders {
                if holder.id == id {
                    continue;
                }
                let cleared = without_ref(&holder.value_of(&rel.name), id);
                self.write(holder.id, single(&rel.name, cleared))?;
                self.effects
                    .record_unlinked(EdgeChange::new(holder.id, rel.name.clone(), id));
            }
        }

        let removed = self.txn.delete(id)?;
        self.effects.record_deleted(id);
        debug!(type_name = registry.type_name(entity.type_id), %id, "deleted entity");
        Ok(removed)
    }
}
