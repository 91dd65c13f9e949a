//! Bulk operations - updateMany and deleteMany over a selection set.

use strata_core::{Condition, TypeId};
use tracing::debug;

use crate::error::MutationResult;
use crate::guard;
use crate::input::Payload;
use crate::resolver::Resolver;

impl Resolver<'_> {
    /// Apply `data` to every entity matching `filter`. Returns the count.
    pub(crate) fn update_many(
        &mut self,
        type_id: TypeId,
        filter: &Condition,
        data: &Payload,
    ) -> MutationResult<usize> {
        let registry = self.registry;
        let targets = self
            .txn
            .find_many(&registry.concrete_types(type_id), filter)?;
        guard::check_multiple(registry, type_id, data, targets.len())?;

        for target in &targets {
            self.update(target, data)?;
        }
        debug!(type_name = registry.type_name(type_id), count = targets.len(), "updated many");
        Ok(targets.len())
    }

    /// Delete every entity matching `filter`. Returns the count.
    pub(crate) fn delete_many(&mut self, type_id: TypeId, filter: &Condition) -> MutationResult<usize> {
        let registry = self.registry;
        let targets = self
            .txn
            .find_many(&registry.concrete_types(type_id), filter)?;

        for target in &targets {
            self.delete(target.id)?;
        }
        debug!(type_name = registry.type_name(type_id), count = targets.len(), "deleted many");
        Ok(targets.len())
    }
}
