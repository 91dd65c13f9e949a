//! Update operation - applies field changes to an existing entity.

use strata_core::Entity;
use tracing::debug;

use crate::applier::apply_all;
use crate::error::MutationResult;
use crate::guard;
use crate::input::Payload;
use crate::resolver::Resolver;
use crate::validation;

impl Resolver<'_> {
    /// Apply `payload` to `target` and resolve its nested writes.
    ///
    /// The entity's `updated` time is stamped even when the payload only
    /// holds relation operations.
    pub(crate) fn update(&mut self, target: &Entity, payload: &Payload) -> MutationResult<()> {
        let registry = self.registry;
        let type_id = target.type_id;
        let type_name = registry.type_name(type_id);

        let changes = apply_all(&payload.attrs, |field| target.value_of(field).into_owned());
        validation::check_required_not_null(registry, type_name, type_id, &changes)?;
        guard::check_duplicate(&*self.txn, registry, type_id, &changes, Some(target.id))?;

        self.write(target.id, changes)?;
        debug!(type_name, id = %target.id, "updated entity");

        self.write_relations(target.id, &payload.relations)
    }
}
