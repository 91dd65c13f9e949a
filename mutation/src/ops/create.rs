//! Create operation - inserts a new entity, then resolves its nested writes.

use strata_core::{Entity, EntityId, Value};
use tracing::debug;

use crate::applier::apply_all;
use crate::error::{MutationError, MutationResult};
use crate::guard;
use crate::input::Payload;
use crate::resolver::Resolver;
use crate::validation;

impl Resolver<'_> {
    /// Create an entity of `payload.type_id`.
    ///
    /// The entity's own fields are persisted first so its id is stable;
    /// nested relation writes run afterwards and backfill references.
    pub(crate) fn create(&mut self, payload: &Payload) -> MutationResult<EntityId> {
        let registry = self.registry;
        let type_id = payload.type_id;
        let type_name = registry.type_name(type_id);

        if registry.get_type(type_id).map(|t| t.is_abstract).unwrap_or(true) {
            return Err(MutationError::validation(format!(
                "cannot create abstract type {}",
                type_name
            )));
        }

        let mut fields = apply_all(&payload.attrs, |_| Value::Null);
        validation::apply_defaults(registry, type_id, &mut fields);
        validation::check_required_attributes(registry, type_name, type_id, &fields)?;
        fields.retain(|_, value| !value.is_null());
        guard::check_duplicate(&*self.txn, registry, type_id, &fields, None)?;

        let id = self.txn.allocate_id();
        self.txn.insert(Entity::new(id, type_id, fields, self.now))?;
        self.effects.record_created(id);
        debug!(type_name, %id, "created entity");

        self.write_relations(id, &payload.relations)?;
        Ok(id)
    }
}
