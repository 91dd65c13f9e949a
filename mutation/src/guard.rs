//! Uniqueness guard.
//!
//! Checks run inside the request's store transaction, so a check and the
//! write that follows it are atomic with respect to other requests.

use strata_core::{EntityId, Fields, TypeId};
use strata_registry::Registry;
use strata_store::Transaction;
use tracing::debug;

use crate::error::{MutationError, MutationResult};
use crate::input::Payload;

/// Fail with a `duplicate` conflict when a unique field in `fields` is
/// already held by an entity other than `exclude`.
pub fn check_duplicate(
    txn: &dyn Transaction,
    registry: &Registry,
    type_id: TypeId,
    fields: &Fields,
    exclude: Option<EntityId>,
) -> MutationResult<()> {
    for attr in registry.unique_attrs(type_id) {
        let Some(value) = fields.get(&attr.name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        if txn.exists_unique(type_id, &attr.name, value, exclude) {
            let type_name = registry.type_name(type_id);
            debug!(type_name, field = %attr.name, %value, "unique value already taken");
            return Err(MutationError::duplicate(type_name, &attr.name, value.to_string()));
        }
    }
    Ok(())
}

/// Fail with a `multiple` conflict when a bulk update assigns one literal
/// to a unique field across more than one record.
pub fn check_multiple(
    registry: &Registry,
    type_id: TypeId,
    payload: &Payload,
    matched: usize,
) -> MutationResult<()> {
    if matched < 2 {
        return Ok(());
    }
    for attr in registry.unique_attrs(type_id) {
        match payload.replaced(&attr.name) {
            Some(value) if !value.is_null() => {
                return Err(MutationError::multiple(
                    registry.type_name(type_id),
                    &attr.name,
                    matched,
                ));
            }
            _ => {}
        }
    }
    Ok(())
}
