//! Mutation result types.

use crate::response::MutationResponse;
use strata_core::EntityId;

/// Outcome of a mutation request: the shaped response plus the side
/// effects the request had on the store.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    /// Response tree for the caller.
    pub response: MutationResponse,
    /// Entities and edges the request touched.
    pub effects: Effects,
}

impl MutationOutcome {
    /// IDs created by the request, in creation order.
    pub fn created(&self) -> &[EntityId] {
        &self.effects.created
    }

    /// IDs deleted by the request.
    pub fn deleted(&self) -> &[EntityId] {
        &self.effects.deleted
    }
}

/// A relation edge written or removed by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeChange {
    /// Entity holding the relation field the operation addressed.
    pub from: EntityId,
    /// Relation field name on `from`.
    pub field: String,
    /// The linked entity.
    pub to: EntityId,
}

impl EdgeChange {
    pub fn new(from: EntityId, field: impl Into<String>, to: EntityId) -> Self {
        Self {
            from,
            field: field.into(),
            to,
        }
    }
}

/// Side effects accumulated while resolving one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Effects {
    pub created: Vec<EntityId>,
    /// Pre-existing entities that were written. Newly created ones are
    /// listed only in `created`.
    pub updated: Vec<EntityId>,
    pub deleted: Vec<EntityId>,
    pub linked: Vec<EdgeChange>,
    pub unlinked: Vec<EdgeChange>,
}

impl Effects {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_created(&mut self, id: EntityId) {
        self.created.push(id);
    }

    pub(crate) fn record_updated(&mut self, id: EntityId) {
        if !self.created.contains(&id) && !self.updated.contains(&id) {
            self.updated.push(id);
        }
    }

    pub(crate) fn record_deleted(&mut self, id: EntityId) {
        self.updated.retain(|u| *u != id);
        self.deleted.push(id);
    }

    pub(crate) fn record_linked(&mut self, edge: EdgeChange) {
        self.linked.push(edge);
    }

    pub(crate) fn record_unlinked(&mut self, edge: EdgeChange) {
        self.unlinked.push(edge);
    }

    /// Whether the request changed nothing.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty()
            && self.updated.is_empty()
            && self.deleted.is_empty()
            && self.linked.is_empty()
            && self.unlinked.is_empty()
    }
}
