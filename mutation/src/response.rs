//! Response assembly.
//!
//! Shapes entities into JSON trees following a caller's [`Selection`].
//! Only selected fields are read; relations are loaded on demand. Elements
//! of union or interface-typed relations always carry `__typename`.

use serde::Serialize;
use serde_json::{Map, Value as Json};
use strata_core::{is_builtin_field, Entity};
use strata_registry::{FieldRef, Registry, RelationDef};
use strata_store::Transaction;

use crate::error::{MutationError, MutationResult};
use crate::request::MutationRequest;
use crate::resolver::{linked, Resolution};
use crate::selection::{Selection, SelectionItem};

/// Name of the discriminant field.
pub const TYPENAME_FIELD: &str = "__typename";

static NULL: Json = Json::Null;

/// Response envelope of one mutation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MutationResponse {
    /// Single-target mutations.
    #[serde(rename_all = "camelCase")]
    Single {
        data: Json,
        #[serde(skip_serializing_if = "Option::is_none")]
        unaltered_data: Option<Json>,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_mutation_id: Option<Json>,
    },
    /// Bulk mutations report a count only.
    #[serde(rename_all = "camelCase")]
    Bulk {
        count: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_mutation_id: Option<Json>,
    },
}

impl MutationResponse {
    /// The `data` tree. Null for bulk responses.
    pub fn data(&self) -> &Json {
        match self {
            MutationResponse::Single { data, .. } => data,
            MutationResponse::Bulk { .. } => &NULL,
        }
    }

    pub fn unaltered_data(&self) -> Option<&Json> {
        match self {
            MutationResponse::Single { unaltered_data, .. } => unaltered_data.as_ref(),
            MutationResponse::Bulk { .. } => None,
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            MutationResponse::Bulk { count, .. } => Some(*count),
            MutationResponse::Single { .. } => None,
        }
    }

    pub fn client_mutation_id(&self) -> Option<&Json> {
        match self {
            MutationResponse::Single {
                client_mutation_id, ..
            }
            | MutationResponse::Bulk {
                client_mutation_id, ..
            } => client_mutation_id.as_ref(),
        }
    }

    /// The envelope as a JSON object.
    pub fn to_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }
}

/// Builds response trees from stored entities.
pub struct Assembler<'a> {
    registry: &'a Registry,
    txn: &'a dyn Transaction,
}

impl<'a> Assembler<'a> {
    pub fn new(registry: &'a Registry, txn: &'a dyn Transaction) -> Self {
        Self { registry, txn }
    }

    /// Build the envelope for a resolved mutation.
    pub fn assemble(
        &self,
        request: &MutationRequest,
        resolution: &Resolution,
        client_mutation_id: Option<Json>,
    ) -> MutationResult<MutationResponse> {
        let response = match resolution {
            Resolution::Count(count) => MutationResponse::Bulk {
                count: *count,
                client_mutation_id,
            },
            Resolution::Entity(id) => {
                let data = match id {
                    Some(id) => match self.txn.get(*id)? {
                        Some(entity) => self.entity(&entity, &request.selection)?,
                        None => Json::Null,
                    },
                    None => Json::Null,
                };
                MutationResponse::Single {
                    data,
                    unaltered_data: None,
                    client_mutation_id,
                }
            }
            Resolution::Rejected(snapshot) => MutationResponse::Single {
                data: Json::Null,
                unaltered_data: Some(self.entity(snapshot, request.unaltered_selection())?),
                client_mutation_id,
            },
            Resolution::Deleted(prior) => MutationResponse::Single {
                data: match prior {
                    Some(entity) => self.entity(entity, &request.selection)?,
                    None => Json::Null,
                },
                unaltered_data: None,
                client_mutation_id,
            },
        };
        Ok(response)
    }

    /// Project `entity` through `selection`.
    pub fn entity(&self, entity: &Entity, selection: &Selection) -> MutationResult<Json> {
        let mut out = Map::new();
        self.project(entity, selection, &mut out)?;
        Ok(Json::Object(out))
    }

    fn project(
        &self,
        entity: &Entity,
        selection: &Selection,
        out: &mut Map<String, Json>,
    ) -> MutationResult<()> {
        let type_name = self.registry.type_name(entity.type_id);
        for item in selection.items() {
            match item {
                SelectionItem::Field { name, selection } => {
                    let value = self.field(entity, type_name, name, selection.as_ref())?;
                    out.insert(name.clone(), value);
                }
                SelectionItem::Fragment {
                    type_name: on,
                    selection,
                } => {
                    let fragment_type = self
                        .registry
                        .get_type_id(on)
                        .ok_or_else(|| MutationError::unknown_type(on))?;
                    if self.registry.is_subtype(entity.type_id, fragment_type) {
                        self.project(entity, selection, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn field(
        &self,
        entity: &Entity,
        type_name: &str,
        name: &str,
        sub: Option<&Selection>,
    ) -> MutationResult<Json> {
        if name == TYPENAME_FIELD {
            return Ok(Json::String(type_name.to_string()));
        }
        if is_builtin_field(name) {
            return Ok(entity.value_of(name).to_json());
        }
        match self.registry.get_field(entity.type_id, name) {
            Some(FieldRef::Attr(_)) => Ok(entity.value_of(name).to_json()),
            Some(FieldRef::Relation(rel)) => {
                let sub = sub.ok_or_else(|| {
                    MutationError::validation(format!(
                        "relation {}.{} needs a sub-selection",
                        type_name, name
                    ))
                })?;
                self.relation(entity, rel, sub)
            }
            None => Err(MutationError::unknown_field(type_name, name)),
        }
    }

    fn relation(&self, entity: &Entity, rel: &RelationDef, sub: &Selection) -> MutationResult<Json> {
        let tagged = self.is_polymorphic(rel);
        let mut elements = Vec::new();
        for child in linked(self.txn, self.registry, entity, rel)? {
            let mut out = Map::new();
            if tagged {
                out.insert(
                    TYPENAME_FIELD.to_string(),
                    Json::String(self.registry.type_name(child.type_id).to_string()),
                );
            }
            self.project(&child, sub, &mut out)?;
            elements.push(Json::Object(out));
        }
        if rel.is_many() {
            Ok(Json::Array(elements))
        } else {
            Ok(elements.into_iter().next().unwrap_or(Json::Null))
        }
    }

    /// Whether elements of `rel` can have more than one concrete shape.
    fn is_polymorphic(&self, rel: &RelationDef) -> bool {
        rel.is_union()
            || rel.targets.iter().any(|target| {
                self.registry
                    .get_type_by_name(target)
                    .map(|t| t.is_abstract)
                    .unwrap_or(false)
            })
    }
}
