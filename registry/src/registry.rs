//! The Registry - immutable schema lookup.

use crate::{AttrDef, FieldRef, RelationDef, SubtypeIndex, TypeDef};
use strata_core::TypeId;
use std::collections::HashMap;

/// The Registry provides runtime lookup of schema definitions.
/// It is immutable after construction.
#[derive(Debug)]
pub struct Registry {
    /// Type definitions by ID.
    types: HashMap<TypeId, TypeDef>,
    /// Type ID lookup by name.
    type_names: HashMap<String, TypeId>,
    /// Type ID lookup by plural name.
    plural_names: HashMap<String, TypeId>,
    /// Precomputed subtype relationships.
    subtype_index: SubtypeIndex,
}

impl Registry {
    pub(crate) fn new(
        types: HashMap<TypeId, TypeDef>,
        type_names: HashMap<String, TypeId>,
        plural_names: HashMap<String, TypeId>,
        subtype_index: SubtypeIndex,
    ) -> Self {
        Self {
            types,
            type_names,
            plural_names,
            subtype_index,
        }
    }

    // ==================== Type Lookups ====================

    /// Get a type definition by name.
    pub fn get_type_by_name(&self, name: &str) -> Option<&TypeDef> {
        self.type_names.get(name).and_then(|id| self.types.get(id))
    }

    /// Get a type definition by ID.
    pub fn get_type(&self, id: TypeId) -> Option<&TypeDef> {
        self.types.get(&id)
    }

    /// Get a type ID by name.
    pub fn get_type_id(&self, name: &str) -> Option<TypeId> {
        self.type_names.get(name).copied()
    }

    /// Get a type ID by its plural name (`users` → `User`).
    pub fn get_type_id_by_plural(&self, plural: &str) -> Option<TypeId> {
        self.plural_names.get(plural).copied()
    }

    /// Name of a type, or `"unknown"`.
    pub fn type_name(&self, id: TypeId) -> &str {
        self.types.get(&id).map(|t| t.name.as_str()).unwrap_or("unknown")
    }

    /// Get all type definitions.
    pub fn all_types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.values()
    }

    /// Get the number of types.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // ==================== Field Lookups ====================

    /// Get an attribute definition from a type, including inherited attributes.
    pub fn get_attr(&self, type_id: TypeId, name: &str) -> Option<&AttrDef> {
        let type_def = self.types.get(&type_id)?;
        if let Some(attr) = type_def.get_attr(name) {
            return Some(attr);
        }
        type_def
            .parent_ids
            .iter()
            .find_map(|&parent_id| self.get_attr(parent_id, name))
    }

    /// Get a relation definition from a type, including inherited relations.
    pub fn get_relation(&self, type_id: TypeId, name: &str) -> Option<&RelationDef> {
        let type_def = self.types.get(&type_id)?;
        if let Some(relation) = type_def.get_relation(name) {
            return Some(relation);
        }
        type_def
            .parent_ids
            .iter()
            .find_map(|&parent_id| self.get_relation(parent_id, name))
    }

    /// Look up any field (attribute or relation) of a type.
    pub fn get_field(&self, type_id: TypeId, name: &str) -> Option<FieldRef<'_>> {
        self.get_attr(type_id, name)
            .map(FieldRef::Attr)
            .or_else(|| self.get_relation(type_id, name).map(FieldRef::Relation))
    }

    /// Get all attributes for a type including inherited ones.
    pub fn all_attrs(&self, type_id: TypeId) -> Vec<&AttrDef> {
        let mut result = Vec::new();
        if let Some(type_def) = self.types.get(&type_id) {
            for &parent_id in &type_def.parent_ids {
                for attr in self.all_attrs(parent_id) {
                    if !type_def.attributes.contains_key(&attr.name) {
                        result.push(attr);
                    }
                }
            }
            result.extend(type_def.attributes.values());
        }
        result
    }

    /// Get all relations for a type including inherited ones.
    pub fn all_relations(&self, type_id: TypeId) -> Vec<&RelationDef> {
        let mut result = Vec::new();
        if let Some(type_def) = self.types.get(&type_id) {
            for &parent_id in &type_def.parent_ids {
                for relation in self.all_relations(parent_id) {
                    if !type_def.relations.contains_key(&relation.name) {
                        result.push(relation);
                    }
                }
            }
            result.extend(type_def.relations.values());
        }
        result
    }

    /// Unique attributes of a type, including inherited ones.
    pub fn unique_attrs(&self, type_id: TypeId) -> Vec<&AttrDef> {
        self.all_attrs(type_id)
            .into_iter()
            .filter(|attr| attr.unique)
            .collect()
    }

    /// The type that declares attribute `name` as seen from `type_id`:
    /// `type_id` itself or the nearest ancestor holding it.
    pub fn attr_owner(&self, type_id: TypeId, name: &str) -> Option<TypeId> {
        let type_def = self.types.get(&type_id)?;
        if type_def.attributes.contains_key(name) {
            return Some(type_id);
        }
        type_def
            .parent_ids
            .iter()
            .find_map(|&parent_id| self.attr_owner(parent_id, name))
    }

    /// Owning relations, on any concrete type, that can reference
    /// entities of `type_id`. Used to clear references before a delete.
    pub fn referencing_relations(&self, type_id: TypeId) -> Vec<(TypeId, &RelationDef)> {
        let mut result: Vec<(TypeId, &RelationDef)> = Vec::new();
        let mut holders: Vec<&TypeDef> = self.types.values().filter(|t| !t.is_abstract).collect();
        holders.sort_by_key(|t| t.id);
        for holder in holders {
            for relation in self.all_relations(holder.id) {
                if relation.is_owning() && relation.accepts(type_id) {
                    result.push((holder.id, relation));
                }
            }
        }
        result
    }

    // ==================== Subtype Queries ====================

    /// Check if `sub` is a subtype of (or equal to) `super_type`.
    pub fn is_subtype(&self, sub: TypeId, super_type: TypeId) -> bool {
        self.subtype_index.is_subtype(sub, super_type)
    }

    /// Concrete types an entity of `type_id` can have: the type itself when
    /// it is concrete plus every concrete subtype, in id order.
    pub fn concrete_types(&self, type_id: TypeId) -> Vec<TypeId> {
        let mut result = Vec::new();
        if self.types.get(&type_id).map(|t| !t.is_abstract).unwrap_or(false) {
            result.push(type_id);
        }
        for sub in self.subtype_index.get_subtypes(type_id) {
            if self.types.get(&sub).map(|t| !t.is_abstract).unwrap_or(false) {
                result.push(sub);
            }
        }
        result.sort();
        result
    }
}
