//! RegistryBuilder for constructing an immutable Registry.

use crate::{AttrDef, RelationDef, Registry, SubtypeIndex, TypeDef};
use regex_lite::Regex;
use std::collections::HashMap;
use strata_core::{is_builtin_field, TypeId};
use thiserror::Error;

/// Identifiers accepted for type, field and plural names.
const NAME_PATTERN: &str = "^[_A-Za-z][_0-9A-Za-z]*$";

/// Errors that can occur during registry construction.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate type name: {0}")]
    DuplicateTypeName(String),

    #[error("Duplicate plural name: {0}")]
    DuplicatePlural(String),

    #[error("Unknown parent type: {0}")]
    UnknownParentType(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Field {field} on type {type_name} is reserved")]
    ReservedField { type_name: String, field: String },

    #[error("Field {field} declared twice on type {type_name}")]
    DuplicateField { type_name: String, field: String },

    #[error("Unknown target type {target} for relation {type_name}.{field}")]
    UnknownRelationTarget {
        type_name: String,
        field: String,
        target: String,
    },

    #[error("Invalid inverse relation {type_name}.{field}: {reason}")]
    InvalidInverse {
        type_name: String,
        field: String,
        reason: String,
    },
}

impl RegistryError {
    fn invalid_inverse(
        type_name: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInverse {
            type_name: type_name.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Builder for constructing an immutable Registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    /// Next type ID to allocate.
    next_type_id: u32,
    /// Types being built.
    types: HashMap<TypeId, TypeDef>,
    /// Type name to ID mapping.
    type_names: HashMap<String, TypeId>,
}

impl RegistryBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type definition.
    pub fn add_type(&mut self, name: impl Into<String>) -> TypeBuilder<'_> {
        let name = name.into();
        let id = TypeId::new(self.next_type_id);
        self.next_type_id += 1;

        TypeBuilder {
            builder: self,
            def: TypeDef::new(id, name),
            parent_names: Vec::new(),
            duplicate_field: None,
        }
    }

    /// Build the immutable Registry.
    ///
    /// Relation targets are resolved here rather than in
    /// [`TypeBuilder::done`] so that types may reference each other in any
    /// declaration order.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let name_pattern =
            Regex::new(NAME_PATTERN).map_err(|e| RegistryError::InvalidName(e.to_string()))?;
        let mut types = self.types;
        let type_names = self.type_names;

        let mut plural_names = HashMap::new();
        for type_def in types.values() {
            validate_names(&name_pattern, type_def)?;
            if plural_names
                .insert(type_def.plural.clone(), type_def.id)
                .is_some()
            {
                return Err(RegistryError::DuplicatePlural(type_def.plural.clone()));
            }
        }

        let subtype_index = SubtypeIndex::build(&types);

        // Resolve declared targets to concrete types.
        let mut resolved: Vec<(TypeId, String, Vec<TypeId>)> = Vec::new();
        for type_def in types.values() {
            for relation in type_def.relations.values() {
                let mut concrete = Vec::new();
                for target in &relation.targets {
                    let target_id = type_names.get(target).copied().ok_or_else(|| {
                        RegistryError::UnknownRelationTarget {
                            type_name: type_def.name.clone(),
                            field: relation.name.clone(),
                            target: target.clone(),
                        }
                    })?;
                    concrete.extend(concrete_of(&types, &subtype_index, target_id));
                }
                concrete.sort();
                concrete.dedup();
                resolved.push((type_def.id, relation.name.clone(), concrete));
            }
        }
        for (type_id, field, concrete) in resolved {
            if let Some(relation) = types
                .get_mut(&type_id)
                .and_then(|t| t.relations.get_mut(&field))
            {
                relation.concrete_targets = concrete;
            }
        }

        // Pair each inverse relation with the owning field it mirrors.
        let mut mirrors: HashMap<(TypeId, String), String> = HashMap::new();
        for type_def in types.values() {
            for relation in type_def.relations.values() {
                let Some(owning_name) = &relation.inverse_of else {
                    continue;
                };
                let holders = concrete_of(&types, &subtype_index, type_def.id);
                for &target in &relation.concrete_targets {
                    let Some(declaring) = declaring_type(&types, target, owning_name) else {
                        return Err(RegistryError::invalid_inverse(
                            &type_def.name,
                            &relation.name,
                            format!("{} has no field {}", types[&target].name, owning_name),
                        ));
                    };
                    let owning = &types[&declaring].relations[owning_name];
                    if !owning.is_owning() {
                        return Err(RegistryError::invalid_inverse(
                            &type_def.name,
                            &relation.name,
                            format!("{} is itself an inverse relation", owning_name),
                        ));
                    }
                    if !holders.iter().any(|h| owning.concrete_targets.contains(h)) {
                        return Err(RegistryError::invalid_inverse(
                            &type_def.name,
                            &relation.name,
                            format!("{} does not target {}", owning_name, type_def.name),
                        ));
                    }
                    let key = (declaring, owning_name.clone());
                    match mirrors.get(&key) {
                        Some(existing) if existing != &relation.name => {
                            return Err(RegistryError::invalid_inverse(
                                &type_def.name,
                                &relation.name,
                                format!("{} is already mirrored by {}", owning_name, existing),
                            ));
                        }
                        _ => {
                            mirrors.insert(key, relation.name.clone());
                        }
                    }
                }
            }
        }
        for ((type_id, field), mirror) in mirrors {
            if let Some(relation) = types
                .get_mut(&type_id)
                .and_then(|t| t.relations.get_mut(&field))
            {
                relation.mirror = Some(mirror);
            }
        }

        Ok(Registry::new(types, type_names, plural_names, subtype_index))
    }
}

fn validate_names(pattern: &Regex, type_def: &TypeDef) -> Result<(), RegistryError> {
    for name in [&type_def.name, &type_def.plural] {
        if !pattern.is_match(name) {
            return Err(RegistryError::InvalidName(name.clone()));
        }
    }
    for field in type_def
        .attributes
        .keys()
        .chain(type_def.relations.keys())
    {
        if !pattern.is_match(field) {
            return Err(RegistryError::InvalidName(format!("{}.{}", type_def.name, field)));
        }
        if is_builtin_field(field) {
            return Err(RegistryError::ReservedField {
                type_name: type_def.name.clone(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

fn concrete_of(types: &HashMap<TypeId, TypeDef>, index: &SubtypeIndex, id: TypeId) -> Vec<TypeId> {
    let mut result: Vec<TypeId> = std::iter::once(id)
        .chain(index.get_subtypes(id))
        .filter(|t| types.get(t).map(|d| !d.is_abstract).unwrap_or(false))
        .collect();
    result.sort();
    result
}

/// The type (`type_id` or one of its ancestors) that declares relation `field`.
fn declaring_type(types: &HashMap<TypeId, TypeDef>, type_id: TypeId, field: &str) -> Option<TypeId> {
    let type_def = types.get(&type_id)?;
    if type_def.relations.contains_key(field) {
        return Some(type_id);
    }
    type_def
        .parent_ids
        .iter()
        .find_map(|&parent| declaring_type(types, parent, field))
}

/// Builder for a type definition.
pub struct TypeBuilder<'a> {
    builder: &'a mut RegistryBuilder,
    def: TypeDef,
    parent_names: Vec<String>,
    duplicate_field: Option<String>,
}

impl<'a> TypeBuilder<'a> {
    /// Add a parent type by name. Parents must be declared first.
    pub fn extends(mut self, parent_name: impl Into<String>) -> Self {
        self.parent_names.push(parent_name.into());
        self
    }

    /// Add a scalar attribute.
    pub fn attr(mut self, attr: AttrDef) -> Self {
        if self.def.has_field(&attr.name) {
            self.duplicate_field.get_or_insert(attr.name.clone());
        }
        self.def.attributes.insert(attr.name.clone(), attr);
        self
    }

    /// Add a relation.
    pub fn relation(mut self, relation: RelationDef) -> Self {
        if self.def.has_field(&relation.name) {
            self.duplicate_field.get_or_insert(relation.name.clone());
        }
        self.def.relations.insert(relation.name.clone(), relation);
        self
    }

    /// Override the plural name used for union input groups.
    pub fn plural(mut self, plural: impl Into<String>) -> Self {
        self.def.plural = plural.into();
        self
    }

    /// Mark as abstract.
    pub fn abstract_type(mut self) -> Self {
        self.def.is_abstract = true;
        self
    }

    /// Finish building this type.
    pub fn done(self) -> Result<TypeId, RegistryError> {
        let TypeBuilder {
            builder,
            mut def,
            parent_names,
            duplicate_field,
        } = self;

        if builder.type_names.contains_key(&def.name) {
            return Err(RegistryError::DuplicateTypeName(def.name));
        }
        if let Some(field) = duplicate_field {
            return Err(RegistryError::DuplicateField {
                type_name: def.name,
                field,
            });
        }

        for parent_name in &parent_names {
            match builder.type_names.get(parent_name) {
                Some(&parent_id) => def.parent_ids.push(parent_id),
                None => return Err(RegistryError::UnknownParentType(parent_name.clone())),
            }
        }

        let id = def.id;
        builder.type_names.insert(def.name.clone(), id);
        builder.types.insert(id, def);

        Ok(id)
    }
}
