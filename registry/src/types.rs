//! Schema definition types.

use strata_core::{TypeId, Value};
use std::collections::{BTreeSet, HashMap};

/// Scalar type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Int,
    Float,
    Bool,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// RFC 3339 instant.
    DateTime,
    /// Reference to an entity by id.
    Id,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "String",
            ScalarType::Int => "Int",
            ScalarType::Float => "Float",
            ScalarType::Bool => "Bool",
            ScalarType::Date => "Date",
            ScalarType::DateTime => "DateTime",
            ScalarType::Id => "ID",
        }
    }
}

/// Attribute definition within a type.
#[derive(Debug, Clone)]
pub struct AttrDef {
    /// Attribute name.
    pub name: String,
    /// Element type.
    pub scalar: ScalarType,
    /// Whether the attribute holds an array of `scalar`.
    pub list: bool,
    /// Whether this attribute is required on create.
    pub required: bool,
    /// Whether this attribute must be unique across instances.
    pub unique: bool,
    /// Default value if not provided on create.
    pub default: Option<Value>,
}

impl AttrDef {
    pub fn new(name: impl Into<String>, scalar: ScalarType) -> Self {
        Self {
            name: name.into(),
            scalar,
            list: false,
            required: false,
            unique: false,
            default: None,
        }
    }

    pub fn list(mut self) -> Self {
        self.list = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

/// How many entities a relation links to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Nullable singular reference.
    One,
    /// Collection of references.
    Many,
}

/// Relation definition within a type.
///
/// An owning relation is stored in the declaring entity's record. An
/// inverse relation is declared with [`RelationDef::inverse_of`] and is
/// computed from the owning `mirror` field on the target types.
#[derive(Debug, Clone)]
pub struct RelationDef {
    /// Field name.
    pub name: String,
    /// Singular or collection.
    pub cardinality: Cardinality,
    /// Declared target type names (concrete or abstract).
    pub targets: Vec<String>,
    /// For inverse relations: the owning field on the targets.
    pub inverse_of: Option<String>,
    /// For owning relations: the inverse field on the targets, if any.
    /// Filled in by the registry builder.
    pub mirror: Option<String>,
    /// Concrete target types, resolved by the registry builder.
    pub concrete_targets: Vec<TypeId>,
}

impl RelationDef {
    /// A to-one relation.
    pub fn one(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, Cardinality::One, target)
    }

    /// A to-many relation.
    pub fn many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::new(name, Cardinality::Many, target)
    }

    fn new(name: impl Into<String>, cardinality: Cardinality, target: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cardinality,
            targets: vec![target.into()],
            inverse_of: None,
            mirror: None,
            concrete_targets: Vec::new(),
        }
    }

    /// Add another permitted target type, making this a union relation.
    pub fn or(mut self, target: impl Into<String>) -> Self {
        self.targets.push(target.into());
        self
    }

    /// Declare this relation as the traversable reverse of `field` on the
    /// target types. Inverse relations are not stored.
    pub fn inverse_of(mut self, field: impl Into<String>) -> Self {
        self.inverse_of = Some(field.into());
        self
    }

    /// True when the declaring entity stores this relation.
    pub fn is_owning(&self) -> bool {
        self.inverse_of.is_none()
    }

    /// True for a to-many relation.
    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// True when more than one concrete type can be linked.
    pub fn is_union(&self) -> bool {
        self.concrete_targets.len() > 1
    }

    /// Whether `type_id` may be linked through this relation.
    pub fn accepts(&self, type_id: TypeId) -> bool {
        self.concrete_targets.contains(&type_id)
    }

    /// The field on the target holding the reverse view: the owning field
    /// for inverse relations, the mirror for owning ones.
    pub fn counterpart(&self) -> Option<&str> {
        self.inverse_of.as_deref().or(self.mirror.as_deref())
    }
}

/// A field of a type, borrowed from the registry.
#[derive(Debug, Clone, Copy)]
pub enum FieldRef<'a> {
    Attr(&'a AttrDef),
    Relation(&'a RelationDef),
}

/// Entity type definition.
#[derive(Debug, Clone)]
pub struct TypeDef {
    /// Unique identifier.
    pub id: TypeId,
    /// Type name.
    pub name: String,
    /// Plural name used to group union inputs (`users`, `posts`).
    pub plural: String,
    /// Parent type IDs (for inheritance).
    pub parent_ids: Vec<TypeId>,
    /// Attribute definitions.
    pub attributes: HashMap<String, AttrDef>,
    /// Relation definitions.
    pub relations: HashMap<String, RelationDef>,
    /// Whether this type is abstract (cannot be instantiated directly).
    pub is_abstract: bool,
}

impl TypeDef {
    pub fn new(id: TypeId, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id,
            plural: default_plural(&name),
            name,
            parent_ids: Vec::new(),
            attributes: HashMap::new(),
            relations: HashMap::new(),
            is_abstract: false,
        }
    }

    /// Get an attribute definition by name.
    pub fn get_attr(&self, name: &str) -> Option<&AttrDef> {
        self.attributes.get(name)
    }

    /// Get a relation definition by name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.get(name)
    }

    /// Check if this type declares a field.
    pub fn has_field(&self, name: &str) -> bool {
        self.attributes.contains_key(name) || self.relations.contains_key(name)
    }
}

/// Lower-camel plural of a type name: `User` → `users`, `Address` → `addresses`.
pub fn default_plural(name: &str) -> String {
    let mut chars = name.chars();
    let mut lowered = match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>(),
        None => String::new(),
    };
    lowered.push_str(chars.as_str());
    if lowered.ends_with('s') || lowered.ends_with('x') || lowered.ends_with("sh") || lowered.ends_with("ch") {
        lowered.push_str("es");
    } else if lowered.ends_with('y')
        && !matches!(lowered.chars().rev().nth(1), Some('a' | 'e' | 'i' | 'o' | 'u'))
    {
        lowered.pop();
        lowered.push_str("ies");
    } else {
        lowered.push('s');
    }
    lowered
}

/// Precomputed subtype relationships.
#[derive(Debug, Default)]
pub struct SubtypeIndex {
    /// For each type, the set of all its subtypes (transitive).
    subtypes: HashMap<TypeId, BTreeSet<TypeId>>,
    /// For each type, the set of all its supertypes (transitive).
    supertypes: HashMap<TypeId, BTreeSet<TypeId>>,
}

impl SubtypeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the subtype index from type definitions.
    pub fn build(types: &HashMap<TypeId, TypeDef>) -> Self {
        let mut index = Self::new();

        for &type_id in types.keys() {
            index.subtypes.insert(type_id, BTreeSet::new());
            index.supertypes.insert(type_id, BTreeSet::new());
        }

        // Walk each type's ancestry; parents are always declared first so
        // there are no cycles.
        for &type_id in types.keys() {
            let mut pending: Vec<TypeId> = types[&type_id].parent_ids.clone();
            while let Some(parent_id) = pending.pop() {
                let inserted = index
                    .supertypes
                    .get_mut(&type_id)
                    .map(|set| set.insert(parent_id))
                    .unwrap_or(false);
                if !inserted {
                    continue;
                }
                if let Some(set) = index.subtypes.get_mut(&parent_id) {
                    set.insert(type_id);
                }
                if let Some(parent) = types.get(&parent_id) {
                    pending.extend(parent.parent_ids.iter().copied());
                }
            }
        }

        index
    }

    /// Check if `sub` is a subtype of `super_type`.
    pub fn is_subtype(&self, sub: TypeId, super_type: TypeId) -> bool {
        if sub == super_type {
            return true;
        }
        self.supertypes
            .get(&sub)
            .map(|set| set.contains(&super_type))
            .unwrap_or(false)
    }

    /// Get all subtypes of a type (not including the type itself).
    pub fn get_subtypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.subtypes
            .get(&type_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Get all supertypes of a type (not including the type itself).
    pub fn get_supertypes(&self, type_id: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        self.supertypes
            .get(&type_id)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }
}
