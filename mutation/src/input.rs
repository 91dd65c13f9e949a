//! Input tree normalizer.
//!
//! Turns the raw `input` object of a mutation call into a typed operation
//! tree checked against the registry. Normalization is pure: it never
//! touches the store, so malformed input fails before any write.

use serde_json::{Map, Value as Json};
use strata_core::{is_builtin_field, Condition, TypeId, Value, ID_FIELD};
use strata_registry::{FieldRef, Registry, RelationDef, ScalarType};

use crate::config::EngineConfig;
use crate::error::{MutationError, MutationResult};
use crate::request::MutationKind;
use crate::validation::{coerce_attr, coerce_element, coerce_scalar, json_type_name, parse_id};

/// Keys that turn a `where` object into a filter instead of field equality.
const FILTER_KEYS: [&str; 3] = ["match", "exists", "range"];

/// Relation operation keys, in the order they are applied.
const RELATION_OP_KEYS: [&str; 6] = ["create", "connect", "disconnect", "delete", "update", "upsert"];

/// Array operation keys, in the order they are applied.
const ARRAY_OP_KEYS: [&str; 3] = ["set", "push", "pull"];

/// A write to one scalar or array attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Assign the value.
    Replace(Value),
    /// Append the values in order, keeping duplicates.
    Push(Vec<Value>),
    /// Remove every element equal to one of the values.
    Pull(Vec<Value>),
    /// Replace the whole array.
    Set(Vec<Value>),
}

/// Field writes for one entity of `type_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub type_id: TypeId,
    /// Attribute writes in application order. A field may appear more than
    /// once when several array operations target it.
    pub attrs: Vec<(String, FieldOp)>,
    pub relations: Vec<RelationWrite>,
}

impl Payload {
    pub fn empty(type_id: TypeId) -> Self {
        Self {
            type_id,
            attrs: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.relations.is_empty()
    }

    /// The literal this payload assigns to `field`, if it replaces it.
    pub fn replaced(&self, field: &str) -> Option<&Value> {
        self.attrs.iter().rev().find_map(|(name, op)| match op {
            FieldOp::Replace(value) if name == field => Some(value),
            _ => None,
        })
    }
}

/// Operations on one relation field.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationWrite {
    pub field: String,
    /// One group per concrete target type. Plain relations have a single
    /// group; union relations have one per member named in the input.
    pub groups: Vec<OpGroup>,
}

/// Relation operations addressed to one concrete target type.
#[derive(Debug, Clone, PartialEq)]
pub struct OpGroup {
    pub target: TypeId,
    pub ops: Vec<RelationOp>,
}

/// One nested operation on a relation.
///
/// Selectors are `None` for to-one operations that address whatever is
/// currently linked.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationOp {
    Create(Payload),
    Connect(Condition),
    Disconnect(Option<Condition>),
    Delete(Option<Condition>),
    Update {
        selector: Option<Condition>,
        data: Payload,
    },
    Upsert {
        selector: Option<Condition>,
        create: Payload,
        update: Payload,
    },
}

/// A normalized top-level mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create {
        data: Payload,
    },
    Update {
        selector: Condition,
        conditions: Option<Condition>,
        data: Payload,
    },
    Upsert {
        selector: Condition,
        create: Payload,
        update: Payload,
    },
    Delete {
        selector: Condition,
    },
    UpdateMany {
        filter: Condition,
        data: Payload,
    },
    DeleteMany {
        filter: Condition,
    },
}

/// The result of normalizing one mutation call.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    pub type_id: TypeId,
    pub mutation: Mutation,
    /// Echoed verbatim in the response.
    pub client_mutation_id: Option<Json>,
}

/// Normalizes raw mutation input against a registry.
pub struct Normalizer<'a> {
    registry: &'a Registry,
    max_depth: usize,
}

impl<'a> Normalizer<'a> {
    pub fn new(registry: &'a Registry, config: &EngineConfig) -> Self {
        Self {
            registry,
            max_depth: config.max_depth,
        }
    }

    /// Normalize the `input` object of a `kind` mutation on `type_name`.
    pub fn normalize(
        &self,
        kind: MutationKind,
        type_name: &str,
        input: &Json,
    ) -> MutationResult<NormalizedRequest> {
        let type_id = self
            .registry
            .get_type_id(type_name)
            .ok_or_else(|| MutationError::unknown_type(type_name))?;
        let obj = as_object(input, "input")?;

        let allowed: &[&str] = match kind {
            MutationKind::Create => &["data"],
            MutationKind::Update => &["data", "where", "conditions"],
            MutationKind::Upsert => &["create", "update", "where"],
            MutationKind::Delete => &["where"],
            MutationKind::UpdateMany => &["data", "where"],
            MutationKind::DeleteMany => &["where"],
        };
        for key in obj.keys() {
            if key != "clientMutationId" && !allowed.contains(&key.as_str()) {
                return Err(MutationError::validation(format!(
                    "unknown input key {} for {}{}",
                    key, kind, type_name
                )));
            }
        }

        let mutation = match kind {
            MutationKind::Create => {
                self.require_concrete(type_id)?;
                Mutation::Create {
                    data: self.payload(type_id, required(obj, "data", "input")?, 1)?,
                }
            }
            MutationKind::Update => Mutation::Update {
                selector: self.selector(type_id, required(obj, "where", "input")?)?,
                conditions: optional(obj, "conditions")
                    .map(|c| self.filter(type_id, c))
                    .transpose()?,
                data: self.optional_payload(type_id, optional(obj, "data"), 1)?,
            },
            MutationKind::Upsert => {
                self.require_concrete(type_id)?;
                Mutation::Upsert {
                    selector: self.selector(type_id, required(obj, "where", "input")?)?,
                    create: self.payload(type_id, required(obj, "create", "input")?, 1)?,
                    update: self.optional_payload(type_id, optional(obj, "update"), 1)?,
                }
            }
            MutationKind::Delete => Mutation::Delete {
                selector: self.selector(type_id, required(obj, "where", "input")?)?,
            },
            MutationKind::UpdateMany => Mutation::UpdateMany {
                filter: self.optional_selector(type_id, optional(obj, "where"))?,
                data: self.payload(type_id, required(obj, "data", "input")?, 1)?,
            },
            MutationKind::DeleteMany => Mutation::DeleteMany {
                filter: self.optional_selector(type_id, optional(obj, "where"))?,
            },
        };

        Ok(NormalizedRequest {
            type_id,
            mutation,
            client_mutation_id: optional(obj, "clientMutationId").cloned(),
        })
    }

    /// Parse a `where` selector: field equality (`{"email": "x"}`) or a
    /// filter object with `match`/`exists`/`range` keys.
    pub fn selector(&self, type_id: TypeId, json: &Json) -> MutationResult<Condition> {
        let obj = as_object(json, "where")?;
        if !obj.is_empty() && obj.keys().all(|k| FILTER_KEYS.contains(&k.as_str())) {
            return self.filter(type_id, json);
        }
        let mut condition = Condition::all();
        for (field, value) in obj {
            condition = condition.matching(field.clone(), self.field_value(type_id, field, value)?);
        }
        Ok(condition)
    }

    fn optional_selector(&self, type_id: TypeId, json: Option<&Json>) -> MutationResult<Condition> {
        match json {
            Some(json) => self.selector(type_id, json),
            None => Ok(Condition::all()),
        }
    }

    /// Parse a filter object (`match`, `exists`, `range`).
    pub fn filter(&self, type_id: TypeId, json: &Json) -> MutationResult<Condition> {
        let obj = as_object(json, "filter")?;
        let mut condition = Condition::all();
        for (key, clauses) in obj {
            let clauses = as_object(clauses, key)?;
            match key.as_str() {
                "match" => {
                    for (field, value) in clauses {
                        condition = condition
                            .matching(field.clone(), self.field_value(type_id, field, value)?);
                    }
                }
                "exists" => {
                    for (field, present) in clauses {
                        self.field_value(type_id, field, &Json::Null)?;
                        let present = present.as_bool().ok_or_else(|| {
                            MutationError::validation(format!(
                                "exists.{} must be a boolean, got {}",
                                field,
                                json_type_name(present)
                            ))
                        })?;
                        condition = condition.exists(field.clone(), present);
                    }
                }
                "range" => {
                    for (field, bounds) in clauses {
                        let (lower, upper) = match bounds.as_array().map(Vec::as_slice) {
                            Some([lower, upper]) => (lower, upper),
                            _ => {
                                return Err(MutationError::validation(format!(
                                    "range.{} must be a [lower, upper] pair",
                                    field
                                )))
                            }
                        };
                        let bound = |json: &Json| -> MutationResult<Option<Value>> {
                            let value = self.field_value(type_id, field, json)?;
                            Ok((!value.is_null()).then_some(value))
                        };
                        condition = condition.range(field.clone(), bound(lower)?, bound(upper)?);
                    }
                }
                other => {
                    return Err(MutationError::validation(format!(
                        "unknown filter key {}",
                        other
                    )))
                }
            }
        }
        Ok(condition)
    }

    /// Coerce a literal compared against `field` of `type_id`.
    fn field_value(&self, type_id: TypeId, field: &str, json: &Json) -> MutationResult<Value> {
        let type_name = self.registry.type_name(type_id);
        if is_builtin_field(field) {
            let scalar = if field == ID_FIELD {
                ScalarType::Id
            } else {
                ScalarType::DateTime
            };
            return coerce_scalar(scalar, json).ok_or_else(|| {
                MutationError::validation(format!(
                    "invalid value for {}.{}: expected {}, got {}",
                    type_name,
                    field,
                    scalar.name(),
                    json_type_name(json)
                ))
            });
        }
        match self.registry.get_field(type_id, field) {
            Some(FieldRef::Attr(attr)) if attr.list && !json.is_array() => {
                coerce_element(type_name, attr, json)
            }
            Some(FieldRef::Attr(attr)) => coerce_attr(type_name, attr, json),
            Some(FieldRef::Relation(rel)) if rel.is_owning() && !rel.is_many() => {
                if json.is_null() {
                    return Ok(Value::Null);
                }
                parse_id(json).map(Value::Ref).ok_or_else(|| {
                    MutationError::validation(format!(
                        "invalid value for {}.{}: expected ID, got {}",
                        type_name,
                        field,
                        json_type_name(json)
                    ))
                })
            }
            Some(FieldRef::Relation(_)) => Err(MutationError::validation(format!(
                "cannot filter on relation {}.{}",
                type_name, field
            ))),
            None => Err(MutationError::unknown_field(type_name, field)),
        }
    }

    fn require_concrete(&self, type_id: TypeId) -> MutationResult<()> {
        match self.registry.get_type(type_id) {
            Some(t) if t.is_abstract => Err(MutationError::validation(format!(
                "cannot create abstract type {}",
                t.name
            ))),
            _ => Ok(()),
        }
    }

    fn check_depth(&self, depth: usize) -> MutationResult<()> {
        if depth > self.max_depth {
            return Err(MutationError::validation(format!(
                "input nested deeper than {} levels",
                self.max_depth
            )));
        }
        Ok(())
    }

    fn optional_payload(
        &self,
        type_id: TypeId,
        json: Option<&Json>,
        depth: usize,
    ) -> MutationResult<Payload> {
        match json {
            Some(json) => self.payload(type_id, json, depth),
            None => Ok(Payload::empty(type_id)),
        }
    }

    /// Normalize a data object for an entity of `type_id`.
    pub fn payload(&self, type_id: TypeId, json: &Json, depth: usize) -> MutationResult<Payload> {
        self.check_depth(depth)?;
        let type_name = self.registry.type_name(type_id);
        let obj = as_object(json, "data")?;
        let mut payload = Payload::empty(type_id);

        for (field, value) in obj {
            if is_builtin_field(field) {
                return Err(MutationError::validation(format!(
                    "field {}.{} is read-only",
                    type_name, field
                )));
            }
            match self.registry.get_field(type_id, field) {
                Some(FieldRef::Attr(attr)) => {
                    if attr.list && value.is_object() {
                        let ops = as_object(value, field)?;
                        check_keys(ops, &ARRAY_OP_KEYS, || {
                            format!("array operation on {}.{}", type_name, field)
                        })?;
                        for key in ARRAY_OP_KEYS {
                            let Some(arg) = ops.get(key) else {
                                continue;
                            };
                            if key == "set" && arg.is_null() {
                                payload.attrs.push((field.clone(), FieldOp::Replace(Value::Null)));
                                continue;
                            }
                            let values = match arg {
                                Json::Array(items) => items
                                    .iter()
                                    .map(|item| coerce_element(type_name, attr, item))
                                    .collect::<MutationResult<Vec<_>>>()?,
                                single => vec![coerce_element(type_name, attr, single)?],
                            };
                            if values.iter().any(Value::is_null) {
                                return Err(MutationError::validation(format!(
                                    "{} on {}.{} cannot hold null",
                                    key, type_name, field
                                )));
                            }
                            let op = match key {
                                "set" => FieldOp::Set(values),
                                "push" => FieldOp::Push(values),
                                _ => FieldOp::Pull(values),
                            };
                            payload.attrs.push((field.clone(), op));
                        }
                    } else {
                        let value = coerce_attr(type_name, attr, value)?;
                        payload.attrs.push((field.clone(), FieldOp::Replace(value)));
                    }
                }
                Some(FieldRef::Relation(rel)) => {
                    let write = self.relation_write(type_id, rel, value, depth)?;
                    payload.relations.push(write);
                }
                None => return Err(MutationError::unknown_field(type_name, field)),
            }
        }
        Ok(payload)
    }

    fn relation_write(
        &self,
        type_id: TypeId,
        rel: &RelationDef,
        json: &Json,
        depth: usize,
    ) -> MutationResult<RelationWrite> {
        let type_name = self.registry.type_name(type_id);
        let obj = as_object(json, &rel.name)?;
        let mut groups = Vec::new();

        if rel.is_union() {
            for key in obj.keys() {
                let member = self.registry.get_type_id_by_plural(key);
                if !member.map(|m| rel.accepts(m)).unwrap_or(false) {
                    return Err(MutationError::validation(format!(
                        "unknown union member {} for {}.{}",
                        key, type_name, rel.name
                    )));
                }
            }
            // Groups follow the relation's member order, not input key order.
            for &target in &rel.concrete_targets {
                let Some(plural) = self.registry.get_type(target).map(|t| t.plural.as_str()) else {
                    continue;
                };
                if let Some(group) = obj.get(plural) {
                    let ops = self.relation_ops(type_name, rel, target, group, depth)?;
                    groups.push(OpGroup { target, ops });
                }
            }
        } else {
            let target = rel.concrete_targets.first().copied().ok_or_else(|| {
                MutationError::validation(format!(
                    "relation {}.{} has no concrete target",
                    type_name, rel.name
                ))
            })?;
            let ops = self.relation_ops(type_name, rel, target, json, depth)?;
            groups.push(OpGroup { target, ops });
        }

        Ok(RelationWrite {
            field: rel.name.clone(),
            groups,
        })
    }

    fn relation_ops(
        &self,
        type_name: &str,
        rel: &RelationDef,
        target: TypeId,
        json: &Json,
        depth: usize,
    ) -> MutationResult<Vec<RelationOp>> {
        let obj = as_object(json, &rel.name)?;
        check_keys(obj, &RELATION_OP_KEYS, || {
            format!("operation on {}.{}", type_name, rel.name)
        })?;
        let depth = depth + 1;
        let mut ops = Vec::new();

        for key in RELATION_OP_KEYS {
            let Some(arg) = obj.get(key) else {
                continue;
            };
            if rel.is_many() {
                for item in as_items(arg, key)? {
                    ops.push(self.many_op(key, target, item, depth)?);
                }
            } else if let Some(op) = self.one_op(type_name, rel, key, target, arg, depth)? {
                ops.push(op);
            }
        }
        Ok(ops)
    }

    fn one_op(
        &self,
        type_name: &str,
        rel: &RelationDef,
        key: &str,
        target: TypeId,
        arg: &Json,
        depth: usize,
    ) -> MutationResult<Option<RelationOp>> {
        let flag = || {
            arg.as_bool().ok_or_else(|| {
                MutationError::validation(format!(
                    "{} on {}.{} must be a boolean",
                    key, type_name, rel.name
                ))
            })
        };
        let op = match key {
            "create" => RelationOp::Create(self.payload(target, arg, depth)?),
            "connect" => RelationOp::Connect(self.selector(target, arg)?),
            "disconnect" => {
                if !flag()? {
                    return Ok(None);
                }
                RelationOp::Disconnect(None)
            }
            "delete" => {
                if !flag()? {
                    return Ok(None);
                }
                RelationOp::Delete(None)
            }
            "update" => RelationOp::Update {
                selector: None,
                data: self.payload(target, arg, depth)?,
            },
            _ => {
                let obj = as_object(arg, "upsert")?;
                check_keys(obj, &["create", "update", "where"], || "upsert".to_string())?;
                RelationOp::Upsert {
                    selector: optional(obj, "where")
                        .map(|w| self.selector(target, w))
                        .transpose()?,
                    create: self.payload(target, required(obj, "create", "upsert")?, depth)?,
                    update: self.optional_payload(target, optional(obj, "update"), depth)?,
                }
            }
        };
        Ok(Some(op))
    }

    fn many_op(
        &self,
        key: &str,
        target: TypeId,
        item: &Json,
        depth: usize,
    ) -> MutationResult<RelationOp> {
        let op = match key {
            "create" => RelationOp::Create(self.payload(target, item, depth)?),
            "connect" => RelationOp::Connect(self.selector(target, item)?),
            "disconnect" => RelationOp::Disconnect(Some(self.selector(target, item)?)),
            "delete" => RelationOp::Delete(Some(self.selector(target, item)?)),
            "update" => {
                let obj = as_object(item, "update")?;
                check_keys(obj, &["where", "data"], || "update".to_string())?;
                RelationOp::Update {
                    selector: Some(self.selector(target, required(obj, "where", "update")?)?),
                    data: self.payload(target, required(obj, "data", "update")?, depth)?,
                }
            }
            _ => {
                let obj = as_object(item, "upsert")?;
                check_keys(obj, &["create", "update", "where"], || "upsert".to_string())?;
                RelationOp::Upsert {
                    selector: Some(self.selector(target, required(obj, "where", "upsert")?)?),
                    create: self.payload(target, required(obj, "create", "upsert")?, depth)?,
                    update: self.optional_payload(target, optional(obj, "update"), depth)?,
                }
            }
        };
        Ok(op)
    }
}

fn as_object<'j>(json: &'j Json, context: &str) -> MutationResult<&'j Map<String, Json>> {
    json.as_object().ok_or_else(|| {
        MutationError::validation(format!(
            "{} must be an object, got {}",
            context,
            json_type_name(json)
        ))
    })
}

/// A to-many operation argument: a list, or a single object as a
/// one-element list.
fn as_items<'j>(json: &'j Json, context: &str) -> MutationResult<Vec<&'j Json>> {
    match json {
        Json::Array(items) => Ok(items.iter().collect()),
        Json::Object(_) => Ok(vec![json]),
        other => Err(MutationError::validation(format!(
            "{} must be a list, got {}",
            context,
            json_type_name(other)
        ))),
    }
}

fn required<'j>(obj: &'j Map<String, Json>, key: &str, context: &str) -> MutationResult<&'j Json> {
    optional(obj, key)
        .ok_or_else(|| MutationError::validation(format!("{} requires {}", context, key)))
}

/// A present, non-null key.
fn optional<'j>(obj: &'j Map<String, Json>, key: &str) -> Option<&'j Json> {
    obj.get(key).filter(|v| !v.is_null())
}

fn check_keys(
    obj: &Map<String, Json>,
    allowed: &[&str],
    context: impl Fn() -> String,
) -> MutationResult<()> {
    match obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(MutationError::validation(format!(
            "unknown key {} in {}",
            key,
            context()
        ))),
        None => Ok(()),
    }
}
