//! Scalar and array field applier.

use crate::input::FieldOp;
use strata_core::{Fields, Value};

/// Compute the new value of a field from its current value.
///
/// The current value is never modified. `push` and `pull` treat a null
/// field as an empty array.
pub fn apply(current: &Value, op: &FieldOp) -> Value {
    match op {
        FieldOp::Replace(value) => value.clone(),
        FieldOp::Set(values) => Value::List(values.clone()),
        FieldOp::Push(values) => {
            let mut items = elements(current);
            items.extend(values.iter().cloned());
            Value::List(items)
        }
        FieldOp::Pull(values) => Value::List(
            elements(current)
                .into_iter()
                .filter(|item| !values.iter().any(|v| v.loose_eq(item)))
                .collect(),
        ),
    }
}

fn elements(value: &Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::List(items) => items.clone(),
        scalar => vec![scalar.clone()],
    }
}

/// Fold attribute operations into a change set. `current` supplies field
/// values before the write; operations on the same field compose.
pub fn apply_all<F>(ops: &[(String, FieldOp)], current: F) -> Fields
where
    F: Fn(&str) -> Value,
{
    let mut changes = Fields::new();
    for (field, op) in ops {
        let before = match changes.get(field) {
            Some(value) => value.clone(),
            None => current(field),
        };
        changes.insert(field.clone(), apply(&before, op));
    }
    changes
}
