//! Schema-driven planning.
//!
//! Every Whisparr resource plans the same way: fill defaults, carry computed
//! values forward from prior state, diff attribute by attribute and request
//! replacement when a `force_new` attribute moves. Sets compare without
//! regard to order, numbers compare by value.

use serde_json::{Map, Value};

use crate::schema::{AttributeType, BlockNestingMode, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan a change from `prior` (None when creating) to `proposed`.
///
/// A null `proposed` plans the destruction of `prior`.
pub fn plan_resource(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    let prior = prior.filter(|p| !p.is_null());

    if proposed.is_null() {
        let changes = match prior.and_then(Value::as_object) {
            Some(obj) => obj
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| AttributeChange::removed(k.clone(), v.clone()))
                .collect(),
            None => Vec::new(),
        };
        return PlanResult::destroy(changes);
    }

    let planned = fill_planned(schema, prior, proposed);
    let types = match schema.block.object_type() {
        AttributeType::Object(types) => types,
        _ => Default::default(),
    };

    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, ty) in &types {
        let is_block = schema.block.blocks.contains_key(name);
        let present = |v: &&Value| !(v.is_null() || (is_block && is_empty_collection(v)));
        let before = prior.and_then(|p| p.get(name)).filter(present);
        let after = planned.get(name).filter(present);

        let change = match (before, after) {
            (None, None) => None,
            (None, Some(a)) => Some(AttributeChange::added(name.clone(), a.clone())),
            (Some(b), None) => {
                let computed_only = schema
                    .attribute(name)
                    .is_some_and(|attr| attr.flags.is_computed_only());
                if computed_only {
                    None
                } else {
                    Some(AttributeChange::removed(name.clone(), b.clone()))
                }
            },
            (Some(b), Some(a)) if !equivalent(ty, b, a) => {
                Some(AttributeChange::modified(name.clone(), b.clone(), a.clone()))
            },
            _ => None,
        };

        if let Some(change) = change {
            if prior.is_some() && schema.attribute(name).is_some_and(|attr| attr.force_new) {
                requires_replace = true;
            }
            changes.push(change);
        }
    }

    match prior {
        Some(prior) if changes.is_empty() => PlanResult::no_change(prior.clone()),
        _ => PlanResult::with_changes(Value::Object(planned), changes, requires_replace),
    }
}

/// Build the planned state: every schema attribute present, defaults
/// applied, computed values without a default carried over from prior
/// state. Absent repeated blocks become empty collections.
fn fill_planned(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> Map<String, Value> {
    let mut planned = proposed.as_object().cloned().unwrap_or_default();

    for (name, attr) in &schema.block.attributes {
        let is_null = planned.get(name).is_none_or(Value::is_null);
        if !is_null {
            continue;
        }

        let carried = prior
            .and_then(|p| p.get(name))
            .filter(|v| !v.is_null())
            .filter(|_| attr.flags.computed && attr.default.is_none());

        let value = if let Some(value) = carried {
            value.clone()
        } else if let Some(default) = &attr.default {
            default.clone()
        } else {
            Value::Null
        };
        planned.insert(name.clone(), value);
    }

    for (name, nested) in &schema.block.blocks {
        let slot = planned.entry(name.clone()).or_insert(Value::Null);
        if slot.is_null() {
            *slot = match nested.nesting_mode {
                BlockNestingMode::Single => Value::Null,
                BlockNestingMode::Map => Value::Object(Map::new()),
                BlockNestingMode::List | BlockNestingMode::Set => Value::Array(Vec::new()),
            };
        }
    }

    planned
}

fn is_empty_collection(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.is_empty(),
        Value::Object(entries) => entries.is_empty(),
        _ => false,
    }
}

/// Semantic equality of two values of the given type.
pub fn equivalent(ty: &AttributeType, a: &Value, b: &Value) -> bool {
    match (ty, a, b) {
        (AttributeType::Int64 | AttributeType::Float64, Value::Number(x), Value::Number(y)) => {
            x.as_f64() == y.as_f64()
        },
        (AttributeType::Set(inner), Value::Array(xs), Value::Array(ys)) => {
            same_elements(inner, xs, ys)
        },
        (AttributeType::List(inner), Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equivalent(inner, x, y))
        },
        (AttributeType::Map(inner), Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| equivalent(inner, x, y)))
        },
        (AttributeType::Object(fields), Value::Object(xs), Value::Object(ys)) => {
            fields.iter().all(|(k, field_ty)| {
                let x = xs.get(k).unwrap_or(&Value::Null);
                let y = ys.get(k).unwrap_or(&Value::Null);
                equivalent(field_ty, x, y)
            })
        },
        _ => a == b,
    }
}

/// Unordered comparison that counts repeated elements: each element of `xs`
/// consumes one distinct equivalent element of `ys`.
fn same_elements(inner: &AttributeType, xs: &[Value], ys: &[Value]) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    let mut used = vec![false; ys.len()];
    xs.iter().all(|x| {
        let matched = ys
            .iter()
            .enumerate()
            .position(|(i, y)| !used[i] && equivalent(inner, x, y));
        match matched {
            Some(i) => {
                used[i] = true;
                true
            },
            None => false,
        }
    })
}
