//! Schema-driven planning.
//!
//! Every Fivetran resource plans the same way, so the provider computes
//! plans from the resource schema rather than per handler:
//!
//! * computed-only attributes keep their prior value (or stay null on
//!   create, to be filled in by the API);
//! * optional + computed attributes left unset keep their prior value;
//! * absent optional attributes with a default take the default;
//! * set-typed attributes compare without regard to order;
//! * any change to a `force_new` attribute requires replacement.

use serde_json::{Map, Value};

use crate::schema::{AttributeType, BlockNestingMode, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan a create (`prior == None`), update, or delete (`proposed` null).
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    match (prior, proposed) {
        (Some(prior), Value::Null) => plan_delete(prior),
        (None, proposed) => plan_create(schema, proposed),
        (Some(prior), proposed) => plan_update(schema, prior, proposed),
    }
}

fn as_object(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn plan_create(schema: &Schema, proposed: &Value) -> PlanResult {
    let mut planned = as_object(proposed);

    for (name, attr) in &schema.block.attributes {
        let current = planned.get(name).filter(|v| !v.is_null());
        if current.is_none() {
            let value = attr.default.clone().unwrap_or(Value::Null);
            planned.insert(name.clone(), value);
        }
    }

    let changes = planned
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| AttributeChange::added(k.clone(), v.clone()))
        .collect();

    PlanResult::with_changes(Value::Object(planned), changes, false)
}

fn plan_update(schema: &Schema, prior: &Value, proposed: &Value) -> PlanResult {
    let prior_map = as_object(prior);
    let mut planned = as_object(proposed);
    let mut changes = Vec::new();
    let mut requires_replace = false;

    for (name, attr) in &schema.block.attributes {
        let prior_value = prior_map.get(name).cloned().unwrap_or(Value::Null);
        let proposed_value = planned.get(name).cloned().unwrap_or(Value::Null);

        let value = if attr.flags.is_computed_only() {
            prior_value.clone()
        } else if proposed_value.is_null() && attr.flags.computed {
            prior_value.clone()
        } else if proposed_value.is_null() {
            attr.default.clone().unwrap_or(Value::Null)
        } else {
            proposed_value
        };

        if !values_equal(&attr.attr_type, &prior_value, &value) {
            if attr.force_new {
                requires_replace = true;
            }
            changes.push(AttributeChange::new(
                name.clone(),
                Some(prior_value).filter(|v| !v.is_null()),
                Some(value.clone()).filter(|v| !v.is_null()),
            ));
        }
        planned.insert(name.clone(), value);
    }

    for (name, nested) in &schema.block.blocks {
        let prior_value = prior_map.get(name).cloned().unwrap_or(Value::Null);
        let value = planned.get(name).cloned().unwrap_or(Value::Null);
        let same = match nested.nesting_mode {
            BlockNestingMode::Set => same_items(&prior_value, &value),
            _ => prior_value == value,
        };
        // Blocks never force replacement.
        if !same {
            changes.push(AttributeChange::new(
                name.clone(),
                Some(prior_value).filter(|v| !v.is_null()),
                Some(value).filter(|v| !v.is_null()),
            ));
        }
    }

    if changes.is_empty() {
        return PlanResult::no_change(Value::Object(planned));
    }
    PlanResult::with_changes(Value::Object(planned), changes, requires_replace)
}

fn plan_delete(prior: &Value) -> PlanResult {
    let changes = as_object(prior)
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| AttributeChange::removed(k, v))
        .collect();
    PlanResult::with_changes(Value::Null, changes, false)
}

/// Set-block equality: same items in any order; empty equals absent.
fn same_items(a: &Value, b: &Value) -> bool {
    let sorted = |v: &Value| {
        let mut items: Vec<String> = v
            .as_array()
            .map(|items| items.iter().map(Value::to_string).collect())
            .unwrap_or_default();
        items.sort();
        items
    };
    sorted(a) == sorted(b)
}

/// Equality under the attribute's type; sets ignore element order.
pub fn values_equal(attr_type: &AttributeType, a: &Value, b: &Value) -> bool {
    match (attr_type, a, b) {
        (AttributeType::Set(_), Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len()
                && xs.iter().all(|x| ys.contains(x))
                && ys.iter().all(|y| xs.contains(y))
        }
        // An empty set and an unset one are the same configuration.
        (AttributeType::Set(_), Value::Array(xs), Value::Null)
        | (AttributeType::Set(_), Value::Null, Value::Array(xs)) => xs.is_empty(),
        _ => a == b,
    }
}
