//! Plan computation: diff prior state against proposed configuration.
//!
//! Comparison is schema-aware. Set attributes and set-nested blocks compare
//! without regard to element order, numbers compare by value (`10` equals
//! `10.0`), and null, empty lists and empty blocks are all "unset".
//! Optional+computed attributes left unset in configuration keep the value
//! the server last reported, including inside nested blocks.

use serde_json::{Map, Number, Value};

use crate::schema::{AttributeType, Block, BlockNestingMode, NestedBlock, Schema};
use crate::types::{AttributeChange, PlanResult};

/// Plan the transition from `prior` state to `proposed` configuration.
///
/// A null `proposed` plans destruction. Schema defaults fill unset
/// attributes, and computed-only attributes keep their prior value.
pub fn plan(schema: &Schema, prior: Option<&Value>, proposed: &Value) -> PlanResult {
    if proposed.is_null() {
        return match prior {
            Some(prior) => PlanResult::with_changes(
                Value::Null,
                removed_fields(&schema.block, prior),
                false,
            ),
            None => PlanResult::no_change(Value::Null),
        };
    }

    let mut planned = normalize(&schema.block, proposed);
    carry_computed(&schema.block, prior, &mut planned);
    if let Some(prior) = prior {
        carry_server_values(&schema.block, prior, &mut planned);
    }

    let Some(prior) = prior else {
        let changes = schema
            .block
            .field_names()
            .into_iter()
            .filter(|name| !is_computed_only(&schema.block, name))
            .filter_map(|name| {
                let after = planned.get(name)?;
                let canonical = canonical_field(&schema.block, name, after);
                (!canonical.is_null()).then(|| AttributeChange::added(name, after.clone()))
            })
            .collect();
        return PlanResult::with_changes(planned, changes, false);
    };

    let mut changes = Vec::new();
    let mut requires_replace = false;
    for name in schema.block.field_names() {
        if is_computed_only(&schema.block, name) {
            continue;
        }
        let before = prior.get(name).unwrap_or(&Value::Null);
        let after = planned.get(name).unwrap_or(&Value::Null);
        if canonical_field(&schema.block, name, before) == canonical_field(&schema.block, name, after)
        {
            continue;
        }

        if schema
            .block
            .attributes
            .get(name)
            .is_some_and(|attr| attr.force_new)
        {
            requires_replace = true;
        }
        changes.push(AttributeChange::new(
            name,
            (!before.is_null()).then(|| before.clone()),
            (!after.is_null()).then(|| after.clone()),
        ));
    }

    if changes.is_empty() {
        PlanResult::no_change(prior.clone())
    } else {
        if requires_replace {
            // The replacement gets a fresh ID.
            clear_computed(&schema.block, &mut planned);
        }
        PlanResult::with_changes(planned, changes, requires_replace)
    }
}

/// Whether two values of a block are equal under plan semantics.
pub fn equivalent(block: &Block, a: &Value, b: &Value) -> bool {
    canonical_block(block, a) == canonical_block(block, b)
}

/// Bring a configuration object into state shape.
///
/// Every declared field is present (null when unset), defaults are applied,
/// and single blocks written as a one-element list become objects.
pub fn normalize(block: &Block, value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };

    let mut out = Map::new();
    for name in block.field_names() {
        let raw = obj.get(name).unwrap_or(&Value::Null);
        let normalized = if let Some(attr) = block.attributes.get(name) {
            match (raw, &attr.default) {
                (Value::Null, Some(default)) => default.clone(),
                _ => raw.clone(),
            }
        } else {
            normalize_nested(&block.blocks[name], raw)
        };
        out.insert(name.to_string(), normalized);
    }
    Value::Object(out)
}

fn normalize_nested(nested: &NestedBlock, value: &Value) -> Value {
    match (nested.nesting_mode, value) {
        (BlockNestingMode::Single, Value::Array(items)) => items
            .first()
            .map(|item| normalize(&nested.block, item))
            .unwrap_or(Value::Null),
        (BlockNestingMode::Single, Value::Object(_)) => normalize(&nested.block, value),
        (_, Value::Array(items)) => Value::Array(
            items
                .iter()
                .map(|item| normalize(&nested.block, item))
                .collect(),
        ),
        _ => value.clone(),
    }
}

fn is_computed_only(block: &Block, name: &str) -> bool {
    block
        .attributes
        .get(name)
        .is_some_and(|attr| attr.flags.is_computed_only())
}

fn carry_computed(block: &Block, prior: Option<&Value>, planned: &mut Value) {
    let Some(obj) = planned.as_object_mut() else {
        return;
    };
    for (name, attr) in &block.attributes {
        if attr.flags.is_computed_only() {
            let value = prior
                .and_then(|p| p.get(name))
                .cloned()
                .unwrap_or(Value::Null);
            obj.insert(name.clone(), value);
        }
    }
}

/// Fill optional+computed attributes that `planned` leaves unset from
/// `prior`. Set elements are paired with the prior element they match once
/// filled; unmatched elements stay as configured.
fn carry_server_values(block: &Block, prior: &Value, planned: &mut Value) {
    let (Some(before), Some(after)) = (prior.as_object(), planned.as_object_mut()) else {
        return;
    };

    for (name, attr) in &block.attributes {
        if !attr.flags.is_optional_computed() {
            continue;
        }
        if after.get(name).map_or(true, Value::is_null) {
            if let Some(value) = before.get(name).filter(|v| !v.is_null()) {
                after.insert(name.clone(), value.clone());
            }
        }
    }

    for (name, nested) in &block.blocks {
        let (Some(prior_value), Some(planned_value)) = (before.get(name), after.get_mut(name))
        else {
            continue;
        };
        match (nested.nesting_mode, prior_value, planned_value) {
            (BlockNestingMode::Single, prior_value, planned_value) => {
                carry_server_values(&nested.block, prior_value, planned_value)
            }
            (BlockNestingMode::List, Value::Array(prior_items), Value::Array(planned_items)) => {
                for (prior_item, planned_item) in prior_items.iter().zip(planned_items.iter_mut()) {
                    carry_server_values(&nested.block, prior_item, planned_item);
                }
            }
            (BlockNestingMode::Set, Value::Array(prior_items), Value::Array(planned_items)) => {
                let mut used = vec![false; prior_items.len()];
                for planned_item in planned_items.iter_mut() {
                    for (i, prior_item) in prior_items.iter().enumerate() {
                        if used[i] {
                            continue;
                        }
                        let mut filled = planned_item.clone();
                        carry_server_values(&nested.block, prior_item, &mut filled);
                        if equivalent(&nested.block, &filled, prior_item) {
                            *planned_item = filled;
                            used[i] = true;
                            break;
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn clear_computed(block: &Block, planned: &mut Value) {
    if let Some(obj) = planned.as_object_mut() {
        for (name, attr) in &block.attributes {
            if attr.flags.is_computed_only() {
                obj.insert(name.clone(), Value::Null);
            }
        }
    }
}

fn removed_fields(block: &Block, prior: &Value) -> Vec<AttributeChange> {
    block
        .field_names()
        .into_iter()
        .filter_map(|name| {
            let before = prior.get(name)?;
            (!before.is_null()).then(|| AttributeChange::removed(name, before.clone()))
        })
        .collect()
}

fn canonical_field(block: &Block, name: &str, value: &Value) -> Value {
    if let Some(attr) = block.attributes.get(name) {
        canonical_attribute(&attr.attr_type, value)
    } else if let Some(nested) = block.blocks.get(name) {
        canonical_nested(nested, value)
    } else {
        value.clone()
    }
}

fn canonical_block(block: &Block, value: &Value) -> Value {
    let Some(obj) = value.as_object() else {
        return value.clone();
    };

    let mut out = Map::new();
    for name in block.field_names() {
        let canonical = canonical_field(block, name, obj.get(name).unwrap_or(&Value::Null));
        if !canonical.is_null() {
            out.insert(name.to_string(), canonical);
        }
    }
    if out.is_empty() {
        Value::Null
    } else {
        Value::Object(out)
    }
}

fn canonical_attribute(attr_type: &AttributeType, value: &Value) -> Value {
    match (attr_type, value) {
        (AttributeType::Int64 | AttributeType::Float64, Value::Number(n)) => n
            .as_f64()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| value.clone()),
        (AttributeType::List(element) | AttributeType::Set(element), Value::Array(items)) => {
            let items = items
                .iter()
                .map(|item| canonical_attribute(element, item))
                .collect();
            collection(items, attr_type.is_unordered())
        }
        _ => value.clone(),
    }
}

fn canonical_nested(nested: &NestedBlock, value: &Value) -> Value {
    match (nested.nesting_mode, value) {
        (BlockNestingMode::Single, Value::Array(items)) => items
            .first()
            .map(|item| canonical_block(&nested.block, item))
            .unwrap_or(Value::Null),
        (BlockNestingMode::Single, _) => canonical_block(&nested.block, value),
        (mode, Value::Array(items)) => {
            let items = items
                .iter()
                .map(|item| canonical_block(&nested.block, item))
                .collect();
            collection(items, mode == BlockNestingMode::Set)
        }
        _ => value.clone(),
    }
}

fn collection(mut items: Vec<Value>, unordered: bool) -> Value {
    if items.is_empty() {
        return Value::Null;
    }
    if unordered {
        items.sort_by_cached_key(|item| item.to_string());
    }
    Value::Array(items)
}
