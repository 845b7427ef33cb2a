//! Schema validation helpers.
//!
//! Validates a configuration `serde_json::Value` against a [`Schema`] and
//! reports every problem as a [`Diagnostic`] carrying the attribute path.
//!
//! # Example
//!
//! ```
//! use librato_provider::schema::{Schema, Attribute};
//! use librato_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("rearm_seconds", Attribute::optional_int64().at_least(0));
//!
//! let diagnostics = validate(&schema, &json!({"name": "cpu", "rearm_seconds": 600}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "cpu", "rearm_seconds": -1}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("rearm_seconds".to_string()));
//! ```

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Constraints, Diagnostic, NestedBlock,
    Schema,
};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// An empty result means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (provider sets these)
/// - Attribute types must match the schema
/// - Value constraints (`one_of`, `min`, non-empty, JSON object) must hold
/// - Keys not declared by the schema are rejected
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Ok if valid or Err with diagnostics.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Check if a JSON value is valid against a schema.
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        _ => {
            let diagnostic =
                Diagnostic::error("Expected object").with_detail(format!("Got {}", type_name(value)));
            diagnostics.push(if path.is_empty() {
                diagnostic
            } else {
                diagnostic.with_attribute(path)
            });
            return;
        }
    };

    for key in obj.keys() {
        if !block.declares(key) {
            let key_path = join_path(path, key);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported argument '{}'", key_path))
                    .with_detail("An argument with this name is not expected here")
                    .with_attribute(key_path),
            );
        }
    }

    for name in block.field_names() {
        let field_path = join_path(path, name);
        if let Some(attr) = block.attributes.get(name) {
            validate_attribute(attr, obj.get(name), &field_path, diagnostics);
        } else if let Some(nested) = block.blocks.get(name) {
            validate_nested_block(nested, obj.get(name), &field_path, diagnostics);
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.is_computed_only() {
        return;
    }

    match value {
        None | Some(Value::Null) => {
            if attr.flags.required {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required attribute '{}'", path))
                        .with_detail("This attribute is required and must be provided")
                        .with_attribute(path),
                );
            }
        }
        Some(v) => {
            let before = diagnostics.len();
            validate_attribute_type(&attr.attr_type, v, path, diagnostics);
            // Constraints only make sense once the shape is right.
            if diagnostics.len() == before {
                validate_constraints(&attr.constraints, v, path, diagnostics);
            }
        }
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        }
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        }
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        }
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::List(element_type) | AttributeType::Set(element_type) => {
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                let expected = if attr_type.is_unordered() { "set" } else { "list" };
                diagnostics.push(type_error(path, expected, value));
            }
        }
    }
}

fn validate_constraints(
    constraints: &Constraints,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(s) = value.as_str() {
        if constraints.non_empty && s.is_empty() {
            diagnostics.push(
                Diagnostic::error(format!("Attribute '{}' must not be empty", path))
                    .with_attribute(path),
            );
        }
        if !constraints.one_of.is_empty() && !constraints.one_of.iter().any(|v| v == s) {
            diagnostics.push(
                Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                    .with_detail(format!(
                        "Expected one of [{}], got \"{}\"",
                        constraints.one_of.join(", "),
                        s
                    ))
                    .with_attribute(path),
            );
        }
        if constraints.json_object {
            match serde_json::from_str::<Value>(s) {
                Ok(Value::Object(_)) => {}
                Ok(other) => diagnostics.push(
                    Diagnostic::error(format!("Attribute '{}' must be a JSON object", path))
                        .with_detail(format!("Got {}", type_name(&other)))
                        .with_attribute(path),
                ),
                Err(e) => diagnostics.push(
                    Diagnostic::error(format!("Attribute '{}' is not valid JSON", path))
                        .with_detail(e.to_string())
                        .with_attribute(path),
                ),
            }
        }
    }

    if let (Some(min), Some(n)) = (constraints.min, value.as_f64()) {
        if n < min as f64 {
            diagnostics.push(
                Diagnostic::error(format!("Attribute '{}' is out of range", path))
                    .with_detail(format!("Expected a value of at least {}, got {}", min, n))
                    .with_attribute(path),
            );
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match nested.nesting_mode {
        BlockNestingMode::Single => validate_single_block(nested, value, path, diagnostics),
        BlockNestingMode::List | BlockNestingMode::Set => {
            validate_list_block(nested, value, path, diagnostics)
        }
    }
}

fn validate_single_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!("Missing required block '{}'", path))
                        .with_detail("At least one block is required")
                        .with_attribute(path),
                );
            }
        }
        // A single block written in list form, e.g. `attributes { ... }` decoded as `[{...}]`.
        Some(Value::Array(arr)) if arr.len() <= 1 => {
            if let Some(item) = arr.first() {
                validate_block(&nested.block, item, path, diagnostics);
            }
        }
        Some(Value::Array(arr)) => {
            diagnostics.push(
                Diagnostic::error(format!(
                    "Block '{}' allows at most 1 item(s), got {}",
                    path,
                    arr.len()
                ))
                .with_attribute(path),
            );
        }
        Some(v) => validate_block(&nested.block, v, path, diagnostics),
    }
}

fn validate_list_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match value {
        None | Some(Value::Null) => {
            if nested.min_items > 0 {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s)",
                        path, nested.min_items
                    ))
                    .with_attribute(path),
                );
            }
        }
        Some(Value::Array(arr)) => {
            let len = arr.len() as u32;

            if len < nested.min_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' requires at least {} item(s), got {}",
                        path, nested.min_items, len
                    ))
                    .with_attribute(path),
                );
            }

            // 0 means unlimited
            if nested.max_items > 0 && len > nested.max_items {
                diagnostics.push(
                    Diagnostic::error(format!(
                        "Block '{}' allows at most {} item(s), got {}",
                        path, nested.max_items, len
                    ))
                    .with_attribute(path),
                );
            }

            for (i, item) in arr.iter().enumerate() {
                let item_path = format!("{}.{}", path, i);
                validate_block(&nested.block, item, &item_path, diagnostics);
            }
        }
        Some(v) => {
            diagnostics.push(
                Diagnostic::error(format!("Expected list for block '{}'", path))
                    .with_detail(format!("Got {}", type_name(v)))
                    .with_attribute(path),
            );
        }
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_int64(value: &Value) -> bool {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => true,
        Value::Number(n) => n
            .as_f64()
            .map(|f| f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64)
            .unwrap_or(false),
        _ => false,
    }
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, type_name(got)))
        .with_attribute(path)
}
