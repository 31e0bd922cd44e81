//! Schema-driven validation of configuration values.
//!
//! [`validate`] checks a JSON document against a [`Schema`]: required
//! attributes, attribute types, unknown attributes and nested block item
//! counts. Resource handlers layer their own rules on top using the
//! helpers at the bottom of this module ([`one_of`], [`mutually_exclusive`]).

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};

/// Validate a JSON value against a schema. An empty result means valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_error(path: &str, expected: &str, value: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(value)))
        .with_attribute(path)
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        other => {
            let mut diagnostic = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(other)));
            if !path.is_empty() {
                diagnostic = diagnostic.with_attribute(path);
            }
            diagnostics.push(diagnostic);
            return;
        }
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }

    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }

    for name in obj.keys() {
        if !block.attributes.contains_key(name) && !block.blocks.contains_key(name) {
            let attr_path = join_path(path, name);
            diagnostics.push(
                Diagnostic::error(format!("Unsupported attribute '{}'", attr_path))
                    .with_detail("An attribute with this name is not expected here")
                    .with_attribute(attr_path),
            );
        }
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
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
        // Computed-only values come from the provider; prior state may echo
        // them back, so only their type is checked.
        Some(v) => validate_attribute_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_attribute_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    match attr_type {
        AttributeType::String if !value.is_string() => {
            diagnostics.push(type_error(path, "string", value))
        }
        AttributeType::Int64 if !(value.is_i64() || value.is_u64()) => {
            diagnostics.push(type_error(path, "int64", value))
        }
        AttributeType::Float64 if !value.is_number() => {
            diagnostics.push(type_error(path, "float64", value))
        }
        AttributeType::Bool if !value.is_boolean() => {
            diagnostics.push(type_error(path, "bool", value))
        }
        AttributeType::List(element) | AttributeType::Set(element) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_attribute_type(element, item, &format!("{}.{}", path, i), diagnostics);
                }
            }
            None => diagnostics.push(type_error(
                path,
                if attr_type.is_set() { "set" } else { "list" },
                value,
            )),
        },
        AttributeType::Map(element) => match value.as_object() {
            Some(entries) => {
                for (key, item) in entries {
                    validate_attribute_type(element, item, &join_path(path, key), diagnostics);
                }
            }
            None => diagnostics.push(type_error(path, "map", value)),
        },
        AttributeType::Object(fields) => match value.as_object() {
            Some(obj) => validate_object_type(fields, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
        _ => {}
    }
}

fn validate_object_type(
    fields: &BTreeMap<String, AttributeType>,
    obj: &Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (name, field_type) in fields {
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_attribute_type(field_type, value, &join_path(path, name), diagnostics);
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let value = value.filter(|v| !v.is_null());

    match (nested.nesting_mode, value) {
        (_, None) => {
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
        (BlockNestingMode::Single, Some(v)) => validate_block(&nested.block, v, path, diagnostics),
        (BlockNestingMode::List | BlockNestingMode::Set, Some(Value::Array(items))) => {
            check_item_count(nested, items.len(), path, diagnostics);
            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        }
        (BlockNestingMode::Map, Some(Value::Object(entries))) => {
            check_item_count(nested, entries.len(), path, diagnostics);
            for (key, item) in entries {
                validate_block(&nested.block, item, &join_path(path, key), diagnostics);
            }
        }
        (mode, Some(other)) => diagnostics.push(
            Diagnostic::error(format!(
                "Expected {} for block '{}'",
                if mode == BlockNestingMode::Map { "map" } else { "list" },
                path
            ))
            .with_detail(format!("Got {}", value_type_name(other)))
            .with_attribute(path),
        ),
    }
}

fn check_item_count(
    nested: &NestedBlock,
    len: usize,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let len = len as u32;
    if len < nested.min_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' requires at least {} item(s), got {}",
                path, nested.min_items, len
            ))
            .with_attribute(path),
        );
    }
    if nested.max_items > 0 && len > nested.max_items {
        diagnostics.push(
            Diagnostic::error(format!(
                "Block '{}' allows at most {} item(s), got {}",
                path, nested.max_items, len
            ))
            .with_attribute(path),
        );
    }
}

/// Check that a string attribute, when set, takes one of `allowed`.
pub fn one_of(config: &Value, attribute: &str, allowed: &[&str]) -> Option<Diagnostic> {
    let value = config.get(attribute)?.as_str()?;
    if allowed.contains(&value) {
        return None;
    }
    Some(
        Diagnostic::error(format!("Invalid value for '{}'", attribute))
            .with_detail(format!("Expected one of {}, got '{}'", allowed.join(", "), value))
            .with_attribute(attribute),
    )
}

/// Check that at most one of `attributes` is set.
pub fn mutually_exclusive(config: &Value, attributes: &[&str]) -> Option<Diagnostic> {
    let set: Vec<&str> = attributes
        .iter()
        .copied()
        .filter(|name| config.get(*name).is_some_and(|v| !v.is_null()))
        .collect();
    if set.len() < 2 {
        return None;
    }
    Some(
        Diagnostic::error("Conflicting attributes")
            .with_detail(format!("{} cannot be set together", set.join(" and ")))
            .with_attribute(set[1]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use serde_json::json;

    fn destination_like() -> Schema {
        Schema::new(1)
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("group_id", Attribute::required_string())
            .with_attribute("run_setup_tests", Attribute::optional_bool())
            .with_attribute("config", Attribute::optional_dynamic())
            .with_attribute("trust_fingerprints", Attribute::optional_string_set())
            .with_timeouts()
    }

    #[test]
    fn test_valid_config() {
        let config = json!({
            "group_id": "group_id",
            "run_setup_tests": false,
            "config": {"host": "db", "port": 5432},
            "trust_fingerprints": ["ab:cd"],
            "timeouts": {"create": "30m"}
        });
        assert!(validate(&destination_like(), &config).is_empty());
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = validate(&destination_like(), &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("group_id"));
    }

    #[test]
    fn test_wrong_types() {
        let diagnostics = validate(
            &destination_like(),
            &json!({"group_id": 7, "trust_fingerprints": ["ok", 1]}),
        );
        let paths: Vec<_> = diagnostics.iter().filter_map(|d| d.attribute.clone()).collect();
        assert_eq!(paths, vec!["group_id", "trust_fingerprints.1"]);
    }

    #[test]
    fn test_unknown_attribute() {
        let diagnostics = validate(&destination_like(), &json!({"group_id": "g", "grup_id": "g"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("grup_id"));
    }

    #[test]
    fn test_nested_block_attributes() {
        let diagnostics = validate(
            &destination_like(),
            &json!({"group_id": "g", "timeouts": {"create": 30}}),
        );
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("timeouts.create"));
    }

    #[test]
    fn test_list_block_item_counts() {
        let schema = Schema::v0().with_block(
            "connection",
            NestedBlock::set(Block::new().with_attribute("id", Attribute::required_string()))
                .with_min_items(1),
        );
        assert_eq!(validate(&schema, &json!({"connection": []})).len(), 1);
        assert!(validate(&schema, &json!({"connection": [{"id": "c1"}]})).is_empty());
        assert_eq!(validate(&schema, &json!({"connection": [{}]})).len(), 1);
    }

    #[test]
    fn test_one_of() {
        let allowed = ["ALLOW_ALL", "ALLOW_COLUMNS", "BLOCK_ALL"];
        let field = "schema_change_handling";
        assert!(one_of(&json!({field: "BLOCK_ALL"}), field, &allowed).is_none());
        assert!(one_of(&json!({}), field, &allowed).is_none());
        let diagnostic = one_of(&json!({field: "NOPE"}), field, &allowed).unwrap();
        assert!(diagnostic.detail.unwrap().contains("NOPE"));
    }

    #[test]
    fn test_mutually_exclusive() {
        let pair = ["disabled_schemas", "enabled_schemas"];
        assert!(mutually_exclusive(&json!({"disabled_schemas": ["a"]}), &pair).is_none());
        let cleared = json!({"disabled_schemas": ["a"], "enabled_schemas": null});
        assert!(mutually_exclusive(&cleared, &pair).is_none());
        let both = json!({"disabled_schemas": ["a"], "enabled_schemas": ["b"]});
        let diagnostic = mutually_exclusive(&both, &pair).unwrap();
        assert_eq!(diagnostic.attribute.as_deref(), Some("enabled_schemas"));
    }
}
