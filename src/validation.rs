//! Schema validation helpers.
//!
//! Validates a configuration `serde_json::Value` against a [`Schema`] and
//! reports problems as diagnostics rather than failing fast, so a single
//! validate call surfaces every mistake in a resource block.
//!
//! ```
//! use hemmer_provider_whisparr::schema::{Attribute, Schema};
//! use hemmer_provider_whisparr::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("label", Attribute::required_string())
//!     .with_attribute("id", Attribute::computed_int64());
//!
//! assert!(validate(&schema, &json!({"label": "vr"})).is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"label": 3}));
//! assert_eq!(diagnostics[0].attribute, Some("label".to_string()));
//! ```

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Validate a JSON value against a schema.
///
/// - Required attributes must be present and non-null
/// - Computed-only attributes are skipped (the provider sets them)
/// - Attribute types must match the schema; sets may not repeat elements
/// - Attributes the schema does not declare are rejected
/// - Nested blocks are validated recursively with min/max item constraints
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Validate a JSON value against a schema, returning Err with diagnostics on failure.
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
            let mut diag = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", value_type_name(value)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        let attr_path = join_path(path, name);
        validate_attribute(attr, obj.get(name), &attr_path, diagnostics);
    }

    for (name, nested) in &block.blocks {
        let block_path = join_path(path, name);
        validate_nested_block(nested, obj.get(name), &block_path, diagnostics);
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
        },
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
        AttributeType::String => {
            if !value.is_string() {
                diagnostics.push(type_error(path, "string", value));
            }
        },
        AttributeType::Int64 => {
            if !is_int64(value) {
                diagnostics.push(type_error(path, "int64", value));
            }
        },
        AttributeType::Float64 => {
            if !value.is_number() {
                diagnostics.push(type_error(path, "float64", value));
            }
        },
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        },
        AttributeType::List(element_type) => match value.as_array() {
            Some(arr) => validate_elements(element_type, arr, path, diagnostics),
            None => diagnostics.push(type_error(path, "list", value)),
        },
        AttributeType::Set(element_type) => match value.as_array() {
            Some(arr) => {
                validate_elements(element_type, arr, path, diagnostics);
                if let Some(dup) = first_duplicate(arr) {
                    diagnostics.push(
                        Diagnostic::error(format!("Duplicate set element in '{}'", path))
                            .with_detail(format!("The value {} appears more than once", dup))
                            .with_attribute(path),
                    );
                }
            },
            None => diagnostics.push(type_error(path, "set", value)),
        },
        AttributeType::Map(value_type) => match value.as_object() {
            Some(obj) => {
                for (key, val) in obj {
                    let key_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, val, &key_path, diagnostics);
                }
            },
            None => diagnostics.push(type_error(path, "map", value)),
        },
        AttributeType::Object(attrs) => match value.as_object() {
            Some(obj) => validate_object_type(attrs, obj, path, diagnostics),
            None => diagnostics.push(type_error(path, "object", value)),
        },
        AttributeType::Dynamic => {},
    }
}

fn validate_elements(
    element_type: &AttributeType,
    arr: &[Value],
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (i, elem) in arr.iter().enumerate() {
        let elem_path = format!("{}.{}", path, i);
        validate_attribute_type(element_type, elem, &elem_path, diagnostics);
    }
}

fn validate_object_type(
    attrs: &BTreeMap<String, AttributeType>,
    obj: &serde_json::Map<String, Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    // Object types carry no required/optional flags, so presence is not enforced.
    for (name, attr_type) in attrs {
        if let Some(value) = obj.get(name).filter(|v| !v.is_null()) {
            validate_attribute_type(attr_type, value, &join_path(path, name), diagnostics);
        }
    }
}

fn validate_nested_block(
    nested: &NestedBlock,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let value = match value {
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
            return;
        },
        Some(v) => v,
    };

    let items: Vec<(String, &Value)> = match (nested.nesting_mode, value) {
        (BlockNestingMode::Single, v) => {
            validate_block(&nested.block, v, path, diagnostics);
            return;
        },
        (BlockNestingMode::List | BlockNestingMode::Set, Value::Array(arr)) => arr
            .iter()
            .enumerate()
            .map(|(i, item)| (format!("{}.{}", path, i), item))
            .collect(),
        (BlockNestingMode::Map, Value::Object(obj)) => obj
            .iter()
            .map(|(key, item)| (format!("{}.{}", path, key), item))
            .collect(),
        (mode, v) => {
            let expected = if mode == BlockNestingMode::Map { "map" } else { "list" };
            diagnostics.push(
                Diagnostic::error(format!("Expected {} for block '{}'", expected, path))
                    .with_detail(format!("Got {}", value_type_name(v)))
                    .with_attribute(path),
            );
            return;
        },
    };

    let len = items.len() as u32;
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

    for (item_path, item) in items {
        validate_block(&nested.block, item, &item_path, diagnostics);
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn value_type_name(value: &Value) -> &'static str {
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
        Value::Number(n) => {
            n.is_i64()
                || n.as_f64().is_some_and(|f| {
                    f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64
                })
        },
        _ => false,
    }
}

fn first_duplicate(arr: &[Value]) -> Option<&Value> {
    arr.iter()
        .enumerate()
        .find(|(i, v)| arr[..*i].contains(*v))
        .map(|(_, v)| v)
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!("Expected {}, got {}", expected, value_type_name(got)))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Block, NestedBlock, Schema};
    use serde_json::json;

    fn indexer_like() -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_int64())
            .with_attribute("name", Attribute::required_string())
            .with_attribute("priority", Attribute::optional_int64())
            .with_attribute("enable_rss", Attribute::optional_bool())
            .with_attribute("seed_ratio", Attribute::optional_float64())
            .with_attribute("tags", Attribute::optional_int64_set())
    }

    #[test]
    fn test_validate_required_string() {
        let schema = indexer_like();

        assert!(validate(&schema, &json!({"name": "Nyaa"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));

        let diagnostics = validate(&schema, &json!({"name": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"name": 123}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_optional_and_computed() {
        let schema = indexer_like();

        assert!(validate(&schema, &json!({"name": "x", "priority": null})).is_empty());
        // computed-only attributes are not checked
        assert!(validate(&schema, &json!({"name": "x", "id": "abc"})).is_empty());

        let diagnostics = validate(&schema, &json!({"name": "x", "priority": "high"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("priority".to_string()));
    }

    #[test]
    fn test_validate_numbers() {
        let schema = indexer_like();

        assert!(validate(&schema, &json!({"name": "x", "priority": 25.0})).is_empty());
        assert_eq!(validate(&schema, &json!({"name": "x", "priority": 2.5})).len(), 1);
        assert!(validate(&schema, &json!({"name": "x", "seed_ratio": 1})).is_empty());
        assert!(validate(&schema, &json!({"name": "x", "seed_ratio": 0.5})).is_empty());
    }

    #[test]
    fn test_validate_set() {
        let schema = indexer_like();

        assert!(validate(&schema, &json!({"name": "x", "tags": [1, 2]})).is_empty());

        let diagnostics = validate(&schema, &json!({"name": "x", "tags": [1, "two"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("tags.1".to_string()));

        let diagnostics = validate(&schema, &json!({"name": "x", "tags": [3, 3]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Duplicate"));
    }

    #[test]
    fn test_validate_unknown_attribute() {
        let schema = indexer_like();

        let diagnostics = validate(&schema, &json!({"name": "x", "api_kee": "typo"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("api_kee".to_string()));
    }

    #[test]
    fn test_validate_map() {
        let schema = Schema::v0().with_attribute(
            "extra_headers",
            Attribute::optional(AttributeType::map(AttributeType::String)),
        );

        let headers = json!({"extra_headers": {"X-Forwarded-For": "10.0.0.1"}});
        assert!(validate(&schema, &headers).is_empty());

        let diagnostics = validate(&schema, &json!({"extra_headers": {"X-Retry": 3}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("extra_headers.X-Retry".to_string()));
    }

    #[test]
    fn test_validate_nested_set_block() {
        let schema = Schema::v0().with_block(
            "quality_groups",
            NestedBlock::set(
                Block::new()
                    .with_attribute("name", Attribute::optional_string())
                    .with_block(
                        "qualities",
                        NestedBlock::set(
                            Block::new().with_attribute("id", Attribute::required_int64()),
                        )
                        .with_min_items(1),
                    ),
            )
            .with_min_items(1),
        );

        let valid = json!({"quality_groups": [
            {"name": "WEB 1080p", "qualities": [{"id": 3}, {"id": 15}]}
        ]});
        assert!(validate(&schema, &valid).is_empty());

        let diagnostics = validate(&schema, &json!({"quality_groups": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let diagnostics = validate(
            &schema,
            &json!({"quality_groups": [{"qualities": [{"id": "bluray"}]}]}),
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].attribute,
            Some("quality_groups.0.qualities.0.id".to_string())
        );

        let diagnostics = validate(&schema, &json!({"quality_groups": {"name": "x"}}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected list"));
    }

    #[test]
    fn test_validate_single_block_max_items() {
        let schema = Schema::v0().with_block(
            "settings",
            NestedBlock::list(Block::new().with_attribute("host", Attribute::required_string()))
                .with_max_items(1),
        );

        let diagnostics = validate(&schema, &json!({"settings": [{"host": "a"}, {"host": "b"}]}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 1"));
    }

    #[test]
    fn test_validate_single_block_is_object() {
        let schema = Schema::v0().with_block(
            "auth",
            NestedBlock::single(
                Block::new().with_attribute("username", Attribute::required_string()),
            ),
        );

        assert!(validate(&schema, &json!({"auth": {"username": "admin"}})).is_empty());

        let diagnostics = validate(&schema, &json!({"auth": {}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("auth.username"));

        let diagnostics = validate(&schema, &json!({"auth": ["admin"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected object");
    }

    #[test]
    fn test_validate_object_type() {
        let mut fields = BTreeMap::new();
        fields.insert("host".to_string(), AttributeType::String);
        fields.insert("port".to_string(), AttributeType::Int64);

        let schema = Schema::v0().with_attribute(
            "endpoint",
            Attribute::new(AttributeType::Object(fields), AttributeFlags::required()),
        );

        let valid = json!({"endpoint": {"host": "localhost", "port": 6969}});
        assert!(validate(&schema, &valid).is_empty());

        let invalid = json!({"endpoint": {"host": "localhost", "port": "6969"}});
        let diagnostics = validate(&schema, &invalid);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("endpoint.port".to_string()));
    }

    #[test]
    fn test_helpers() {
        let schema = indexer_like();

        assert!(is_valid(&schema, &json!({"name": "x"})));
        assert!(!is_valid(&schema, &json!({})));
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let diagnostics = validate(&indexer_like(), &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
        assert!(diagnostics[0].attribute.is_none());
    }
}
