//! Validation of resource and provider configuration against a [`Schema`].
//!
//! ```
//! use thousandeyes_stream_provider::stream::stream_schema;
//! use thousandeyes_stream_provider::validation::validate;
//! use serde_json::json;
//!
//! let diagnostics = validate(&stream_schema(), &json!({
//!     "type": "opentelemetry",
//!     "stream_endpoint_url": "https://collector.example.com",
//!     "enabled": "yes"
//! }));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute.as_deref(), Some("enabled"));
//! ```

use serde_json::Value;

use crate::schema::{
    Attribute, AttributeType, Block, BlockNestingMode, Diagnostic, NestedBlock, Schema,
};

/// Validate `value` against `schema`.
///
/// Required attributes must be present and non-null, computed-only attributes
/// are ignored, and every present value must match its declared type. An
/// empty result means the value is valid.
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    validate_block(&schema.block, value, "", &mut diagnostics);
    diagnostics
}

/// Like [`validate`], but as a `Result`.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

/// Whether `value` passes [`validate`].
pub fn is_valid(schema: &Schema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

fn validate_block(block: &Block, value: &Value, path: &str, diagnostics: &mut Vec<Diagnostic>) {
    let obj = match value {
        Value::Object(map) => map,
        Value::Null => return,
        other => {
            let mut diag = Diagnostic::error("Expected object")
                .with_detail(format!("Got {}", type_name(other)));
            if !path.is_empty() {
                diag = diag.with_attribute(path);
            }
            diagnostics.push(diag);
            return;
        },
    };

    for (name, attr) in &block.attributes {
        validate_attribute(attr, obj.get(name), &join_path(path, name), diagnostics);
    }
    for (name, nested) in &block.blocks {
        validate_nested_block(nested, obj.get(name), &join_path(path, name), diagnostics);
    }
}

fn validate_attribute(
    attr: &Attribute,
    value: Option<&Value>,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.flags.computed && !attr.flags.optional && !attr.flags.required {
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
        Some(v) => validate_type(&attr.attr_type, v, path, diagnostics),
    }
}

fn validate_type(
    attr_type: &AttributeType,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let matches = match attr_type {
        AttributeType::String => value.is_string(),
        AttributeType::Int64 => value.is_i64(),
        AttributeType::Bool => value.is_boolean(),
        AttributeType::List(element) => match value.as_array() {
            Some(items) => {
                for (i, item) in items.iter().enumerate() {
                    validate_type(element, item, &format!("{}.{}", path, i), diagnostics);
                }
                true
            },
            None => false,
        },
    };

    if !matches {
        diagnostics.push(
            Diagnostic::error(format!("Invalid type for '{}'", path))
                .with_detail(format!(
                    "Expected {}, got {}",
                    expected_name(attr_type),
                    type_name(value)
                ))
                .with_attribute(path),
        );
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

    match nested.nesting_mode {
        BlockNestingMode::Single => validate_block(&nested.block, value, path, diagnostics),
        BlockNestingMode::List => {
            let Some(items) = value.as_array() else {
                diagnostics.push(
                    Diagnostic::error(format!("Expected list for block '{}'", path))
                        .with_detail(format!("Got {}", type_name(value)))
                        .with_attribute(path),
                );
                return;
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
            for (i, item) in items.iter().enumerate() {
                validate_block(&nested.block, item, &format!("{}.{}", path, i), diagnostics);
            }
        },
    }
}

fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", base, name)
    }
}

fn expected_name(attr_type: &AttributeType) -> &'static str {
    match attr_type {
        AttributeType::String => "string",
        AttributeType::Int64 => "int64",
        AttributeType::Bool => "bool",
        AttributeType::List(_) => "list",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::stream_schema;
    use serde_json::json;

    fn valid_stream() -> Value {
        json!({
            "type": "opentelemetry",
            "stream_endpoint_url": "https://collector.example.com:4317",
            "enabled": true,
            "test_match": [{"id": "123", "domain": "cea"}],
            "tag_match": [{"key": "team", "value": "netops"}]
        })
    }

    #[test]
    fn test_valid_stream() {
        assert!(is_valid(&stream_schema(), &valid_stream()));
        assert!(validate_result(&stream_schema(), &valid_stream()).is_ok());
    }

    #[test]
    fn test_computed_id_is_ignored() {
        let mut value = valid_stream();
        value["id"] = json!(42);
        assert!(is_valid(&stream_schema(), &value));
    }

    #[test]
    fn test_missing_required() {
        let diagnostics = validate(&stream_schema(), &json!({"enabled": true}));
        let mut attrs: Vec<_> = diagnostics
            .iter()
            .filter_map(|d| d.attribute.as_deref())
            .collect();
        attrs.sort_unstable();
        assert_eq!(attrs, vec!["stream_endpoint_url", "type"]);
    }

    #[test]
    fn test_nested_type_error_path() {
        let mut value = valid_stream();
        value["tag_match"] = json!([{"key": "team", "value": 7}]);
        let diagnostics = validate(&stream_schema(), &value);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("tag_match.0.value"));
        assert_eq!(diagnostics[0].detail.as_deref(), Some("Expected string, got number"));
    }

    #[test]
    fn test_block_must_be_list() {
        let mut value = valid_stream();
        value["test_match"] = json!({"id": "123"});
        let diagnostics = validate(&stream_schema(), &value);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Expected list for block 'test_match'");
    }

    #[test]
    fn test_root_must_be_object() {
        let diagnostics = validate(&stream_schema(), &json!("stream"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].attribute.is_none());
    }

    #[test]
    fn test_list_attribute_elements() {
        let schema = Schema::v0().with_attribute(
            "tags",
            Attribute::new(
                AttributeType::list(AttributeType::String),
                crate::schema::AttributeFlags::optional(),
            ),
        );
        let diagnostics = validate(&schema, &json!({"tags": ["a", 1]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("tags.1"));
    }

    #[test]
    fn test_int64() {
        let schema = Schema::v0().with_attribute("timeout", Attribute::optional_int64());
        assert!(is_valid(&schema, &json!({"timeout": 30})));
        assert!(!is_valid(&schema, &json!({"timeout": 1.5})));
        assert!(!is_valid(&schema, &json!({"timeout": "30"})));
    }

    #[test]
    fn test_list_block_item_limits() {
        let schema = Schema::v0().with_block(
            "test_match",
            NestedBlock::list(Block::new().with_attribute("id", Attribute::required_string()))
                .with_min_items(1)
                .with_max_items(2),
        );
        assert!(is_valid(&schema, &json!({"test_match": [{"id": "1"}]})));

        let diagnostics = validate(&schema, &json!({"test_match": []}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at least 1"));

        let three = json!({"test_match": [{"id": "1"}, {"id": "2"}, {"id": "3"}]});
        let diagnostics = validate(&schema, &three);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("at most 2"));

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("test_match"));
    }
}
