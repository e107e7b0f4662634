//! Schema validation helpers.
//!
//! Validates a `serde_json::Value` configuration against a [`Schema`] so that
//! bad input is reported with attribute paths before any BAM call is made.
//!
//! # Example
//!
//! ```
//! use bluecat_provider::schema::{Schema, Attribute};
//! use bluecat_provider::validation::validate;
//! use serde_json::json;
//!
//! let schema = Schema::v0()
//!     .with_attribute("name", Attribute::required_string())
//!     .with_attribute("size", Attribute::required_int64());
//!
//! let diagnostics = validate(&schema, &json!({"name": "lab", "size": 256}));
//! assert!(diagnostics.is_empty());
//!
//! let diagnostics = validate(&schema, &json!({"name": "lab", "size": "big"}));
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].attribute, Some("size".to_string()));
//! ```

use crate::schema::{Attribute, AttributeType, Diagnostic, Schema};
use serde_json::Value;

/// Validate a JSON value against a schema.
///
/// An empty list means the value is valid.
///
/// # Validation Rules
///
/// - Required attributes must be present and non-null
/// - Optional attributes may be absent or null
/// - Computed-only attributes are skipped (the provider sets these)
/// - Attribute types must match the schema
/// - String attributes with allowed values must hold one of them
pub fn validate(schema: &Schema, value: &Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    let obj = match value {
        Value::Object(map) => map,
        // Nothing configured; only required attributes can be wrong.
        Value::Null => {
            for (name, attr) in &schema.block.attributes {
                validate_attribute(attr, None, name, &mut diagnostics);
            }
            return diagnostics;
        }
        _ => {
            diagnostics.push(
                Diagnostic::error("Expected object")
                    .with_detail(format!("Got {}", value_type_name(value))),
            );
            return diagnostics;
        }
    };

    for (name, attr) in &schema.block.attributes {
        validate_attribute(attr, obj.get(name), name, &mut diagnostics);
    }

    diagnostics
}

/// Validate a JSON value against a schema, returning Err with the
/// diagnostics if any were produced.
pub fn validate_result(schema: &Schema, value: &Value) -> Result<(), Vec<Diagnostic>> {
    let diagnostics = validate(schema, value);
    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
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
            if diagnostics.len() == before {
                validate_allowed_values(attr, v, path, diagnostics);
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
        AttributeType::Bool => {
            if !value.is_boolean() {
                diagnostics.push(type_error(path, "bool", value));
            }
        }
        AttributeType::Set(element_type) => {
            // Sets are represented as arrays in JSON
            if let Some(arr) = value.as_array() {
                for (i, elem) in arr.iter().enumerate() {
                    let elem_path = format!("{}.{}", path, i);
                    validate_attribute_type(element_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "set", value));
            }
        }
        AttributeType::Map(value_type) => {
            if let Some(map) = value.as_object() {
                for (key, elem) in map {
                    let elem_path = format!("{}.{}", path, key);
                    validate_attribute_type(value_type, elem, &elem_path, diagnostics);
                }
            } else {
                diagnostics.push(type_error(path, "map", value));
            }
        }
    }
}

fn validate_allowed_values(
    attr: &Attribute,
    value: &Value,
    path: &str,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if attr.allowed_values.is_empty() {
        return;
    }

    let Some(s) = value.as_str() else {
        return;
    };

    if !attr.allowed_values.iter().any(|allowed| allowed == s) {
        diagnostics.push(
            Diagnostic::error(format!("Invalid value for attribute '{}'", path))
                .with_detail(format!(
                    "Expected one of {:?}, got {:?}",
                    attr.allowed_values, s
                ))
                .with_attribute(path),
        );
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

// Only integer literals: serde rejects `256.0` when decoding into i64.
fn is_int64(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_i64())
}

fn type_error(path: &str, expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(format!("Invalid type for attribute '{}'", path))
        .with_detail(format!(
            "Expected {}, got {}",
            expected,
            value_type_name(got)
        ))
        .with_attribute(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, AttributeFlags, Schema};
    use serde_json::json;

    #[test]
    fn test_validate_required_string() {
        let schema = Schema::v0().with_attribute("parent_id", Attribute::required_string());

        assert!(validate(&schema, &json!({"parent_id": "100"})).is_empty());

        let diagnostics = validate(&schema, &json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("parent_id".to_string()));

        let diagnostics = validate(&schema, &json!({"parent_id": null}));
        assert_eq!(diagnostics.len(), 1);

        let diagnostics = validate(&schema, &json!({"parent_id": 100}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid type"));
    }

    #[test]
    fn test_validate_null_config_reports_required() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("is_larger_allowed", Attribute::optional_bool());

        let diagnostics = validate(&schema, &Value::Null);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("name".to_string()));
    }

    #[test]
    fn test_validate_computed_attribute_skipped() {
        let schema = Schema::v0().with_attribute("addresses_free", Attribute::computed_int64());

        assert!(validate(&schema, &json!({})).is_empty());
        assert!(validate(&schema, &json!({"addresses_free": "many"})).is_empty());
    }

    #[test]
    fn test_validate_int64() {
        let schema = Schema::v0().with_attribute("size", Attribute::required_int64());

        assert!(validate(&schema, &json!({"size": 256})).is_empty());
        assert_eq!(validate(&schema, &json!({"size": 256.5})).len(), 1);
        assert_eq!(validate(&schema, &json!({"size": "256"})).len(), 1);
    }

    #[test]
    fn test_validate_int64_rejects_whole_float() {
        let schema = Schema::v0().with_attribute("size", Attribute::required_int64());

        let diagnostics = validate(&schema, &json!({"size": 256.0}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("size".to_string()));
        assert!(diagnostics[0].summary.contains("Invalid type"));

        // Anything accepted here must also decode into the typed arguments.
        assert!(serde_json::from_value::<i64>(json!(256.0)).is_err());
        assert_eq!(validate(&schema, &json!({"size": u64::MAX})).len(), 1);
    }

    #[test]
    fn test_validate_bool() {
        let schema = Schema::v0().with_attribute("is_larger_allowed", Attribute::optional_bool());

        assert!(validate(&schema, &json!({"is_larger_allowed": true})).is_empty());
        assert_eq!(
            validate(&schema, &json!({"is_larger_allowed": "true"})).len(),
            1
        );
    }

    #[test]
    fn test_validate_set() {
        let schema = Schema::v0().with_attribute(
            "domains",
            Attribute::new(
                AttributeType::set(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"domains": ["a", "b"]})).is_empty());

        let diagnostics = validate(&schema, &json!({"domains": ["a", 2]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("domains.1".to_string()));
    }

    #[test]
    fn test_validate_map() {
        let schema = Schema::v0().with_attribute(
            "labels",
            Attribute::new(
                AttributeType::map(AttributeType::String),
                AttributeFlags::optional(),
            ),
        );

        assert!(validate(&schema, &json!({"labels": {"site": "lab"}})).is_empty());

        let diagnostics = validate(&schema, &json!({"labels": {"site": 4}}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("labels.site".to_string()));

        let diagnostics = validate(&schema, &json!({"labels": ["site"]}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute, Some("labels".to_string()));
    }

    #[test]
    fn test_validate_allowed_values() {
        let schema = Schema::v0().with_attribute(
            "type",
            Attribute::required_string().with_allowed_values(["IP4Block", "IP4Network", ""]),
        );

        assert!(validate(&schema, &json!({"type": "IP4Block"})).is_empty());
        assert!(validate(&schema, &json!({"type": ""})).is_empty());

        let diagnostics = validate(&schema, &json!({"type": "IP6Network"}));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Invalid value"));
    }

    #[test]
    fn test_validate_multiple_errors() {
        let schema = Schema::v0()
            .with_attribute("name", Attribute::required_string())
            .with_attribute("size", Attribute::required_int64())
            .with_attribute("is_larger_allowed", Attribute::optional_bool());

        let diagnostics = validate(
            &schema,
            &json!({"name": 1, "size": "x", "is_larger_allowed": "no"}),
        );
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_validate_result_helper() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        assert!(validate_result(&schema, &json!({"name": "lab"})).is_ok());
        assert_eq!(validate_result(&schema, &json!({})).unwrap_err().len(), 1);
    }

    #[test]
    fn test_validate_root_not_object() {
        let schema = Schema::v0().with_attribute("name", Attribute::required_string());

        let diagnostics = validate(&schema, &json!("not an object"));
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].summary.contains("Expected object"));
    }
}
