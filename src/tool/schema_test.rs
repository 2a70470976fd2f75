// ABOUTME: Tests for ToolSchema - required fields, coercion, enums, unknown keys.
// ABOUTME: Also checks the JSON Schema rendering handed to the oracle.

use serde_json::{Value, json};

use super::*;
use crate::error::ValidationError;

fn cleanup_schema() -> ToolSchema {
    ToolSchema::new()
        .required("pattern", ParamKind::String, "VM naming pattern key")
        .optional("dry_run", ParamKind::Boolean, "Only plan deletions")
        .optional("keep", ParamKind::Integer, "How many to keep")
        .optional("mode", ParamKind::String, "Cleanup mode")
        .one_of(["age", "count"])
}

#[test]
fn test_valid_arguments_pass_through() {
    let args = cleanup_schema()
        .validate("cleanup", &json!({"pattern": "ci", "dry_run": true}))
        .unwrap();
    assert_eq!(args["pattern"], "ci");
    assert_eq!(args["dry_run"], true);
    assert!(!args.contains_key("keep"));
}

#[test]
fn test_missing_required_field() {
    let err = cleanup_schema().validate("cleanup", &json!({"dry_run": true})).unwrap_err();
    assert_eq!(
        err,
        ValidationError::MissingField {
            tool: "cleanup".into(),
            field: "pattern".into()
        }
    );
}

#[test]
fn test_null_required_field_is_missing() {
    let err = cleanup_schema().validate("cleanup", &json!({"pattern": null})).unwrap_err();
    assert!(matches!(err, ValidationError::MissingField { .. }));
}

#[test]
fn test_null_optional_field_is_absent() {
    let args = cleanup_schema()
        .validate("cleanup", &json!({"pattern": "ci", "keep": null}))
        .unwrap();
    assert!(!args.contains_key("keep"));
}

#[test]
fn test_unknown_key_rejected() {
    let err = cleanup_schema()
        .validate("cleanup", &json!({"pattern": "ci", "force": true}))
        .unwrap_err();
    assert_eq!(
        err,
        ValidationError::UnknownField {
            tool: "cleanup".into(),
            field: "force".into()
        }
    );
}

#[test]
fn test_numeric_string_coerces_to_integer() {
    let args = cleanup_schema()
        .validate("cleanup", &json!({"pattern": "ci", "keep": "5"}))
        .unwrap();
    assert_eq!(args["keep"], json!(5));
}

#[test]
fn test_whole_float_coerces_to_integer() {
    let args = cleanup_schema()
        .validate("cleanup", &json!({"pattern": "ci", "keep": 3.0}))
        .unwrap();
    assert_eq!(args["keep"], json!(3));
}

#[test]
fn test_failed_coercion_rejected() {
    let err = cleanup_schema()
        .validate("cleanup", &json!({"pattern": "ci", "keep": "five"}))
        .unwrap_err();
    match err {
        ValidationError::TypeMismatch { field, expected, found, .. } => {
            assert_eq!(field, "keep");
            assert_eq!(expected, "integer");
            assert_eq!(found, "string");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_boolean_string_coerces() {
    let args = cleanup_schema()
        .validate("cleanup", &json!({"pattern": "ci", "dry_run": "FALSE"}))
        .unwrap();
    assert_eq!(args["dry_run"], false);
}

#[test]
fn test_enumerated_values() {
    let schema = cleanup_schema();
    assert!(schema.validate("cleanup", &json!({"pattern": "ci", "mode": "age"})).is_ok());

    let err = schema
        .validate("cleanup", &json!({"pattern": "ci", "mode": "random"}))
        .unwrap_err();
    assert!(matches!(err, ValidationError::NotAllowed { ref field, .. } if field == "mode"));
}

#[test]
fn test_non_object_arguments_rejected() {
    let err = cleanup_schema().validate("cleanup", &json!(["ci"])).unwrap_err();
    assert!(matches!(err, ValidationError::NotAnObject { .. }));
}

#[test]
fn test_null_arguments_with_no_required_fields() {
    let schema = ToolSchema::new().optional("directory", ParamKind::String, "");
    assert!(schema.validate("list_files", &Value::Null).unwrap().is_empty());
}

#[test]
fn test_to_json_schema() {
    let rendered = cleanup_schema().to_json_schema();
    assert_eq!(rendered["type"], "object");
    assert_eq!(rendered["properties"]["pattern"]["type"], "string");
    assert_eq!(rendered["properties"]["mode"]["enum"], json!(["age", "count"]));
    assert_eq!(rendered["required"], json!(["pattern"]));
    assert_eq!(rendered["additionalProperties"], false);
}
