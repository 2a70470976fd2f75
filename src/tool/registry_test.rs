// ABOUTME: Tests for ToolRegistry - registration, duplicates, lookup, validation.
// ABOUTME: Uses a mock tool for testing.

use serde_json::{Value, json};

use super::*;
use crate::error::{RegistryError, ValidationError};

/// A simple test tool.
struct EchoTool;

#[async_trait::async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes input back"
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().required("message", ParamKind::String, "Text to echo")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        Ok(params["message"].clone())
    }
}

#[test]
fn test_register_and_resolve() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool).unwrap();

    let tool = registry.resolve("echo");
    assert!(tool.is_some());
    assert_eq!(tool.unwrap().name(), "echo");
}

#[test]
fn test_resolve_nonexistent() {
    let registry = ToolRegistry::new();
    assert!(registry.resolve("nonexistent").is_none());
}

#[test]
fn test_duplicate_registration_fails() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool).unwrap();

    let err = registry.register(EchoTool).unwrap_err();
    assert_eq!(err, RegistryError::DuplicateTool("echo".into()));
    assert_eq!(registry.count(), 1);
}

#[test]
fn test_validate_uses_schema() {
    let registry = ToolRegistry::new().with(EchoTool).unwrap();

    assert!(registry.validate("echo", &json!({"message": "hi"})).is_ok());
    assert!(matches!(
        registry.validate("echo", &json!({})),
        Err(ValidationError::MissingField { .. })
    ));
    assert_eq!(
        registry.validate("missing", &json!({})),
        Err(ValidationError::UnknownTool("missing".into()))
    );
}

#[test]
fn test_definitions_for_subset() {
    let mut registry = ToolRegistry::new();
    registry.register(EchoTool).unwrap();
    registry
        .register(FnTool::new("noop", "Does nothing", ToolSchema::new(), |_| async {
            Ok(Value::Null)
        }))
        .unwrap();

    assert_eq!(registry.list(), vec!["echo", "noop"]);

    let defs = registry.definitions_for(["echo", "unknown"]);
    assert_eq!(defs.len(), 1);
    assert_eq!(defs[0].name, "echo");
    assert_eq!(defs[0].description, "Echoes input back");
    assert_eq!(defs[0].input_schema["required"], json!(["message"]));
}

#[tokio::test]
async fn test_fn_tool_executes() {
    let tool = FnTool::new("double", "Doubles n", ToolSchema::new(), |params: Value| async move {
        let n = params["n"].as_i64().unwrap_or(0);
        Ok(json!(n * 2))
    });
    assert_eq!(tool.execute(json!({"n": 21})).await.unwrap(), json!(42));
}
