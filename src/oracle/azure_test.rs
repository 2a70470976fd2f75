// ABOUTME: Tests for Azure client type conversions.
// ABOUTME: Verifies request serialization and reply parsing.

use serde_json::json;

use super::*;
use crate::error::OracleError;

#[test]
fn test_request_serialization() {
    let req = OracleRequest::new()
        .system("You route operator requests")
        .message(OracleMessage::user("List the CI VMs"))
        .message(OracleMessage::assistant("Looking"))
        .max_tokens(512);

    let body = AzureRequest::from(&req);
    assert_eq!(body.messages.len(), 3);
    assert_eq!(body.messages[0].role, "system");
    assert_eq!(body.messages[1].role, "user");
    assert_eq!(body.messages[2].content, "Looking");
    assert_eq!(body.max_tokens, Some(512));

    let json = serde_json::to_value(&body).unwrap();
    assert!(json.get("tools").is_none());
    assert!(json.get("temperature").is_none());
}

#[test]
fn test_tool_serialization() {
    let tool = ToolDefinition {
        name: "list_vms".to_string(),
        description: "List VMs by pattern".to_string(),
        input_schema: json!({"type": "object", "properties": {"pattern": {"type": "string"}}}),
    };

    let json = serde_json::to_value(AzureTool::from(&tool)).unwrap();
    assert_eq!(json["type"], "function");
    assert_eq!(json["function"]["name"], "list_vms");
    assert!(json["function"]["parameters"]["properties"]["pattern"].is_object());
}

#[test]
fn test_text_reply() {
    let resp: AzureResponse = serde_json::from_value(json!({
        "choices": [{"message": {"role": "assistant", "content": "3 VMs found"}, "finish_reason": "stop"}]
    }))
    .unwrap();

    assert_eq!(OracleReply::try_from(resp).unwrap(), OracleReply::text("3 VMs found"));
}

#[test]
fn test_tool_call_reply_takes_first_call() {
    let resp: AzureResponse = serde_json::from_value(json!({
        "choices": [{
            "message": {
                "content": null,
                "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "list_vms", "arguments": "{\"pattern\":\"ci\"}"}},
                    {"id": "call_2", "type": "function", "function": {"name": "read_file", "arguments": "{}"}}
                ]
            },
            "finish_reason": "tool_calls"
        }]
    }))
    .unwrap();

    assert_eq!(
        OracleReply::try_from(resp).unwrap(),
        OracleReply::tool_call("list_vms", json!({"pattern": "ci"}))
    );
}

#[test]
fn test_unparseable_arguments_kept_raw() {
    let resp: AzureResponse = serde_json::from_value(json!({
        "choices": [{"message": {"tool_calls": [
            {"id": "call_1", "type": "function", "function": {"name": "list_vms", "arguments": "{pattern"}}
        ]}}]
    }))
    .unwrap();

    assert_eq!(
        OracleReply::try_from(resp).unwrap(),
        OracleReply::tool_call("list_vms", json!("{pattern"))
    );
}

#[test]
fn test_empty_choices_are_malformed() {
    let resp: AzureResponse = serde_json::from_value(json!({"choices": []})).unwrap();
    assert!(matches!(OracleReply::try_from(resp), Err(OracleError::Malformed(_))));
}

#[test]
fn test_url_uses_deployment() {
    let client = AzureOpenAIClient::new("key", "https://example.openai.azure.com/").with_model("gpt-4o");
    assert_eq!(
        client.url(),
        "https://example.openai.azure.com/openai/deployments/gpt-4o/chat/completions?api-version=2024-02-01"
    );
}
