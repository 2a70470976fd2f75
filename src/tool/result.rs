// ABOUTME: Defines the ToolResult type - the single immutable outcome of
// ABOUTME: executing one tool call, successful or not.

use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Ok,
    Error,
}

/// Result of a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub tool_name: String,
    pub status: ToolStatus,

    /// Output payload when `status` is `Ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Failure description when `status` is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,

    #[serde(rename = "duration_ms", serialize_with = "as_millis")]
    pub duration: Duration,
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl ToolResult {
    /// Create a successful result.
    pub fn ok(tool_name: impl Into<String>, payload: Value, duration: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Ok,
            payload: Some(payload),
            error_detail: None,
            duration,
        }
    }

    /// Create an error result.
    pub fn error(tool_name: impl Into<String>, detail: impl Into<String>, duration: Duration) -> Self {
        Self {
            tool_name: tool_name.into(),
            status: ToolStatus::Error,
            payload: None,
            error_detail: Some(detail.into()),
            duration,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ToolStatus::Ok
    }

    /// Render the payload or error detail as text for the conversation context.
    pub fn render(&self) -> String {
        match (&self.payload, &self.error_detail) {
            (Some(Value::String(s)), _) => s.clone(),
            (Some(v), _) => v.to_string(),
            (None, Some(detail)) => format!("error: {detail}"),
            (None, None) => String::new(),
        }
    }
}
