// ABOUTME: Message types appended to a conversation: text, tool calls and
// ABOUTME: tool results, each stamped with a sequence number.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::tool::ToolResult;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Agent,
    Tool,
}

/// A proposed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCall {
    pub tool_name: String,
    pub arguments: Value,
    pub issued_by: String,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>, arguments: Value, issued_by: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            issued_by: issued_by.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Content {
    Text(String),
    ToolCall(ToolCall),
    ToolResult(ToolResult),
}

/// One immutable entry in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub speaker_id: String,
    pub role: Role,
    pub content: Content,
    pub timestamp: DateTime<Utc>,
    pub sequence_number: u64,
    /// For tool results, the sequence number of the call they answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<u64>,
}

impl Message {
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Content::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn tool_call(&self) -> Option<&ToolCall> {
        match &self.content {
            Content::ToolCall(c) => Some(c),
            _ => None,
        }
    }

    pub fn tool_result(&self) -> Option<&ToolResult> {
        match &self.content {
            Content::ToolResult(r) => Some(r),
            _ => None,
        }
    }

    /// One-line rendering used when building oracle context.
    pub fn render(&self) -> String {
        match &self.content {
            Content::Text(t) => format!("[{}] {}", self.speaker_id, t),
            Content::ToolCall(c) => format!("[{}] call {} {}", self.speaker_id, c.tool_name, c.arguments),
            Content::ToolResult(r) => format!("[{}] result {}", r.tool_name, r.render()),
        }
    }
}
