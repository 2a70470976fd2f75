// ABOUTME: Core types for oracle communication - prompt messages, tool
// ABOUTME: definitions, requests, and the text-or-tool-call reply.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a prompt message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OracleRole {
    User,
    Assistant,
}

/// One message of oracle context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleMessage {
    pub role: OracleRole,
    pub text: String,
}

impl OracleMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: OracleRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: OracleRole::Assistant,
            text: text.into(),
        }
    }
}

/// Definition of a tool offered to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Context plus options for one completion.
#[derive(Debug, Clone, Default)]
pub struct OracleRequest {
    pub system: Option<String>,
    pub messages: Vec<OracleMessage>,
    pub tools: Vec<ToolDefinition>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl OracleRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the request.
    pub fn message(mut self, message: OracleMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Add messages to the request.
    pub fn messages(mut self, messages: impl IntoIterator<Item = OracleMessage>) -> Self {
        self.messages.extend(messages);
        self
    }

    /// Add tool definitions.
    pub fn tools(mut self, tools: impl IntoIterator<Item = ToolDefinition>) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Set the system prompt.
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// What the oracle produced: free text or a single tool-call intent.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleReply {
    Text(String),
    ToolCall { name: String, arguments: Value },
}

impl OracleReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn tool_call(name: impl Into<String>, arguments: Value) -> Self {
        Self::ToolCall {
            name: name.into(),
            arguments,
        }
    }
}
