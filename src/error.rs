// ABOUTME: Defines all error types for switchboard using thiserror.
// ABOUTME: Each concern has its own error enum, unified under SwitchboardError.

use std::path::PathBuf;
use std::time::Duration;

use crate::conversation::ConversationState;

/// Top-level error type for the switchboard library.
#[derive(Debug, thiserror::Error)]
pub enum SwitchboardError {
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Capability violation: {0}")]
    Capability(#[from] CapabilityViolation),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    #[error("Rule error: {0}")]
    Rule(#[from] RuleError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Errors from the text-oracle collaborator.
///
/// Any of these reaching the Manager aborts the whole session; they are
/// reported to the caller as retryable.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Oracle timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed reply: {0}")]
    Malformed(String),

    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
}

impl OracleError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            OracleError::Http(_) | OracleError::Timeout(_) | OracleError::Unavailable(_) => true,
            OracleError::Api { status, .. } => *status == 429 || *status >= 500,
            OracleError::Deserialize(_) | OracleError::Configuration(_) | OracleError::Malformed(_) => false,
        }
    }
}

/// Errors from building the tool registry or agent roster.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Agent '{0}' is already registered")]
    DuplicateAgent(String),

    #[error("Agent '{agent_id}' declares unknown tool '{tool_name}'")]
    UnknownTool { agent_id: String, tool_name: String },
}

/// A tool call whose arguments do not satisfy the declared schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Tool '{0}' is not registered")]
    UnknownTool(String),

    #[error("Arguments for '{tool}' must be an object")]
    NotAnObject { tool: String },

    #[error("Missing required field '{field}' for '{tool}'")]
    MissingField { tool: String, field: String },

    #[error("Unknown field '{field}' for '{tool}'")]
    UnknownField { tool: String, field: String },

    #[error("Field '{field}' for '{tool}' expected {expected}, got {found}")]
    TypeMismatch {
        tool: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("Field '{field}' for '{tool}' must be one of {allowed}")]
    NotAllowed {
        tool: String,
        field: String,
        allowed: String,
    },
}

/// An agent proposed a tool outside its declared capability set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Agent '{agent_id}' may not call tool '{tool_name}'")]
pub struct CapabilityViolation {
    pub agent_id: String,
    pub tool_name: String,
}

/// Errors raised while executing a domain tool.
///
/// These never escape an agent turn; they are folded into an error
/// `ToolResult`.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Domain error: {0}")]
    Domain(#[source] anyhow::Error),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Executor panicked")]
    Panicked,

    #[error("Tool '{0}' is not registered")]
    NotFound(String),
}

/// Illegal operations on a conversation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversationError {
    #[error("Conversation is terminal ({0})")]
    Terminal(ConversationState),

    #[error("Cannot {action} while {from}")]
    InvalidTransition {
        from: ConversationState,
        action: &'static str,
    },

    #[error("Round budget of {max_rounds} exhausted")]
    RoundsExhausted { max_rounds: u32 },

    #[error("'{speaker}' does not hold the current turn")]
    NotSpeaker { speaker: String },

    #[error("No unresolved call to '{tool}' from '{issued_by}'")]
    UnmatchedResult { tool: String, issued_by: String },
}

/// Errors from the configuration-rule store.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Rule directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Empty rule file: {0}")]
    Empty(PathBuf),

    #[error("Rule not found: {0}")]
    NotFound(String),

    #[error("Rule '{key}' has unexpected shape: {reason}")]
    Shape { key: String, reason: String },

    #[error("Validation failed for '{name}': {reason}")]
    Invalid { name: String, reason: String },
}

/// Errors from loading orchestrator configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML file at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors from the session entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Archive error: {0}")]
    Archive(String),
}
