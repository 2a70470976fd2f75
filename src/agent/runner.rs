// ABOUTME: CapabilityAgent - asks the oracle for the next step of its domain
// ABOUTME: and executes accepted tool calls into exactly one ToolResult.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;

use super::AgentDescriptor;
use crate::conversation::{Content, Conversation, ToolCall};
use crate::error::{OracleError, ToolError};
use crate::oracle::{Oracle, OracleMessage, OracleReply, OracleRequest};
use crate::tool::{ToolRegistry, ToolResult};

/// Marker an agent appends when it has nothing further to add.
const TERMINATE: &str = "TERMINATE";

/// What an agent wants to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    /// Invoke a tool. Not yet checked against the agent's capability set.
    ToolCall(ToolCall),
    /// A free-text finding; the agent considers its sub-task done.
    Message(String),
    /// Nothing further to contribute.
    Yield,
}

impl Proposal {
    /// Interpret an oracle reply on behalf of `agent_id`.
    pub fn from_reply(agent_id: &str, reply: OracleReply) -> Self {
        match reply {
            OracleReply::ToolCall { name, arguments } => Proposal::ToolCall(ToolCall::new(name, arguments, agent_id)),
            OracleReply::Text(text) => {
                let text = text.trim();
                let text = text.strip_suffix(TERMINATE).unwrap_or(text).trim_end();
                if text.is_empty() {
                    Proposal::Yield
                } else {
                    Proposal::Message(text.to_string())
                }
            }
        }
    }
}

/// An agent wrapping one domain's tools.
pub struct CapabilityAgent {
    descriptor: AgentDescriptor,
    oracle: Arc<dyn Oracle>,
    registry: Arc<ToolRegistry>,
    tool_timeout: Duration,
    max_tokens: u32,
}

impl CapabilityAgent {
    pub fn new(descriptor: AgentDescriptor, oracle: Arc<dyn Oracle>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            descriptor,
            oracle,
            registry,
            tool_timeout: Duration::from_secs(30),
            max_tokens: 1024,
        }
    }

    #[must_use]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    pub fn agent_id(&self) -> &str {
        &self.descriptor.agent_id
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Render the conversation from this agent's point of view.
    ///
    /// Its own text and calls become assistant turns; everything else is
    /// user context tagged with the speaker.
    fn context(&self, conversation: &Conversation) -> Vec<OracleMessage> {
        conversation
            .messages()
            .iter()
            .map(|m| {
                let own = m.speaker_id == self.descriptor.agent_id;
                match (&m.content, own) {
                    (Content::Text(text), true) => OracleMessage::assistant(text.clone()),
                    (Content::ToolCall(_), true) => OracleMessage::assistant(m.render()),
                    _ => OracleMessage::user(m.render()),
                }
            })
            .collect()
    }

    /// Ask the oracle for this agent's next step.
    pub async fn propose(&self, conversation: &Conversation) -> Result<Proposal, OracleError> {
        let tools = self
            .registry
            .definitions_for(self.descriptor.tool_names.iter().map(String::as_str));

        let request = OracleRequest::new()
            .system(&self.descriptor.system_prompt)
            .messages(self.context(conversation))
            .tools(tools)
            .max_tokens(self.max_tokens);

        let reply = self.oracle.complete(&request).await?;
        let proposal = Proposal::from_reply(&self.descriptor.agent_id, reply);
        tracing::debug!(agent_id = %self.descriptor.agent_id, ?proposal, "agent proposed");
        Ok(proposal)
    }

    /// Execute with this agent's default timeout.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        self.execute_with_timeout(call, self.tool_timeout).await
    }

    /// Execute an accepted call. Errors, timeouts and panics all become an
    /// error `ToolResult`; nothing propagates.
    pub async fn execute_with_timeout(&self, call: &ToolCall, timeout: Duration) -> ToolResult {
        let started = Instant::now();

        let outcome = match self.registry.resolve(&call.tool_name) {
            None => Err(ToolError::NotFound(call.tool_name.clone())),
            Some(tool) => {
                let run = AssertUnwindSafe(tool.execute(call.arguments.clone())).catch_unwind();
                match tokio::time::timeout(timeout, run).await {
                    Err(_) => Err(ToolError::Timeout(timeout)),
                    Ok(Err(_)) => Err(ToolError::Panicked),
                    Ok(Ok(Err(e))) => Err(ToolError::Domain(e)),
                    Ok(Ok(Ok(payload))) => Ok(payload),
                }
            }
        };

        let elapsed = started.elapsed();
        match outcome {
            Ok(payload) => {
                tracing::info!(agent_id = %self.descriptor.agent_id, tool = %call.tool_name, ms = elapsed.as_millis() as u64, "tool succeeded");
                ToolResult::ok(&call.tool_name, payload, elapsed)
            }
            Err(e) => {
                let detail = match &e {
                    ToolError::Domain(inner) => format!("{inner:#}"),
                    other => other.to_string(),
                };
                tracing::warn!(agent_id = %self.descriptor.agent_id, tool = %call.tool_name, error = %detail, "tool failed");
                ToolResult::error(&call.tool_name, detail, elapsed)
            }
        }
    }
}
