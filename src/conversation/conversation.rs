// ABOUTME: The Conversation state machine - ordered messages for one task,
// ABOUTME: round accounting, pending tool calls, and the sub-task ledger.

use chrono::Utc;
use serde::Serialize;

use super::{Content, ConversationState, Message, Role, SubTaskStatus, ToolCall};
use crate::error::ConversationError;
use crate::tool::ToolResult;

/// Speaker id used for the seeded user request.
pub const USER_SPEAKER: &str = "user";
/// Speaker id used for manager notes.
pub const MANAGER_SPEAKER: &str = "manager";

/// One agent's share of the task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubTask {
    pub agent_id: String,
    pub status: SubTaskStatus,
    /// Consecutive failed tool results.
    pub tool_failures: u32,
    /// Number of rounds in which this agent was selected.
    pub selections: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct PendingCall {
    sequence_number: u64,
    tool_name: String,
    issued_by: String,
}

/// One entry of an atomically appended parallel batch.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchEntry {
    Exchange { call: ToolCall, result: ToolResult },
    Finding { agent_id: String, text: String },
    Note(String),
}

/// Ordered exchange of messages for one task session.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    task_id: String,
    messages: Vec<Message>,
    state: ConversationState,
    round_count: u32,
    max_rounds: u32,
    #[serde(skip)]
    speakers: Vec<String>,
    #[serde(skip)]
    pending: Vec<PendingCall>,
    subtasks: Vec<SubTask>,
}

impl Conversation {
    /// Open a conversation seeded with the user's request.
    pub fn new(task_id: impl Into<String>, request: impl Into<String>, max_rounds: u32) -> Self {
        let mut conversation = Self {
            task_id: task_id.into(),
            messages: Vec::new(),
            state: ConversationState::Open,
            round_count: 0,
            max_rounds,
            speakers: Vec::new(),
            pending: Vec::new(),
            subtasks: Vec::new(),
        };
        conversation.push(USER_SPEAKER, Role::User, Content::Text(request.into()), None);
        conversation
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// The original request text.
    pub fn request(&self) -> &str {
        self.messages.first().and_then(Message::text).unwrap_or_default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn round_count(&self) -> u32 {
        self.round_count
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Agents holding the current turn.
    pub fn speakers(&self) -> &[String] {
        &self.speakers
    }

    pub fn has_pending_calls(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn subtasks(&self) -> &[SubTask] {
        &self.subtasks
    }

    pub fn subtask(&self, agent_id: &str) -> Option<&SubTask> {
        self.subtasks.iter().find(|s| s.agent_id == agent_id)
    }

    /// Give the turn to one agent, consuming a round.
    pub fn select_speaker(&mut self, agent_id: &str) -> Result<u32, ConversationError> {
        self.select_batch(&[agent_id])
    }

    /// Give the turn to a batch of agents that act in parallel, consuming one round.
    ///
    /// When the round budget is already spent the conversation moves to
    /// `RoundExhausted` and `RoundsExhausted` is returned.
    pub fn select_batch<S: AsRef<str>>(&mut self, agent_ids: &[S]) -> Result<u32, ConversationError> {
        self.require(ConversationState::Open, "select a speaker")?;
        if agent_ids.is_empty() {
            return Err(ConversationError::InvalidTransition {
                from: self.state,
                action: "select an empty batch",
            });
        }
        if self.round_count >= self.max_rounds {
            self.state = ConversationState::RoundExhausted;
            self.speakers.clear();
            return Err(ConversationError::RoundsExhausted {
                max_rounds: self.max_rounds,
            });
        }

        self.round_count += 1;
        self.speakers = agent_ids.iter().map(|a| a.as_ref().to_string()).collect();
        for agent_id in agent_ids {
            let agent_id = agent_id.as_ref();
            match self.subtasks.iter_mut().find(|s| s.agent_id == agent_id) {
                Some(subtask) => subtask.selections += 1,
                None => self.subtasks.push(SubTask {
                    agent_id: agent_id.to_string(),
                    status: SubTaskStatus::Active,
                    tool_failures: 0,
                    selections: 1,
                }),
            }
        }
        self.state = ConversationState::AwaitingAgent;
        Ok(self.round_count)
    }

    /// Hand the turn back to the current speaker after a tool result, without a new round.
    pub fn resume_speaker(&mut self, agent_id: &str) -> Result<(), ConversationError> {
        self.require(ConversationState::Open, "resume a speaker")?;
        self.require_speaker(agent_id)?;
        self.state = ConversationState::AwaitingAgent;
        Ok(())
    }

    /// Append a free-text finding from the speaking agent.
    pub fn append_agent_text(&mut self, agent_id: &str, text: impl Into<String>) -> Result<u64, ConversationError> {
        self.require(ConversationState::AwaitingAgent, "append agent text")?;
        self.require_speaker(agent_id)?;
        Ok(self.push(agent_id, Role::Agent, Content::Text(text.into()), None))
    }

    /// Append a validated tool call; the conversation then waits for its result.
    pub fn issue_tool_call(&mut self, call: ToolCall) -> Result<u64, ConversationError> {
        self.require(ConversationState::AwaitingAgent, "issue a tool call")?;
        self.require_speaker(&call.issued_by)?;

        let issued_by = call.issued_by.clone();
        let tool_name = call.tool_name.clone();
        let seq = self.push(&issued_by, Role::Agent, Content::ToolCall(call), None);
        self.pending.push(PendingCall {
            sequence_number: seq,
            tool_name,
            issued_by,
        });
        self.state = ConversationState::AwaitingToolResult;
        Ok(seq)
    }

    /// Append the result of an earlier, unresolved call from `issued_by`.
    pub fn append_result(&mut self, issued_by: &str, result: ToolResult) -> Result<u64, ConversationError> {
        self.require(ConversationState::AwaitingToolResult, "append a tool result")?;

        let index = self
            .pending
            .iter()
            .position(|p| p.issued_by == issued_by && p.tool_name == result.tool_name)
            .ok_or_else(|| ConversationError::UnmatchedResult {
                tool: result.tool_name.clone(),
                issued_by: issued_by.to_string(),
            })?;
        let call = self.pending.remove(index);

        let speaker = result.tool_name.clone();
        let seq = self.push(&speaker, Role::Tool, Content::ToolResult(result), Some(call.sequence_number));
        if self.pending.is_empty() {
            self.state = ConversationState::Open;
        }
        Ok(seq)
    }

    /// Append a parallel batch's calls, results and findings in one step.
    ///
    /// Every entry is checked before anything is appended, so either the whole
    /// batch lands or none of it does.
    pub fn append_batch(&mut self, entries: Vec<BatchEntry>) -> Result<(), ConversationError> {
        self.require(ConversationState::AwaitingAgent, "append a batch")?;
        for entry in &entries {
            match entry {
                BatchEntry::Exchange { call, result } => {
                    self.require_speaker(&call.issued_by)?;
                    if call.tool_name != result.tool_name {
                        return Err(ConversationError::UnmatchedResult {
                            tool: result.tool_name.clone(),
                            issued_by: call.issued_by.clone(),
                        });
                    }
                }
                BatchEntry::Finding { agent_id, .. } => self.require_speaker(agent_id)?,
                BatchEntry::Note(_) => {}
            }
        }

        for entry in entries {
            match entry {
                BatchEntry::Exchange { call, result } => {
                    let issued_by = call.issued_by.clone();
                    let call_seq = self.push(&issued_by, Role::Agent, Content::ToolCall(call), None);
                    let speaker = result.tool_name.clone();
                    self.push(&speaker, Role::Tool, Content::ToolResult(result), Some(call_seq));
                }
                BatchEntry::Finding { agent_id, text } => {
                    self.push(&agent_id, Role::Agent, Content::Text(text), None);
                }
                BatchEntry::Note(text) => {
                    self.push(MANAGER_SPEAKER, Role::Manager, Content::Text(text), None);
                }
            }
        }
        self.state = ConversationState::Open;
        self.speakers.clear();
        Ok(())
    }

    /// Append a manager note (validation errors, isolation notices).
    pub fn note(&mut self, text: impl Into<String>) -> Result<u64, ConversationError> {
        if self.is_terminal() {
            return Err(ConversationError::Terminal(self.state));
        }
        Ok(self.push(MANAGER_SPEAKER, Role::Manager, Content::Text(text.into()), None))
    }

    /// Close the current turn and return to `Open` for the next selection.
    pub fn end_turn(&mut self) -> Result<(), ConversationError> {
        if self.is_terminal() {
            return Err(ConversationError::Terminal(self.state));
        }
        if self.state == ConversationState::AwaitingToolResult {
            return Err(ConversationError::InvalidTransition {
                from: self.state,
                action: "end the turn",
            });
        }
        self.state = ConversationState::Open;
        self.speakers.clear();
        Ok(())
    }

    /// The user's intent is satisfied.
    pub fn complete(&mut self) -> Result<(), ConversationError> {
        if self.is_terminal() {
            return Err(ConversationError::Terminal(self.state));
        }
        if self.state == ConversationState::AwaitingToolResult {
            return Err(ConversationError::InvalidTransition {
                from: self.state,
                action: "complete",
            });
        }
        self.finish(ConversationState::Complete);
        Ok(())
    }

    /// Unrecoverable error or cancellation.
    pub fn abort(&mut self) -> Result<(), ConversationError> {
        if self.is_terminal() {
            return Err(ConversationError::Terminal(self.state));
        }
        self.finish(ConversationState::Aborted);
        Ok(())
    }

    /// Record a sub-task outcome. Only active sub-tasks change.
    pub fn close_subtask(&mut self, agent_id: &str, status: SubTaskStatus) {
        if let Some(subtask) = self.subtasks.iter_mut().find(|s| s.agent_id == agent_id) {
            if subtask.status.is_open() {
                subtask.status = status;
            }
        }
    }

    /// Count a failed tool result and return the consecutive failure count.
    pub fn record_tool_failure(&mut self, agent_id: &str) -> u32 {
        match self.subtasks.iter_mut().find(|s| s.agent_id == agent_id) {
            Some(subtask) => {
                subtask.tool_failures += 1;
                subtask.tool_failures
            }
            None => 0,
        }
    }

    pub fn record_tool_success(&mut self, agent_id: &str) {
        if let Some(subtask) = self.subtasks.iter_mut().find(|s| s.agent_id == agent_id) {
            subtask.tool_failures = 0;
        }
    }

    fn finish(&mut self, state: ConversationState) {
        self.state = state;
        self.speakers.clear();
    }

    fn require(&self, expected: ConversationState, action: &'static str) -> Result<(), ConversationError> {
        if self.is_terminal() {
            return Err(ConversationError::Terminal(self.state));
        }
        if self.state != expected {
            return Err(ConversationError::InvalidTransition {
                from: self.state,
                action,
            });
        }
        Ok(())
    }

    fn require_speaker(&self, agent_id: &str) -> Result<(), ConversationError> {
        if self.speakers.iter().any(|s| s == agent_id) {
            Ok(())
        } else {
            Err(ConversationError::NotSpeaker {
                speaker: agent_id.to_string(),
            })
        }
    }

    fn push(&mut self, speaker: &str, role: Role, content: Content, in_reply_to: Option<u64>) -> u64 {
        let sequence_number = self.messages.len() as u64;
        self.messages.push(Message {
            speaker_id: speaker.to_string(),
            role,
            content,
            timestamp: Utc::now(),
            sequence_number,
            in_reply_to,
        });
        sequence_number
    }
}
