// ABOUTME: Conversation states and sub-task ledger states.
// ABOUTME: Terminal conversation states are final.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    Open,
    AwaitingAgent,
    AwaitingToolResult,
    Complete,
    RoundExhausted,
    Aborted,
}

impl ConversationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ConversationState::Complete | ConversationState::RoundExhausted | ConversationState::Aborted
        )
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConversationState::Open => "OPEN",
            ConversationState::AwaitingAgent => "AWAITING_AGENT",
            ConversationState::AwaitingToolResult => "AWAITING_TOOL_RESULT",
            ConversationState::Complete => "COMPLETE",
            ConversationState::RoundExhausted => "ROUND_EXHAUSTED",
            ConversationState::Aborted => "ABORTED",
        };
        f.write_str(s)
    }
}

/// Where one agent's piece of the work stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    Active,
    /// The agent delivered a final message.
    Completed,
    /// The agent yielded without a finding.
    Declined,
    /// Tool failures exceeded the budget.
    Failed,
    /// Isolated by the manager after a capability violation or exhausted retries.
    Aborted,
}

impl SubTaskStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, SubTaskStatus::Active)
    }
}
