// ABOUTME: Task status and the progress snapshot a running session publishes.
// ABOUTME: Snapshots are what `poll` returns, live or archived.

use serde::Serialize;

use crate::conversation::ConversationState;
use crate::orchestrator::{Failure, FinalResult};

/// Lifecycle of a task session.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    /// The round budget ran out; the result is partial.
    TimedOut,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }

    /// Map a finished run onto a session status.
    pub fn from_outcome(outcome: &Result<FinalResult, Failure>) -> Self {
        match outcome {
            Ok(result) if result.state == ConversationState::RoundExhausted => TaskStatus::TimedOut,
            Ok(_) => TaskStatus::Completed,
            Err(_) => TaskStatus::Failed,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub task_id: String,
    pub status: TaskStatus,
    pub state: ConversationState,
    pub round: u32,
    pub max_rounds: u32,
    /// Partial aggregation while running, the final answer once done.
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl Snapshot {
    pub fn starting(task_id: impl Into<String>, max_rounds: u32) -> Self {
        Self {
            task_id: task_id.into(),
            status: TaskStatus::Running,
            state: ConversationState::Open,
            round: 0,
            max_rounds,
            answer: String::new(),
            failure_reason: None,
        }
    }

    /// Final snapshot for a finished run.
    pub fn finished(task_id: &str, max_rounds: u32, outcome: &Result<FinalResult, Failure>) -> Self {
        let status = TaskStatus::from_outcome(outcome);
        match outcome {
            Ok(result) => Self {
                task_id: task_id.to_string(),
                status,
                state: result.state,
                round: result.rounds,
                max_rounds,
                answer: result.answer.clone(),
                failure_reason: None,
            },
            Err(failure) => {
                let partial = failure.partial.as_ref();
                Self {
                    task_id: task_id.to_string(),
                    status,
                    state: partial.map_or(ConversationState::Aborted, |p| p.state),
                    round: partial.map_or(0, |p| p.rounds),
                    max_rounds,
                    answer: partial.map(|p| p.answer.clone()).unwrap_or_default(),
                    failure_reason: Some(failure.reason.clone()),
                }
            }
        }
    }
}
