// ABOUTME: Outcome types of a Manager run - the aggregated final result or a
// ABOUTME: failure carrying whatever partial result exists.

use serde::Serialize;

use super::aggregate::Finding;
use crate::conversation::ConversationState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResult {
    pub task_id: String,
    /// Tagged findings joined into one answer.
    pub answer: String,
    pub findings: Vec<Finding>,
    /// Set when the run did not complete or some sub-task was isolated.
    pub partial: bool,
    pub state: ConversationState,
    pub rounds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("task {task_id} failed: {reason}")]
pub struct Failure {
    pub task_id: String,
    pub reason: String,
    /// Whether resubmitting the same request may succeed.
    pub retryable: bool,
    pub partial: Option<FinalResult>,
}
