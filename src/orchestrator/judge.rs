// ABOUTME: Completion judgment - decides whether the operator's request is
// ABOUTME: satisfied after an agent delivers a final message.

use std::sync::Arc;

use async_trait::async_trait;

use super::aggregate::{aggregate, compose};
use crate::conversation::Conversation;
use crate::error::OracleError;
use crate::oracle::{Oracle, OracleMessage, OracleReply, OracleRequest};

#[async_trait]
pub trait CompletionJudge: Send + Sync {
    /// `Err` means the judge itself is unreachable, which aborts the session.
    async fn satisfied(&self, conversation: &Conversation) -> Result<bool, OracleError>;
}

/// Never satisfied early: the run continues until no eligible agent is left
/// or the round budget runs out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExhaustiveJudge;

#[async_trait]
impl CompletionJudge for ExhaustiveJudge {
    async fn satisfied(&self, _conversation: &Conversation) -> Result<bool, OracleError> {
        Ok(false)
    }
}

const JUDGE_PROMPT: &str = "You review whether an operator's request has been fully answered \
by the findings of specialist agents. Reply with YES if nothing remains to be done, otherwise NO.";

/// Asks the oracle a yes/no question over the request and current findings.
pub struct OracleJudge {
    oracle: Arc<dyn Oracle>,
}

impl OracleJudge {
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self { oracle }
    }
}

#[async_trait]
impl CompletionJudge for OracleJudge {
    async fn satisfied(&self, conversation: &Conversation) -> Result<bool, OracleError> {
        let findings = compose(&aggregate(conversation));
        let question = format!(
            "Request:\n{}\n\nFindings so far:\n{}\n\nIs the request fully answered?",
            conversation.request(),
            findings
        );
        let request = OracleRequest::new()
            .system(JUDGE_PROMPT)
            .message(OracleMessage::user(question))
            .max_tokens(8)
            .temperature(0.0);

        let verdict = match self.oracle.complete(&request).await? {
            OracleReply::Text(text) => text.trim_start().to_ascii_uppercase().starts_with("YES"),
            OracleReply::ToolCall { .. } => false,
        };
        tracing::debug!(task_id = %conversation.task_id(), verdict, "completion judged");
        Ok(verdict)
    }
}
