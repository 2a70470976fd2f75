// ABOUTME: The Manager - owns one conversation per run, picks speakers, vets and
// ABOUTME: executes tool calls, isolates sub-task failures, and aggregates the answer.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use super::aggregate::{aggregate, compose};
use super::judge::CompletionJudge;
use super::outcome::{Failure, FinalResult};
use super::selection::{KeywordSelector, Selection, SpeakerSelector};
use crate::agent::{AgentRoster, CapabilityAgent, Proposal};
use crate::config::OrchestratorConfig;
use crate::conversation::{BatchEntry, Conversation, ConversationState, SubTaskStatus, ToolCall};
use crate::error::{CapabilityViolation, ConversationError, OracleError, ValidationError};
use crate::session::{Snapshot, TaskStatus};
use crate::tool::ToolResult;

/// Why a run stopped before reaching a terminal result of its own.
#[derive(Debug)]
enum Halt {
    Oracle(OracleError),
    Conversation(ConversationError),
    UnknownAgent(String),
}

impl From<OracleError> for Halt {
    fn from(e: OracleError) -> Self {
        Halt::Oracle(e)
    }
}

impl From<ConversationError> for Halt {
    fn from(e: ConversationError) -> Self {
        Halt::Conversation(e)
    }
}

enum RoundEnd {
    Satisfied,
    Continue,
    Exhausted,
}

enum Rejection {
    Capability(CapabilityViolation),
    Validation(ValidationError),
}

/// Outcome of one agent's single step inside a parallel batch.
enum BatchStep {
    Exchange(ToolCall, ToolResult),
    Finding(String),
    Yield,
    Rejected(CapabilityViolation),
    Invalid(ValidationError),
    Oracle(OracleError),
}

/// Orchestrates capability agents for one request at a time.
///
/// Cheap to clone. Concurrent runs should each get their own cancel token
/// and progress channel through `with_cancel` and `with_progress`.
#[derive(Clone)]
pub struct Manager {
    roster: AgentRoster,
    selector: Option<Arc<dyn SpeakerSelector>>,
    judge: Arc<dyn CompletionJudge>,
    config: OrchestratorConfig,
    cancel: CancellationToken,
    progress: Option<Arc<watch::Sender<Snapshot>>>,
}

impl Manager {
    pub fn new(roster: AgentRoster, judge: Arc<dyn CompletionJudge>) -> Self {
        Self {
            roster,
            selector: None,
            judge,
            config: OrchestratorConfig::default(),
            cancel: CancellationToken::new(),
            progress: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default keyword selector.
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn SpeakerSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Publish a snapshot after every round.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<watch::Sender<Snapshot>>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn roster(&self) -> &AgentRoster {
        &self.roster
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn selector(&self) -> Arc<dyn SpeakerSelector> {
        match &self.selector {
            Some(selector) => Arc::clone(selector),
            None => Arc::new(KeywordSelector::new().with_parallel(self.config.parallel)),
        }
    }

    /// Handle one request end to end.
    pub async fn run(&self, task_id: &str, request: &str) -> Result<FinalResult, Failure> {
        self.run_with_transcript(task_id, request).await.0
    }

    /// Like `run`, also returning the finished conversation.
    pub async fn run_with_transcript(
        &self,
        task_id: &str,
        request: &str,
    ) -> (Result<FinalResult, Failure>, Conversation) {
        let mut conversation = Conversation::new(task_id, request, self.config.max_rounds);
        tracing::info!(task_id, agents = self.roster.len(), max_rounds = self.config.max_rounds, "task started");

        let outcome = self.drive(&mut conversation).await;
        match &outcome {
            Ok(result) => tracing::info!(
                task_id,
                state = %result.state,
                rounds = result.rounds,
                partial = result.partial,
                "task finished"
            ),
            Err(failure) => tracing::warn!(
                task_id,
                reason = %failure.reason,
                retryable = failure.retryable,
                "task failed"
            ),
        }
        (outcome, conversation)
    }

    async fn drive(&self, convo: &mut Conversation) -> Result<FinalResult, Failure> {
        let selector = self.selector();

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(task_id = %convo.task_id(), round = convo.round_count(), "cancel requested");
                self.abort(convo);
                return Err(self.failure(convo, "cancelled", false));
            }

            let selection = selector.select(convo, &self.roster.descriptors());
            let round = match selection {
                Selection::Exhausted => return self.conclude_exhausted(convo),
                Selection::Single(agent_id) => self.single_round(convo, &agent_id).await,
                Selection::Batch(agent_ids) => self.batch_round(convo, &agent_ids).await,
            };

            match round {
                Ok(RoundEnd::Continue) => self.publish(convo),
                Ok(RoundEnd::Satisfied) => return Ok(self.final_result(convo)),
                Ok(RoundEnd::Exhausted) => {
                    tracing::warn!(task_id = %convo.task_id(), max_rounds = convo.max_rounds(), "round budget exhausted");
                    return Ok(self.final_result(convo));
                }
                Err(Halt::Oracle(e)) => {
                    tracing::error!(task_id = %convo.task_id(), error = %e, "oracle failure, aborting session");
                    self.abort(convo);
                    return Err(self.failure(convo, &format!("oracle unavailable: {e}"), true));
                }
                Err(Halt::Conversation(e)) => {
                    tracing::error!(task_id = %convo.task_id(), error = %e, "conversation error, aborting session");
                    self.abort(convo);
                    return Err(self.failure(convo, &e.to_string(), false));
                }
                Err(Halt::UnknownAgent(agent_id)) => {
                    self.abort(convo);
                    return Err(self.failure(convo, &format!("selector chose unknown agent '{agent_id}'"), false));
                }
            }
        }
    }

    fn agent(&self, agent_id: &str) -> Result<Arc<CapabilityAgent>, Halt> {
        self.roster
            .get(agent_id)
            .cloned()
            .ok_or_else(|| Halt::UnknownAgent(agent_id.to_string()))
    }

    async fn single_round(&self, convo: &mut Conversation, agent_id: &str) -> Result<RoundEnd, Halt> {
        let agent = self.agent(agent_id)?;
        match convo.select_speaker(agent_id) {
            Ok(round) => tracing::debug!(task_id = %convo.task_id(), round, agent_id, "speaker selected"),
            Err(ConversationError::RoundsExhausted { .. }) => return Ok(RoundEnd::Exhausted),
            Err(e) => return Err(e.into()),
        }
        self.run_turn(convo, &agent).await
    }

    /// One agent's turn: propose, vet, execute, repeat until it finishes,
    /// yields, is isolated, or runs out of steps.
    async fn run_turn(&self, convo: &mut Conversation, agent: &CapabilityAgent) -> Result<RoundEnd, Halt> {
        let agent_id = agent.agent_id();
        let mut retries = 0u32;
        let mut steps = 0u32;

        loop {
            if steps >= self.config.max_turn_steps {
                tracing::debug!(agent_id, steps, "turn step limit reached");
                convo.end_turn()?;
                return Ok(RoundEnd::Continue);
            }
            steps += 1;

            let proposal = match agent.propose(convo).await {
                Ok(proposal) => proposal,
                Err(OracleError::Timeout(after)) => {
                    self.isolate_timeout(convo, agent_id, after)?;
                    convo.end_turn()?;
                    return Ok(RoundEnd::Continue);
                }
                Err(e) => return Err(e.into()),
            };

            match proposal {
                Proposal::Yield => {
                    convo.close_subtask(agent_id, SubTaskStatus::Declined);
                    convo.end_turn()?;
                    return Ok(RoundEnd::Continue);
                }
                Proposal::Message(text) => {
                    convo.append_agent_text(agent_id, text)?;
                    convo.close_subtask(agent_id, SubTaskStatus::Completed);
                    if self.judge.satisfied(convo).await? {
                        convo.complete()?;
                        return Ok(RoundEnd::Satisfied);
                    }
                    convo.end_turn()?;
                    return Ok(RoundEnd::Continue);
                }
                Proposal::ToolCall(call) => match vet(agent, call) {
                    Err(Rejection::Capability(violation)) => {
                        tracing::warn!(agent_id, tool = %violation.tool_name, "capability violation");
                        convo.note(format!("Rejected: {violation}. Sub-task isolated."))?;
                        convo.close_subtask(agent_id, SubTaskStatus::Aborted);
                        convo.end_turn()?;
                        return Ok(RoundEnd::Continue);
                    }
                    Err(Rejection::Validation(e)) => {
                        retries += 1;
                        tracing::warn!(agent_id, retries, error = %e, "invalid tool call");
                        convo.note(format!("Rejected: {e}"))?;
                        if retries > self.config.max_retries {
                            convo.note(format!("{agent_id} exhausted its corrective retries. Sub-task isolated."))?;
                            convo.close_subtask(agent_id, SubTaskStatus::Aborted);
                            convo.end_turn()?;
                            return Ok(RoundEnd::Continue);
                        }
                    }
                    Ok(call) => {
                        convo.issue_tool_call(call.clone())?;
                        let result = agent.execute_with_timeout(&call, self.config.tool_timeout()).await;
                        let ok = result.is_ok();
                        convo.append_result(agent_id, result)?;

                        if ok {
                            convo.record_tool_success(agent_id);
                        } else if self.count_failure(convo, agent_id)? {
                            convo.end_turn()?;
                            return Ok(RoundEnd::Continue);
                        }

                        if self.cancel.is_cancelled() {
                            convo.end_turn()?;
                            return Ok(RoundEnd::Continue);
                        }
                        convo.resume_speaker(agent_id)?;
                    }
                },
            }
        }
    }

    /// Record a failed tool result. Returns true when the sub-task is now failed.
    fn count_failure(&self, convo: &mut Conversation, agent_id: &str) -> Result<bool, Halt> {
        let failures = convo.record_tool_failure(agent_id);
        if failures < self.config.max_tool_failures {
            return Ok(false);
        }
        tracing::warn!(agent_id, failures, "tool failure budget exhausted");
        convo.note(format!("{agent_id} failed {failures} consecutive tool calls. Sub-task failed."))?;
        convo.close_subtask(agent_id, SubTaskStatus::Failed);
        Ok(true)
    }

    /// A turn whose oracle kept timing out fails that sub-task only.
    fn isolate_timeout(&self, convo: &mut Conversation, agent_id: &str, after: Duration) -> Result<(), Halt> {
        tracing::warn!(task_id = %convo.task_id(), agent_id, ?after, "oracle timed out, isolating sub-task");
        convo.note(timeout_note(agent_id, after))?;
        convo.close_subtask(agent_id, SubTaskStatus::Failed);
        Ok(())
    }

    async fn batch_round(&self, convo: &mut Conversation, agent_ids: &[String]) -> Result<RoundEnd, Halt> {
        let agents = agent_ids
            .iter()
            .map(|id| self.agent(id))
            .collect::<Result<Vec<_>, _>>()?;

        match convo.select_batch(agent_ids) {
            Ok(round) => tracing::debug!(task_id = %convo.task_id(), round, batch = agent_ids.len(), "batch selected"),
            Err(ConversationError::RoundsExhausted { .. }) => return Ok(RoundEnd::Exhausted),
            Err(e) => return Err(e.into()),
        }

        let steps = {
            let view: &Conversation = convo;
            join_all(agents.iter().map(|agent| self.batch_step(view, agent))).await
        };

        let mut entries = Vec::new();
        let mut outcomes = Vec::new();
        for (agent, step) in agents.iter().zip(steps) {
            let agent_id = agent.agent_id().to_string();
            match step {
                BatchStep::Oracle(OracleError::Timeout(after)) => {
                    tracing::warn!(task_id = %convo.task_id(), agent_id = %agent_id, ?after, "oracle timed out in batch");
                    entries.push(BatchEntry::Note(timeout_note(&agent_id, after)));
                    outcomes.push((agent_id, None, Some(SubTaskStatus::Failed)));
                }
                BatchStep::Oracle(e) => return Err(Halt::Oracle(e)),
                BatchStep::Exchange(call, result) => {
                    outcomes.push((agent_id, Some(result.is_ok()), None));
                    entries.push(BatchEntry::Exchange { call, result });
                }
                BatchStep::Finding(text) => {
                    outcomes.push((agent_id.clone(), None, Some(SubTaskStatus::Completed)));
                    entries.push(BatchEntry::Finding { agent_id, text });
                }
                BatchStep::Yield => outcomes.push((agent_id, None, Some(SubTaskStatus::Declined))),
                BatchStep::Rejected(violation) => {
                    entries.push(BatchEntry::Note(format!("Rejected: {violation}. Sub-task isolated.")));
                    outcomes.push((agent_id, None, Some(SubTaskStatus::Aborted)));
                }
                BatchStep::Invalid(e) => {
                    entries.push(BatchEntry::Note(format!("Rejected: {e}")));
                    outcomes.push((agent_id, None, None));
                }
            }
        }

        convo.append_batch(entries)?;

        let mut found = false;
        for (agent_id, tool_ok, status) in outcomes {
            match tool_ok {
                Some(true) => convo.record_tool_success(&agent_id),
                Some(false) => {
                    self.count_failure(convo, &agent_id)?;
                }
                None => {}
            }
            if let Some(status) = status {
                found |= status == SubTaskStatus::Completed;
                convo.close_subtask(&agent_id, status);
            }
        }

        if found && self.judge.satisfied(convo).await? {
            convo.complete()?;
            return Ok(RoundEnd::Satisfied);
        }
        Ok(RoundEnd::Continue)
    }

    async fn batch_step(&self, convo: &Conversation, agent: &CapabilityAgent) -> BatchStep {
        let proposal = match agent.propose(convo).await {
            Ok(p) => p,
            Err(e) => return BatchStep::Oracle(e),
        };
        match proposal {
            Proposal::Yield => BatchStep::Yield,
            Proposal::Message(text) => BatchStep::Finding(text),
            Proposal::ToolCall(call) => match vet(agent, call) {
                Err(Rejection::Capability(v)) => BatchStep::Rejected(v),
                Err(Rejection::Validation(e)) => BatchStep::Invalid(e),
                Ok(call) => {
                    let result = agent.execute_with_timeout(&call, self.config.tool_timeout()).await;
                    BatchStep::Exchange(call, result)
                }
            },
        }
    }

    fn conclude_exhausted(&self, convo: &mut Conversation) -> Result<FinalResult, Failure> {
        if aggregate(convo).is_empty() {
            tracing::warn!(task_id = %convo.task_id(), "no agent produced a result");
            self.abort(convo);
            return Err(self.failure(convo, "no capability agent produced a result", false));
        }
        if let Err(e) = convo.complete() {
            return Err(self.failure(convo, &e.to_string(), false));
        }
        Ok(self.final_result(convo))
    }

    fn abort(&self, convo: &mut Conversation) {
        if let Err(e) = convo.abort() {
            tracing::debug!(task_id = %convo.task_id(), error = %e, "conversation already terminal");
        }
    }

    fn final_result(&self, convo: &Conversation) -> FinalResult {
        let findings = aggregate(convo);
        let isolated = convo
            .subtasks()
            .iter()
            .any(|s| matches!(s.status, SubTaskStatus::Failed | SubTaskStatus::Aborted));
        FinalResult {
            task_id: convo.task_id().to_string(),
            answer: compose(&findings),
            findings,
            partial: convo.state() != ConversationState::Complete || isolated,
            state: convo.state(),
            rounds: convo.round_count(),
        }
    }

    fn failure(&self, convo: &Conversation, reason: &str, retryable: bool) -> Failure {
        Failure {
            task_id: convo.task_id().to_string(),
            reason: reason.to_string(),
            retryable,
            partial: Some(self.final_result(convo)),
        }
    }

    fn publish(&self, convo: &Conversation) {
        if let Some(progress) = &self.progress {
            progress.send_replace(Snapshot {
                task_id: convo.task_id().to_string(),
                status: TaskStatus::Running,
                state: convo.state(),
                round: convo.round_count(),
                max_rounds: convo.max_rounds(),
                answer: compose(&aggregate(convo)),
                failure_reason: None,
            });
        }
    }
}

fn timeout_note(agent_id: &str, after: Duration) -> String {
    format!("{agent_id} got no oracle reply within {after:?}. Sub-task failed.")
}

/// Check a proposed call against the agent's capability set, then its schema.
///
/// On success the returned call carries the coerced arguments.
fn vet(agent: &CapabilityAgent, call: ToolCall) -> Result<ToolCall, Rejection> {
    if !agent.descriptor().allows(&call.tool_name) {
        return Err(Rejection::Capability(CapabilityViolation {
            agent_id: agent.agent_id().to_string(),
            tool_name: call.tool_name,
        }));
    }
    let arguments = agent
        .registry()
        .validate(&call.tool_name, &call.arguments)
        .map_err(Rejection::Validation)?;
    Ok(ToolCall {
        arguments: Value::Object(arguments),
        ..call
    })
}
