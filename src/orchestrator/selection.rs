// ABOUTME: Speaker selection - a pure function from the conversation so far and
// ABOUTME: the agent descriptors to the next speaker, batch, or exhaustion.

use std::collections::BTreeSet;

use crate::agent::AgentDescriptor;
use crate::conversation::Conversation;

/// Who acts next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Single(String),
    /// Independent agents that act concurrently within one round.
    Batch(Vec<String>),
    /// No eligible agent is left.
    Exhausted,
}

/// Pluggable speaker-selection policy.
///
/// Implementations must be deterministic: the same conversation and
/// descriptors always yield the same selection.
pub trait SpeakerSelector: Send + Sync {
    fn select(&self, conversation: &Conversation, agents: &[&AgentDescriptor]) -> Selection;
}

/// Ranks agents by keyword and domain overlap with the request.
///
/// An agent is eligible while it has no sub-task yet or its sub-task is still
/// active. Ties go to the earlier-registered agent. When nothing matches on
/// the first selection, the first registered agent is asked.
#[derive(Debug, Clone, Default)]
pub struct KeywordSelector {
    parallel: bool,
}

impl KeywordSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch every untouched matching agent as one batch when more than one matches.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Number of distinct request tokens that hit this agent's vocabulary.
pub fn score(request_tokens: &BTreeSet<String>, agent: &AgentDescriptor) -> usize {
    let mut vocabulary: BTreeSet<String> = agent.keywords.iter().cloned().collect();
    vocabulary.extend(tokens(&agent.domain_label));
    for tool in &agent.tool_names {
        vocabulary.extend(tokens(tool).into_iter().filter(|t| t.len() > 3));
    }
    request_tokens.intersection(&vocabulary).count()
}

impl SpeakerSelector for KeywordSelector {
    fn select(&self, conversation: &Conversation, agents: &[&AgentDescriptor]) -> Selection {
        let request_tokens = tokens(conversation.request());

        let eligible = |agent: &AgentDescriptor| {
            conversation
                .subtask(&agent.agent_id)
                .is_none_or(|s| s.status.is_open())
        };

        let mut ranked: Vec<(usize, usize, &AgentDescriptor)> = agents
            .iter()
            .enumerate()
            .filter(|(_, a)| eligible(a))
            .map(|(i, a)| (score(&request_tokens, a), i, *a))
            .filter(|(s, _, _)| *s > 0)
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        if self.parallel {
            let fresh: Vec<String> = ranked
                .iter()
                .filter(|(_, _, a)| conversation.subtask(&a.agent_id).is_none())
                .map(|(_, _, a)| a.agent_id.clone())
                .collect();
            if fresh.len() > 1 {
                return Selection::Batch(fresh);
            }
        }

        if let Some((_, _, agent)) = ranked.first() {
            return Selection::Single(agent.agent_id.clone());
        }

        if conversation.subtasks().is_empty() {
            if let Some(first) = agents.first() {
                return Selection::Single(first.agent_id.clone());
            }
        }

        Selection::Exhausted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::SubTaskStatus;

    fn roster() -> Vec<AgentDescriptor> {
        vec![
            AgentDescriptor::new("azure_agent", "cloud resources")
                .tools(["list_vms", "cleanup_old_vms"])
                .keywords(["vm", "vms", "azure", "cleanup"]),
            AgentDescriptor::new("build_agent", "build pipelines")
                .tools(["get_build_failures"])
                .keywords(["build", "pipeline", "failure", "failures"]),
            AgentDescriptor::new("file_agent", "file operations")
                .tools(["read_file"])
                .keywords(["file", "files", "log"]),
        ]
    }

    fn select(selector: &KeywordSelector, convo: &Conversation) -> Selection {
        let agents = roster();
        let refs: Vec<&AgentDescriptor> = agents.iter().collect();
        selector.select(convo, &refs)
    }

    #[test]
    fn test_best_keyword_match_wins() {
        let convo = Conversation::new("t", "Show build failures for the main pipeline", 12);
        assert_eq!(select(&KeywordSelector::new(), &convo), Selection::Single("build_agent".into()));
    }

    #[test]
    fn test_tie_broken_by_registration_order() {
        let convo = Conversation::new("t", "vm file", 12);
        assert_eq!(select(&KeywordSelector::new(), &convo), Selection::Single("azure_agent".into()));
    }

    #[test]
    fn test_domain_label_and_tool_names_count() {
        let convo = Conversation::new("t", "anything about pipelines?", 12);
        assert_eq!(select(&KeywordSelector::new(), &convo), Selection::Single("build_agent".into()));
    }

    #[test]
    fn test_fallback_to_first_agent_when_nothing_matches() {
        let convo = Conversation::new("t", "hello there", 12);
        assert_eq!(select(&KeywordSelector::new(), &convo), Selection::Single("azure_agent".into()));
    }

    #[test]
    fn test_closed_subtasks_are_skipped_then_exhausted() {
        let mut convo = Conversation::new("t", "cleanup VMs and show the log file", 12);
        let selector = KeywordSelector::new();

        assert_eq!(select(&selector, &convo), Selection::Single("azure_agent".into()));
        convo.select_speaker("azure_agent").unwrap();
        convo.close_subtask("azure_agent", SubTaskStatus::Completed);
        convo.end_turn().unwrap();

        assert_eq!(select(&selector, &convo), Selection::Single("file_agent".into()));
        convo.select_speaker("file_agent").unwrap();
        convo.close_subtask("file_agent", SubTaskStatus::Failed);
        convo.end_turn().unwrap();

        assert_eq!(select(&selector, &convo), Selection::Exhausted);
    }

    #[test]
    fn test_active_subtask_stays_eligible() {
        let mut convo = Conversation::new("t", "list vms", 12);
        convo.select_speaker("azure_agent").unwrap();
        convo.end_turn().unwrap();
        assert_eq!(select(&KeywordSelector::new(), &convo), Selection::Single("azure_agent".into()));
    }

    #[test]
    fn test_parallel_batches_fresh_matches() {
        let convo = Conversation::new("t", "cleanup VMs and check build failures", 12);
        let selector = KeywordSelector::new().with_parallel(true);
        assert_eq!(
            select(&selector, &convo),
            Selection::Batch(vec!["azure_agent".into(), "build_agent".into()])
        );
    }

    #[test]
    fn test_parallel_single_match_is_single() {
        let convo = Conversation::new("t", "cleanup VMs", 12);
        let selector = KeywordSelector::new().with_parallel(true);
        assert_eq!(select(&selector, &convo), Selection::Single("azure_agent".into()));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let convo = Conversation::new("t", "cleanup VMs and check build failures", 12);
        let selector = KeywordSelector::new();
        let first = select(&selector, &convo);
        for _ in 0..10 {
            assert_eq!(select(&selector, &convo), first);
        }
    }
}
