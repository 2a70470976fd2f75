// ABOUTME: Result aggregation - each agent's last substantive finding, tagged
// ABOUTME: with its source and ordered by when it was produced.

use std::collections::HashMap;

use serde::Serialize;

use crate::conversation::{Content, Conversation, Role, SubTaskStatus};

/// Where a finding came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingSource {
    /// The agent's own final message.
    Message,
    /// A successful tool result, used when the agent never wrote a message.
    Tool { tool_name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub agent_id: String,
    pub content: String,
    pub sequence_number: u64,
    pub source: FindingSource,
}

/// Collect findings from every sub-task that was not isolated.
///
/// Failed and aborted sub-tasks contribute nothing. For the others, the
/// agent's last text wins over its last successful tool result.
pub fn aggregate(conversation: &Conversation) -> Vec<Finding> {
    let issuer_of: HashMap<u64, &str> = conversation
        .messages()
        .iter()
        .filter_map(|m| m.tool_call().map(|c| (m.sequence_number, c.issued_by.as_str())))
        .collect();

    let mut findings = Vec::new();
    for subtask in conversation.subtasks() {
        if matches!(subtask.status, SubTaskStatus::Failed | SubTaskStatus::Aborted) {
            continue;
        }
        let agent_id = subtask.agent_id.as_str();

        let last_text = conversation
            .messages()
            .iter()
            .rev()
            .find(|m| m.role == Role::Agent && m.speaker_id == agent_id && m.text().is_some());

        let finding = match last_text {
            Some(m) => Some(Finding {
                agent_id: agent_id.to_string(),
                content: m.text().unwrap_or_default().to_string(),
                sequence_number: m.sequence_number,
                source: FindingSource::Message,
            }),
            None => conversation.messages().iter().rev().find_map(|m| {
                let Content::ToolResult(result) = &m.content else {
                    return None;
                };
                let issuer = m.in_reply_to.and_then(|seq| issuer_of.get(&seq).copied());
                (result.is_ok() && issuer == Some(agent_id)).then(|| Finding {
                    agent_id: agent_id.to_string(),
                    content: result.render(),
                    sequence_number: m.sequence_number,
                    source: FindingSource::Tool {
                        tool_name: result.tool_name.clone(),
                    },
                })
            }),
        };
        findings.extend(finding);
    }

    findings.sort_by_key(|f| f.sequence_number);
    findings
}

/// Render findings as one answer, one tagged line per agent.
pub fn compose(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(|f| format!("[{}] {}", f.agent_id, f.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::conversation::ToolCall;
    use crate::tool::ToolResult;

    fn exchange(convo: &mut Conversation, agent: &str, tool: &str, ok: bool) {
        convo.issue_tool_call(ToolCall::new(tool, json!({}), agent)).unwrap();
        let result = if ok {
            ToolResult::ok(tool, json!({"vm_count": 3}), Duration::ZERO)
        } else {
            ToolResult::error(tool, "boom", Duration::ZERO)
        };
        convo.append_result(agent, result).unwrap();
    }

    #[test]
    fn test_findings_in_production_order() {
        let mut convo = Conversation::new("t", "go", 12);
        convo.select_speaker("b").unwrap();
        convo.append_agent_text("b", "first").unwrap();
        convo.end_turn().unwrap();
        convo.select_speaker("a").unwrap();
        convo.append_agent_text("a", "second").unwrap();
        convo.end_turn().unwrap();
        convo.select_speaker("b").unwrap();
        convo.append_agent_text("b", "third").unwrap();

        let findings = aggregate(&convo);
        let order: Vec<_> = findings.iter().map(|f| f.content.as_str()).collect();
        assert_eq!(order, vec!["second", "third"]);
        assert_eq!(compose(&findings), "[a] second\n[b] third");
    }

    #[test]
    fn test_tool_result_used_when_no_message() {
        let mut convo = Conversation::new("t", "go", 12);
        convo.select_speaker("a").unwrap();
        exchange(&mut convo, "a", "list_vms", true);
        convo.resume_speaker("a").unwrap();
        exchange(&mut convo, "a", "list_vms", false);

        let findings = aggregate(&convo);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].content, r#"{"vm_count":3}"#);
        assert_eq!(
            findings[0].source,
            FindingSource::Tool {
                tool_name: "list_vms".into()
            }
        );
    }

    #[test]
    fn test_failed_subtask_excluded() {
        let mut convo = Conversation::new("t", "go", 12);
        convo.select_speaker("a").unwrap();
        exchange(&mut convo, "a", "list_vms", true);
        convo.close_subtask("a", SubTaskStatus::Failed);
        convo.end_turn().unwrap();
        convo.select_speaker("b").unwrap();
        convo.append_agent_text("b", "fine").unwrap();

        let findings = aggregate(&convo);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].agent_id, "b");
    }

    #[test]
    fn test_empty_conversation_has_no_findings() {
        let convo = Conversation::new("t", "go", 12);
        assert!(aggregate(&convo).is_empty());
        assert_eq!(compose(&[]), "");
    }
}
