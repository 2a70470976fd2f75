// ABOUTME: Tests for CapabilityAgent - proposal parsing, oracle context, and
// ABOUTME: execution that never propagates errors, panics or timeouts.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use super::*;
use crate::conversation::{Conversation, ToolCall};
use crate::oracle::{OracleReply, OracleRole, ScriptedOracle};
use crate::tool::{FnTool, ParamKind, ToolRegistry, ToolSchema, ToolStatus};

fn registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry
        .register(FnTool::new(
            "count_vms",
            "Counts VMs",
            ToolSchema::new().optional("pattern", ParamKind::String, "pattern key"),
            |_| async { Ok(json!({"vm_count": 3})) },
        ))
        .unwrap();
    registry
        .register(FnTool::new("broken", "Always fails", ToolSchema::new(), |_| async {
            Err(anyhow::anyhow!("inventory offline"))
        }))
        .unwrap();
    registry
        .register(FnTool::new("explodes", "Panics", ToolSchema::new(), |_| async {
            if true {
                panic!("executor bug");
            }
            Ok(Value::Null)
        }))
        .unwrap();
    registry
        .register(FnTool::new("slow", "Sleeps", ToolSchema::new(), |_| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }))
        .unwrap();
    Arc::new(registry)
}

fn agent(oracle: Arc<ScriptedOracle>) -> CapabilityAgent {
    let descriptor = AgentDescriptor::new("azure_agent", "cloud resources")
        .tools(["count_vms", "broken", "explodes", "slow"])
        .system_prompt("You count VMs.");
    CapabilityAgent::new(descriptor, oracle, registry())
}

#[test]
fn test_proposal_from_text() {
    assert_eq!(
        Proposal::from_reply("a", OracleReply::text("3 VMs found")),
        Proposal::Message("3 VMs found".into())
    );
    assert_eq!(
        Proposal::from_reply("a", OracleReply::text("3 VMs found\nTERMINATE")),
        Proposal::Message("3 VMs found".into())
    );
    assert_eq!(Proposal::from_reply("a", OracleReply::text("TERMINATE")), Proposal::Yield);
    assert_eq!(Proposal::from_reply("a", OracleReply::text("   ")), Proposal::Yield);
}

#[test]
fn test_proposal_from_tool_call_carries_issuer() {
    let proposal = Proposal::from_reply("azure_agent", OracleReply::tool_call("count_vms", json!({})));
    assert_eq!(
        proposal,
        Proposal::ToolCall(ToolCall::new("count_vms", json!({}), "azure_agent"))
    );
}

#[tokio::test]
async fn test_propose_sends_context_and_own_tools() {
    let oracle = Arc::new(ScriptedOracle::new([OracleReply::tool_call("count_vms", json!({}))]));
    let agent = agent(oracle.clone());

    let mut convo = Conversation::new("t-1", "how many VMs?", 12);
    convo.select_speaker("azure_agent").unwrap();
    convo.append_agent_text("azure_agent", "checking").unwrap();

    let proposal = agent.propose(&convo).await.unwrap();
    assert!(matches!(proposal, Proposal::ToolCall(ref c) if c.tool_name == "count_vms"));

    let requests = oracle.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.system.as_deref(), Some("You count VMs."));
    assert_eq!(request.messages[0].role, OracleRole::User);
    assert_eq!(request.messages[0].text, "[user] how many VMs?");
    assert_eq!(request.messages[1].role, OracleRole::Assistant);
    assert_eq!(request.messages[1].text, "checking");

    let mut tools: Vec<_> = request.tools.iter().map(|t| t.name.as_str()).collect();
    tools.sort();
    assert_eq!(tools, vec!["broken", "count_vms", "explodes", "slow"]);
}

#[tokio::test]
async fn test_propose_surfaces_oracle_errors() {
    let agent = agent(Arc::new(ScriptedOracle::unreachable()));
    let convo = Conversation::new("t-1", "hi", 12);
    assert!(agent.propose(&convo).await.is_err());
}

#[tokio::test]
async fn test_execute_ok() {
    let agent = agent(Arc::new(ScriptedOracle::unreachable()));
    let result = agent.execute(&ToolCall::new("count_vms", json!({}), "azure_agent")).await;
    assert_eq!(result.status, ToolStatus::Ok);
    assert_eq!(result.payload, Some(json!({"vm_count": 3})));
}

#[tokio::test]
async fn test_execute_domain_error_becomes_error_result() {
    let agent = agent(Arc::new(ScriptedOracle::unreachable()));
    let result = agent.execute(&ToolCall::new("broken", json!({}), "azure_agent")).await;
    assert_eq!(result.status, ToolStatus::Error);
    assert!(result.error_detail.unwrap().contains("inventory offline"));
}

#[tokio::test]
async fn test_execute_panic_becomes_error_result() {
    let agent = agent(Arc::new(ScriptedOracle::unreachable()));
    let result = agent.execute(&ToolCall::new("explodes", json!({}), "azure_agent")).await;
    assert_eq!(result.status, ToolStatus::Error);
    assert!(result.error_detail.unwrap().contains("panicked"));
}

#[tokio::test]
async fn test_execute_timeout_becomes_error_result() {
    let agent = agent(Arc::new(ScriptedOracle::unreachable()));
    let result = agent
        .execute_with_timeout(
            &ToolCall::new("slow", json!({}), "azure_agent"),
            Duration::from_millis(20),
        )
        .await;
    assert_eq!(result.status, ToolStatus::Error);
    assert!(result.error_detail.unwrap().contains("Timed out"));
}

#[tokio::test]
async fn test_execute_unknown_tool() {
    let agent = agent(Arc::new(ScriptedOracle::unreachable()));
    let result = agent.execute(&ToolCall::new("missing", json!({}), "azure_agent")).await;
    assert_eq!(result.status, ToolStatus::Error);
    assert_eq!(result.tool_name, "missing");
}
