// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use switchboard::prelude::*;` to get started quickly.

pub use crate::agent::{
    AZURE_AGENT, AgentDescriptor, AgentRoster, BUILD_AGENT, CapabilityAgent, FILE_AGENT, PRESETS, Preset, Proposal,
    STORAGE_AGENT, standard_roster,
};
pub use crate::config::OrchestratorConfig;
pub use crate::conversation::{
    Content, Conversation, ConversationState, Message, Role, SubTask, SubTaskStatus, ToolCall,
};
pub use crate::error::{
    CapabilityViolation, ConfigError, ConversationError, OracleError, RegistryError, RuleError, SessionError,
    SwitchboardError, ToolError, ValidationError,
};
pub use crate::oracle::{
    AzureOpenAIClient, Oracle, OracleMessage, OracleReply, OracleRequest, OracleRole, RetryingOracle,
    ScriptedOracle, ToolDefinition,
};
pub use crate::orchestrator::{
    CompletionJudge, ExhaustiveJudge, Failure, FinalResult, Finding, FindingSource, KeywordSelector, Manager,
    OracleJudge, Selection, SpeakerSelector,
};
pub use crate::rules::{RuleStore, StaticRuleStore, YamlRuleStore};
pub use crate::session::{ArchiveStore, MemoryArchive, Sessions, Snapshot, TaskSession, TaskStatus};
pub use crate::tool::{FnTool, ParamKind, ParamSpec, Tool, ToolRegistry, ToolResult, ToolSchema, ToolStatus};
pub use crate::tools::{
    Blob, BlobInventory, BuildHistory, DomainContext, FileScope, StaticBlobStore, StaticBuildHistory, StaticInventory,
    VirtualMachine, VmInventory, domain_registry,
};
