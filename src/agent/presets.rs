// ABOUTME: Preset agent configurations for the built-in domains: cloud VMs (azure_agent),
// ABOUTME: build pipelines (build_agent), local files (file_agent), blob storage (storage_agent).

use std::sync::Arc;

use super::{AgentDescriptor, AgentRoster, CapabilityAgent};
use crate::error::RegistryError;
use crate::oracle::Oracle;
use crate::tool::ToolRegistry;

/// Pre-configured agent template.
#[derive(Debug, Clone)]
pub struct Preset {
    /// Agent id for agents built from this preset.
    pub name: &'static str,

    pub domain_label: &'static str,

    /// Routing keywords for speaker selection.
    pub keywords: &'static [&'static str],

    /// The tool subset this agent wraps.
    pub tools: &'static [&'static str],

    pub system_prompt: &'static str,
}

impl Preset {
    pub fn descriptor(&self) -> AgentDescriptor {
        AgentDescriptor::new(self.name, self.domain_label)
            .tools(self.tools.iter().copied())
            .keywords(self.keywords.iter().copied())
            .system_prompt(self.system_prompt)
    }

    /// Build a capability agent over `registry`.
    pub fn agent(&self, oracle: Arc<dyn Oracle>, registry: Arc<ToolRegistry>) -> CapabilityAgent {
        CapabilityAgent::new(self.descriptor(), oracle, registry)
    }
}

pub static AZURE_AGENT: Preset = Preset {
    name: "azure_agent",
    domain_label: "cloud resources",
    keywords: &[
        "vm", "vms", "virtual", "machine", "machines", "resource", "resources", "azure", "cleanup", "template",
        "templates", "compliance", "naming",
    ],
    tools: &["list_vms", "check_vm_compliance", "cleanup_old_vms"],
    system_prompt: r#"You are the Azure Resource Agent. You manage virtual machines.

Guidelines:
- Use list_vms to find VMs for a naming pattern key such as ci_templates
- Use check_vm_compliance to test a VM name against every naming pattern
- Use cleanup_old_vms with dry_run=true unless the operator explicitly asked to delete
- Report counts and names plainly
- When your part is done, reply with your finding followed by TERMINATE"#,
};

pub static BUILD_AGENT: Preset = Preset {
    name: "build_agent",
    domain_label: "build pipelines",
    keywords: &[
        "build", "builds", "pipeline", "pipelines", "failure", "failures", "failed", "failing", "deployment",
        "ci", "devops", "metrics",
    ],
    tools: &["query_pipeline_status", "get_build_failures", "analyze_build_failures", "get_build_metrics"],
    system_prompt: r#"You are the Build Monitoring Agent. You inspect CI pipelines.

Guidelines:
- Use query_pipeline_status for the state of monitored pipelines
- Use get_build_failures and analyze_build_failures to explain recent breakage
- Use get_build_metrics for success rates and durations
- Quote failure categories and suggested actions from the tool output
- When your part is done, reply with your finding followed by TERMINATE"#,
};

pub static FILE_AGENT: Preset = Preset {
    name: "file_agent",
    domain_label: "file operations",
    keywords: &[
        "file", "files", "directory", "directories", "folder", "read", "write", "delete", "log", "logs", "save",
    ],
    tools: &["list_files", "read_file", "write_file", "delete_file"],
    system_prompt: r#"You are the File System Agent. You work inside the operator's base directory.

Safety rules:
- Never delete a file unless the operator explicitly confirmed it
- Never reach outside the base directory
- Prefer reading before writing

When your part is done, reply with your finding followed by TERMINATE"#,
};

pub static STORAGE_AGENT: Preset = Preset {
    name: "storage_agent",
    domain_label: "blob storage",
    keywords: &[
        "storage", "blob", "blobs", "container", "containers", "artifact", "artifacts", "retention", "account",
        "accounts", "usage",
    ],
    tools: &["list_containers", "list_blobs", "cleanup_old_blobs", "get_storage_usage", "get_retention_policies"],
    system_prompt: r#"You are the Storage Cleanup Agent. You manage blob storage artifacts.

Guidelines:
- Use get_retention_policies before cleaning so you know what each artifact type keeps
- Use get_storage_usage and list_blobs to report what is stored
- Use cleanup_old_blobs with dry_run=true unless the operator explicitly asked to delete
- Report blob counts and space in GB
- When your part is done, reply with your finding followed by TERMINATE"#,
};

/// All built-in presets, in routing-priority order.
pub static PRESETS: [&Preset; 4] = [&AZURE_AGENT, &BUILD_AGENT, &FILE_AGENT, &STORAGE_AGENT];

/// Roster of every built-in agent over one shared registry.
pub fn standard_roster(oracle: Arc<dyn Oracle>, registry: Arc<ToolRegistry>) -> Result<AgentRoster, RegistryError> {
    PRESETS.iter().try_fold(AgentRoster::new(), |roster, preset| {
        roster.with(preset.agent(Arc::clone(&oracle), Arc::clone(&registry)))
    })
}
