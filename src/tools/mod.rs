// ABOUTME: Built-in domain tools for the capability agents.
// ABOUTME: Scoped file I/O, cloud VM and blob cleanup, and build pipeline monitoring.

use std::sync::Arc;

mod builds;
mod delete_file;
mod list_files;
mod read_file;
mod scope;
mod storage;
mod vms;
mod write_file;

pub use builds::{
    AnalyzeBuildFailuresTool, BuildHistory, BuildRecord, GetBuildFailuresTool, GetBuildMetricsTool, Pipeline,
    QueryPipelineStatusTool, StaticBuildHistory,
};
pub use delete_file::DeleteFileTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use scope::FileScope;
pub use storage::{
    Blob, BlobInventory, CleanupOldBlobsTool, GetRetentionPoliciesTool, GetStorageUsageTool, ListBlobsTool,
    ListContainersTool, StaticBlobStore,
};
pub use vms::{CheckVmComplianceTool, CleanupOldVmsTool, ListVmsTool, StaticInventory, VirtualMachine, VmInventory};
pub use write_file::WriteFileTool;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::RegistryError;
use crate::rules::RuleStore;
use crate::tool::ToolRegistry;

/// The instant `days` days before now. Out-of-range day counts are a domain error.
pub(crate) fn days_ago(days: i64) -> anyhow::Result<DateTime<Utc>> {
    let Some(cutoff) = TimeDelta::try_days(days).and_then(|delta| Utc::now().checked_sub_signed(delta)) else {
        anyhow::bail!("{days} days is out of range");
    };
    Ok(cutoff)
}

/// The collaborators the domain tools run against.
#[derive(Clone)]
pub struct DomainContext {
    pub rules: Arc<dyn RuleStore>,
    pub inventory: Arc<dyn VmInventory>,
    pub history: Arc<dyn BuildHistory>,
    pub blobs: Arc<dyn BlobInventory>,
    pub files: FileScope,
}

/// Registry holding every built-in domain tool.
pub fn domain_registry(ctx: &DomainContext) -> Result<ToolRegistry, RegistryError> {
    let rules = || Arc::clone(&ctx.rules);
    ToolRegistry::new()
        .with(ListVmsTool::new(rules(), Arc::clone(&ctx.inventory)))?
        .with(CheckVmComplianceTool::new(rules()))?
        .with(CleanupOldVmsTool::new(rules(), Arc::clone(&ctx.inventory)))?
        .with(QueryPipelineStatusTool::new(rules(), Arc::clone(&ctx.history)))?
        .with(GetBuildFailuresTool::new(rules(), Arc::clone(&ctx.history)))?
        .with(AnalyzeBuildFailuresTool::new(rules(), Arc::clone(&ctx.history)))?
        .with(GetBuildMetricsTool::new(rules(), Arc::clone(&ctx.history)))?
        .with(ListContainersTool::new(Arc::clone(&ctx.blobs)))?
        .with(ListBlobsTool::new(Arc::clone(&ctx.blobs)))?
        .with(CleanupOldBlobsTool::new(rules(), Arc::clone(&ctx.blobs)))?
        .with(GetStorageUsageTool::new(rules(), Arc::clone(&ctx.blobs)))?
        .with(GetRetentionPoliciesTool::new(rules()))?
        .with(ListFilesTool::new(ctx.files.clone()))?
        .with(ReadFileTool::new(ctx.files.clone()))?
        .with(WriteFileTool::new(ctx.files.clone()))?
        .with(DeleteFileTool::new(ctx.files.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::PRESETS;
    use crate::rules::StaticRuleStore;

    #[test]
    fn test_domain_registry_covers_every_preset_tool() {
        let ctx = DomainContext {
            rules: Arc::new(StaticRuleStore::default()),
            inventory: Arc::new(StaticInventory::sample()),
            history: Arc::new(StaticBuildHistory::sample()),
            blobs: Arc::new(StaticBlobStore::sample()),
            files: FileScope::new("."),
        };
        let registry = domain_registry(&ctx).unwrap();

        assert_eq!(registry.count(), 16);
        for preset in PRESETS {
            for tool in preset.tools {
                assert!(registry.contains(tool), "missing {tool}");
            }
        }
    }
}
