// ABOUTME: Cloud VM tools over a VmInventory - list by naming pattern, check
// ABOUTME: naming compliance, and rule-driven cleanup of old template VMs.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::rules::{RuleStore, VM_PATTERNS_KEY};
use crate::tool::{ParamKind, Tool, ToolSchema};

const CLEANUP_KEY: &str = "azure_resources.vm_cleanup";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub vm_size: String,
    pub created_date: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Source of VM facts and the one mutating operation cleanup needs.
#[async_trait]
pub trait VmInventory: Send + Sync {
    async fn list(&self) -> Result<Vec<VirtualMachine>, anyhow::Error>;

    async fn delete(&self, vm: &VirtualMachine) -> Result<(), anyhow::Error>;
}

/// Inventory held in memory.
#[derive(Default)]
pub struct StaticInventory {
    vms: RwLock<Vec<VirtualMachine>>,
}

impl StaticInventory {
    pub fn new(vms: Vec<VirtualMachine>) -> Self {
        Self { vms: RwLock::new(vms) }
    }

    /// A small fleet of CI template and production VMs.
    pub fn sample() -> Self {
        let vm = |name: &str, rg: &str, size: &str, created: DateTime<Utc>, status: &str, tags: &[(&str, &str)]| {
            VirtualMachine {
                name: name.into(),
                resource_group: rg.into(),
                location: "eastus".into(),
                vm_size: size.into(),
                created_date: created,
                status: status.into(),
                tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            }
        };
        let at = |y, m, d, h, min, s| Utc.with_ymd_and_hms(y, m, d, h, min, s).single().unwrap_or_default();
        Self::new(vec![
            vm(
                "vhds-ci-wat-template-26-1-0.beta-20260213025457",
                "rg-ci-templates",
                "Standard_D2s_v3",
                at(2026, 2, 13, 2, 54, 57),
                "Running",
                &[],
            ),
            vm(
                "vhds-ci-wat-template-25-2-1.release-20260115103022",
                "rg-ci-templates",
                "Standard_D2s_v3",
                at(2026, 1, 15, 10, 30, 22),
                "Stopped",
                &[],
            ),
            vm(
                "vhds-prod-api-1.2.3",
                "rg-production",
                "Standard_D4s_v3",
                at(2025, 12, 1, 9, 0, 0),
                "Running",
                &[("permanent", "true")],
            ),
        ])
    }
}

#[async_trait]
impl VmInventory for StaticInventory {
    async fn list(&self) -> Result<Vec<VirtualMachine>, anyhow::Error> {
        Ok(self.vms.read().await.clone())
    }

    async fn delete(&self, vm: &VirtualMachine) -> Result<(), anyhow::Error> {
        let mut vms = self.vms.write().await;
        let before = vms.len();
        vms.retain(|v| v.name != vm.name);
        if vms.len() == before {
            anyhow::bail!("VM not found: {}", vm.name);
        }
        Ok(())
    }
}

fn ensure_pattern(rules: &dyn RuleStore, pattern: &str) -> anyhow::Result<()> {
    if rules.get(&format!("{VM_PATTERNS_KEY}.{pattern}")).is_none() {
        anyhow::bail!("Unknown VM pattern type: {pattern}");
    }
    Ok(())
}

fn cleanup_setting<T: DeserializeOwned>(rules: &dyn RuleStore, name: &str, default: T) -> T {
    rules
        .get(&format!("{CLEANUP_KEY}.{name}"))
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or(default)
}

pub struct ListVmsTool {
    rules: Arc<dyn RuleStore>,
    inventory: Arc<dyn VmInventory>,
}

impl ListVmsTool {
    pub fn new(rules: Arc<dyn RuleStore>, inventory: Arc<dyn VmInventory>) -> Self {
        Self { rules, inventory }
    }
}

#[async_trait]
impl Tool for ListVmsTool {
    fn name(&self) -> &str {
        "list_vms"
    }

    fn description(&self) -> &str {
        "List virtual machines whose names match a configured naming pattern."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().required("pattern", ParamKind::String, "Naming pattern key, e.g. ci_templates")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            pattern: String,
        }
        let params: Params = serde_json::from_value(params)?;
        ensure_pattern(self.rules.as_ref(), &params.pattern)?;

        let vms: Vec<Value> = self
            .inventory
            .list()
            .await?
            .into_iter()
            .filter(|vm| self.rules.matches(&vm.name, &params.pattern))
            .map(|vm| {
                json!({
                    "name": vm.name,
                    "resource_group": vm.resource_group,
                    "status": vm.status,
                    "created_date": vm.created_date.to_rfc3339(),
                    "vm_size": vm.vm_size,
                    "tags": vm.tags,
                })
            })
            .collect();

        tracing::info!(pattern = %params.pattern, count = vms.len(), "listed vms");
        Ok(json!({"pattern": params.pattern, "vm_count": vms.len(), "vms": vms}))
    }
}

pub struct CheckVmComplianceTool {
    rules: Arc<dyn RuleStore>,
}

impl CheckVmComplianceTool {
    pub fn new(rules: Arc<dyn RuleStore>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl Tool for CheckVmComplianceTool {
    fn name(&self) -> &str {
        "check_vm_compliance"
    }

    fn description(&self) -> &str {
        "Check a VM name against every configured naming pattern."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().required("vm_name", ParamKind::String, "VM name to check")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            vm_name: String,
        }
        let params: Params = serde_json::from_value(params)?;

        let patterns = self.rules.get(VM_PATTERNS_KEY).unwrap_or_default();
        let matching: Vec<&String> = patterns
            .as_object()
            .map(|m| m.keys().filter(|p| self.rules.matches(&params.vm_name, p)).collect())
            .unwrap_or_default();

        Ok(json!({
            "vm_name": params.vm_name,
            "compliant": !matching.is_empty(),
            "matching_patterns": matching,
        }))
    }
}

pub struct CleanupOldVmsTool {
    rules: Arc<dyn RuleStore>,
    inventory: Arc<dyn VmInventory>,
}

impl CleanupOldVmsTool {
    pub fn new(rules: Arc<dyn RuleStore>, inventory: Arc<dyn VmInventory>) -> Self {
        Self { rules, inventory }
    }
}

#[async_trait]
impl Tool for CleanupOldVmsTool {
    fn name(&self) -> &str {
        "cleanup_old_vms"
    }

    fn description(&self) -> &str {
        "Delete old VMs of a naming pattern, keeping the newest ones. Use dry_run=true to only report."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .optional("pattern", ParamKind::String, "Naming pattern key (default: ci_templates)")
            .optional("dry_run", ParamKind::Boolean, "Only report what would be deleted")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            pattern: Option<String>,
            dry_run: Option<bool>,
        }
        let params: Params = serde_json::from_value(params)?;
        let pattern = params.pattern.unwrap_or_else(|| "ci_templates".to_string());
        ensure_pattern(self.rules.as_ref(), &pattern)?;

        let rules = self.rules.as_ref();
        let keep: usize = cleanup_setting(rules, "keep_latest_count", 5);
        let age_days: i64 = cleanup_setting(rules, "age_threshold_days", 30);
        let exclude_tags: Vec<String> = cleanup_setting(rules, "exclude_tags", Vec::new());
        let require_confirmation: bool = cleanup_setting(rules, "require_confirmation", true);
        let dry_run = params
            .dry_run
            .unwrap_or_else(|| cleanup_setting(rules, "dry_run", false));

        let all = self.inventory.list().await?;
        let matching: Vec<&VirtualMachine> = all.iter().filter(|vm| rules.matches(&vm.name, &pattern)).collect();
        let mut candidates: Vec<&VirtualMachine> = matching
            .iter()
            .copied()
            .filter(|vm| !vm.tags.values().any(|v| exclude_tags.contains(v)))
            .collect();
        candidates.sort_by(|a, b| b.created_date.cmp(&a.created_date));

        let cutoff = super::days_ago(age_days)?;
        let doomed: Vec<&VirtualMachine> = candidates
            .into_iter()
            .skip(keep)
            .filter(|vm| vm.created_date < cutoff)
            .collect();

        tracing::info!(
            pattern = %pattern,
            matching = matching.len(),
            to_delete = doomed.len(),
            dry_run,
            "vm cleanup planned"
        );

        let mut result = json!({
            "success": true,
            "dry_run": dry_run,
            "pattern_type": pattern,
            "total_vms": all.len(),
            "matching_vms": matching.len(),
            "vms_to_delete": doomed.len(),
            "deleted_vms": [],
            "kept_vms": keep,
            "age_threshold_days": age_days,
        });

        let entry = |vm: &VirtualMachine, action: &str| {
            json!({
                "name": vm.name,
                "resource_group": vm.resource_group,
                "created_date": vm.created_date.to_rfc3339(),
                "action": action,
            })
        };

        let mut deleted = Vec::new();
        if dry_run {
            deleted.extend(doomed.iter().map(|&vm| entry(vm, "would_delete")));
        } else if require_confirmation && !doomed.is_empty() {
            tracing::warn!(pattern = %pattern, count = doomed.len(), "vm deletion requires confirmation");
            result["requires_confirmation"] = json!(true);
            result["pending_deletions"] = json!(doomed.iter().map(|vm| vm.name.as_str()).collect::<Vec<_>>());
        } else {
            for &vm in &doomed {
                match self.inventory.delete(vm).await {
                    Ok(()) => {
                        tracing::info!(vm = %vm.name, "vm deleted");
                        deleted.push(entry(vm, "deleted"));
                    }
                    Err(e) => {
                        tracing::error!(vm = %vm.name, error = %e, "vm deletion failed");
                        deleted.push(json!({"name": vm.name, "error": e.to_string(), "action": "failed"}));
                    }
                }
            }
        }
        result["deleted_vms"] = Value::Array(deleted);
        Ok(result)
    }
}
