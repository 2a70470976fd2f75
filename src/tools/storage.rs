// ABOUTME: Blob storage tools over a BlobInventory - list containers and blobs,
// ABOUTME: report usage, and clean up old artifacts by retention policy.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use glob::Pattern;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::sync::RwLock;

use crate::rules::RuleStore;
use crate::tool::{ParamKind, Tool, ToolSchema};

const RETENTION_KEY: &str = "storage_cleanup.blob_retention";
const SAFETY_KEY: &str = "storage_cleanup.safety";
const ACCOUNTS_KEY: &str = "storage_cleanup.storage_accounts";

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub name: String,
    pub container: String,
    pub storage_account: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
    pub content_type: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Source of blob facts and the one mutating operation cleanup needs.
#[async_trait]
pub trait BlobInventory: Send + Sync {
    async fn list(&self) -> Result<Vec<Blob>, anyhow::Error>;

    async fn delete(&self, blob: &Blob) -> Result<(), anyhow::Error>;
}

/// Blobs held in memory.
#[derive(Default)]
pub struct StaticBlobStore {
    blobs: RwLock<Vec<Blob>>,
}

impl StaticBlobStore {
    pub fn new(blobs: Vec<Blob>) -> Self {
        Self { blobs: RwLock::new(blobs) }
    }

    /// Build artifacts and VM images in one account, dated relative to now.
    pub fn sample() -> Self {
        let blob = |name: &str, container: &str, mib: u64, age_days: i64, tags: &[(&str, &str)]| Blob {
            name: name.into(),
            container: container.into(),
            storage_account: "devopsartifacts".into(),
            size_bytes: mib * 1024 * 1024,
            last_modified: Utc::now() - Duration::days(age_days),
            content_type: if name.ends_with(".zip") {
                "application/zip".into()
            } else {
                "application/octet-stream".into()
            },
            tags: tags.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        };
        Self::new(vec![
            blob("build-1042.zip", "ci-artifacts", 100, 2, &[]),
            blob("build-1041.zip", "ci-artifacts", 94, 20, &[]),
            blob("build-1040.zip", "ci-artifacts", 98, 45, &[]),
            blob("build-1039.zip", "ci-artifacts", 102, 75, &[("retention", "permanent")]),
            blob("manifest.json", "ci-artifacts", 1, 200, &[]),
            blob("template-26-1-0.vhd", "vm-images", 30720, 10, &[]),
            blob("template-25-2-1.vhd", "vm-images", 30720, 120, &[]),
        ])
    }
}

#[async_trait]
impl BlobInventory for StaticBlobStore {
    async fn list(&self) -> Result<Vec<Blob>, anyhow::Error> {
        Ok(self.blobs.read().await.clone())
    }

    async fn delete(&self, blob: &Blob) -> Result<(), anyhow::Error> {
        let mut blobs = self.blobs.write().await;
        let before = blobs.len();
        blobs.retain(|b| {
            !(b.storage_account == blob.storage_account && b.container == blob.container && b.name == blob.name)
        });
        if blobs.len() == before {
            anyhow::bail!("Blob not found: {}/{}", blob.container, blob.name);
        }
        Ok(())
    }
}

fn retention_policy(rules: &dyn RuleStore, artifact_type: &str) -> anyhow::Result<Map<String, Value>> {
    match rules.get(&format!("{RETENTION_KEY}.{artifact_type}")) {
        Some(Value::Object(policy)) => Ok(policy),
        _ => anyhow::bail!("Unknown artifact type: {artifact_type}"),
    }
}

fn setting<T: DeserializeOwned>(section: &Map<String, Value>, name: &str, default: T) -> T {
    section
        .get(name)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or(default)
}

fn containers_of(policy: &Map<String, Value>) -> Vec<String> {
    setting(policy, "containers", Vec::new())
}

pub struct ListContainersTool {
    inventory: Arc<dyn BlobInventory>,
}

impl ListContainersTool {
    pub fn new(inventory: Arc<dyn BlobInventory>) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl Tool for ListContainersTool {
    fn name(&self) -> &str {
        "list_containers"
    }

    fn description(&self) -> &str {
        "List all containers in a storage account."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().required("account_name", ParamKind::String, "Storage account name")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            account_name: String,
        }
        let params: Params = serde_json::from_value(params)?;

        let containers: BTreeSet<String> = self
            .inventory
            .list()
            .await?
            .into_iter()
            .filter(|b| b.storage_account == params.account_name)
            .map(|b| b.container)
            .collect();

        tracing::info!(account = %params.account_name, count = containers.len(), "listed containers");
        Ok(json!({
            "account_name": params.account_name,
            "count": containers.len(),
            "containers": containers,
        }))
    }
}

pub struct ListBlobsTool {
    inventory: Arc<dyn BlobInventory>,
}

impl ListBlobsTool {
    pub fn new(inventory: Arc<dyn BlobInventory>) -> Self {
        Self { inventory }
    }
}

#[async_trait]
impl Tool for ListBlobsTool {
    fn name(&self) -> &str {
        "list_blobs"
    }

    fn description(&self) -> &str {
        "List blobs in a storage account, optionally filtered by container and name prefix."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .required("account_name", ParamKind::String, "Storage account name")
            .optional("container_name", ParamKind::String, "Container to list (default: all containers)")
            .optional("prefix", ParamKind::String, "Only blobs whose name starts with this")
            .optional("max_results", ParamKind::Integer, "Blobs shown per container (default: 50)")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            account_name: String,
            container_name: Option<String>,
            prefix: Option<String>,
            max_results: Option<i64>,
        }
        let params: Params = serde_json::from_value(params)?;
        let max_results = params.max_results.unwrap_or(50);
        if max_results <= 0 {
            anyhow::bail!("max_results must be positive, got {max_results}");
        }
        let max_results = usize::try_from(max_results)?;

        let mut by_container: BTreeMap<String, Vec<Blob>> = BTreeMap::new();
        if let Some(container) = &params.container_name {
            by_container.entry(container.clone()).or_default();
        }
        for blob in self.inventory.list().await? {
            let wanted = blob.storage_account == params.account_name
                && params.container_name.as_ref().is_none_or(|c| blob.container == *c)
                && params.prefix.as_ref().is_none_or(|p| blob.name.starts_with(p.as_str()));
            if wanted {
                by_container.entry(blob.container.clone()).or_default().push(blob);
            }
        }

        let containers: Vec<Value> = by_container
            .into_iter()
            .map(|(container, blobs)| {
                let total: u64 = blobs.iter().map(|b| b.size_bytes).sum();
                let shown: Vec<Value> = blobs
                    .iter()
                    .take(max_results)
                    .map(|b| {
                        json!({
                            "name": b.name,
                            "size_bytes": b.size_bytes,
                            "last_modified": b.last_modified.to_rfc3339(),
                        })
                    })
                    .collect();
                json!({
                    "container": container,
                    "blob_count": blobs.len(),
                    "total_size_bytes": total,
                    "truncated": blobs.len() > max_results,
                    "blobs": shown,
                })
            })
            .collect();

        Ok(json!({
            "account_name": params.account_name,
            "container_count": containers.len(),
            "containers": containers,
        }))
    }
}

pub struct CleanupOldBlobsTool {
    rules: Arc<dyn RuleStore>,
    inventory: Arc<dyn BlobInventory>,
}

impl CleanupOldBlobsTool {
    pub fn new(rules: Arc<dyn RuleStore>, inventory: Arc<dyn BlobInventory>) -> Self {
        Self { rules, inventory }
    }
}

#[async_trait]
impl Tool for CleanupOldBlobsTool {
    fn name(&self) -> &str {
        "cleanup_old_blobs"
    }

    fn description(&self) -> &str {
        "Delete old blobs of an artifact type per its retention policy. Use dry_run=true to only report."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
            .optional("artifact_type", ParamKind::String, "Retention policy key (default: ci_artifacts)")
            .optional("storage_account", ParamKind::String, "Only clean blobs in this account")
            .optional("dry_run", ParamKind::Boolean, "Only report what would be deleted")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            artifact_type: Option<String>,
            storage_account: Option<String>,
            dry_run: Option<bool>,
        }
        let params: Params = serde_json::from_value(params)?;
        let artifact_type = params.artifact_type.unwrap_or_else(|| "ci_artifacts".to_string());

        let rules = self.rules.as_ref();
        let policy = retention_policy(rules, &artifact_type)?;
        let keep: usize = setting(&policy, "keep_latest_count", 5);
        let age_days: i64 = setting(&policy, "age_threshold_days", 90);
        let pattern_text: String = setting(&policy, "pattern", "*".to_string());
        let pattern = Pattern::new(&pattern_text)
            .map_err(|e| anyhow::anyhow!("Invalid blob pattern '{pattern_text}': {e}"))?;
        let containers = containers_of(&policy);
        if containers.is_empty() {
            anyhow::bail!("No containers configured for artifact type: {artifact_type}");
        }

        let safety = match rules.get(SAFETY_KEY) {
            Some(Value::Object(safety)) => safety,
            _ => Map::new(),
        };
        let exclude_tags: Vec<String> = setting(&safety, "exclude_tags", Vec::new());
        let min_versions: usize = setting(&safety, "minimum_versions_to_keep", 2);
        let max_batch: usize = setting(&safety, "max_delete_batch_size", 100);
        let require_confirmation: bool = setting(&safety, "require_confirmation", true);
        let dry_run = params.dry_run.unwrap_or_else(|| setting(&safety, "dry_run", false));
        let cutoff = super::days_ago(age_days)?;

        let all = self.inventory.list().await?;
        let mut total_blobs = 0;
        let mut doomed: Vec<&Blob> = Vec::new();
        for container in &containers {
            let matching: Vec<&Blob> = all
                .iter()
                .filter(|b| b.container == *container)
                .filter(|b| params.storage_account.as_ref().is_none_or(|a| b.storage_account == *a))
                .filter(|b| pattern.matches(&b.name))
                .collect();
            total_blobs += matching.len();

            let mut candidates: Vec<&Blob> = matching
                .into_iter()
                .filter(|b| !b.tags.values().any(|v| exclude_tags.contains(v)))
                .collect();
            candidates.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));

            let planned: Vec<&Blob> = candidates
                .into_iter()
                .skip(keep.max(min_versions))
                .filter(|b| b.last_modified < cutoff)
                .take(max_batch)
                .collect();
            if planned.len() == max_batch {
                tracing::warn!(container = %container, max_batch, "blob cleanup batch limit reached");
            }
            doomed.extend(planned);
        }

        tracing::info!(
            artifact_type = %artifact_type,
            containers = containers.len(),
            to_delete = doomed.len(),
            dry_run,
            "blob cleanup planned"
        );

        let entry = |blob: &Blob, action: &str| {
            json!({
                "name": blob.name,
                "container": blob.container,
                "size_mb": blob.size_bytes as f64 / MIB,
                "last_modified": blob.last_modified.to_rfc3339(),
                "action": action,
            })
        };

        let mut result = json!({
            "success": true,
            "dry_run": dry_run,
            "artifact_type": artifact_type,
            "containers_processed": containers.len(),
            "total_blobs": total_blobs,
        });

        let mut removed = Vec::new();
        let mut freed = 0u64;
        if dry_run {
            for &blob in &doomed {
                freed += blob.size_bytes;
                removed.push(entry(blob, "would_delete"));
            }
        } else if require_confirmation && !doomed.is_empty() {
            tracing::warn!(artifact_type = %artifact_type, count = doomed.len(), "blob deletion requires confirmation");
            result["requires_confirmation"] = json!(true);
            result["pending_deletions"] = json!(doomed.iter().map(|b| b.name.as_str()).collect::<Vec<_>>());
        } else {
            for &blob in &doomed {
                match self.inventory.delete(blob).await {
                    Ok(()) => {
                        tracing::info!(blob = %blob.name, container = %blob.container, "blob deleted");
                        freed += blob.size_bytes;
                        removed.push(entry(blob, "deleted"));
                    }
                    Err(e) => {
                        tracing::error!(blob = %blob.name, error = %e, "blob deletion failed");
                        removed.push(json!({"name": blob.name, "container": blob.container, "error": e.to_string(), "action": "failed"}));
                    }
                }
            }
        }

        result["blobs_deleted"] = json!(removed.iter().filter(|b| b["action"] != "failed").count());
        result["space_freed_gb"] = json!(freed as f64 / GIB);
        result["deleted_blobs"] = Value::Array(removed);
        Ok(result)
    }
}

pub struct GetStorageUsageTool {
    rules: Arc<dyn RuleStore>,
    inventory: Arc<dyn BlobInventory>,
}

impl GetStorageUsageTool {
    pub fn new(rules: Arc<dyn RuleStore>, inventory: Arc<dyn BlobInventory>) -> Self {
        Self { rules, inventory }
    }
}

#[async_trait]
impl Tool for GetStorageUsageTool {
    fn name(&self) -> &str {
        "get_storage_usage"
    }

    fn description(&self) -> &str {
        "Blob count and size per container covered by the retention policies."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().optional("artifact_type", ParamKind::String, "Limit to one retention policy")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            artifact_type: Option<String>,
        }
        let params: Params = serde_json::from_value(params)?;

        let containers: BTreeSet<String> = match &params.artifact_type {
            Some(artifact_type) => containers_of(&retention_policy(self.rules.as_ref(), artifact_type)?)
                .into_iter()
                .collect(),
            None => match self.rules.get(RETENTION_KEY) {
                Some(Value::Object(policies)) => policies
                    .values()
                    .filter_map(Value::as_object)
                    .flat_map(containers_of)
                    .collect(),
                _ => BTreeSet::new(),
            },
        };

        let blobs = self.inventory.list().await?;
        let mut total_blobs = 0;
        let mut total_bytes = 0u64;
        let stats: Vec<Value> = containers
            .iter()
            .map(|container| {
                let (count, bytes) = blobs
                    .iter()
                    .filter(|b| b.container == *container)
                    .fold((0usize, 0u64), |(n, size), b| (n + 1, size + b.size_bytes));
                total_blobs += count;
                total_bytes += bytes;
                json!({"container": container, "blob_count": count, "size_gb": bytes as f64 / GIB})
            })
            .collect();

        Ok(json!({
            "total_containers": containers.len(),
            "total_blobs": total_blobs,
            "total_size_gb": total_bytes as f64 / GIB,
            "container_stats": stats,
        }))
    }
}

pub struct GetRetentionPoliciesTool {
    rules: Arc<dyn RuleStore>,
}

impl GetRetentionPoliciesTool {
    pub fn new(rules: Arc<dyn RuleStore>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl Tool for GetRetentionPoliciesTool {
    fn name(&self) -> &str {
        "get_retention_policies"
    }

    fn description(&self) -> &str {
        "The configured blob retention policies and storage accounts."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new()
    }

    async fn execute(&self, _params: Value) -> Result<Value, anyhow::Error> {
        Ok(json!({
            "policies": self.rules.get(RETENTION_KEY).unwrap_or_else(|| json!({})),
            "storage_accounts": self.rules.get(ACCOUNTS_KEY).unwrap_or_else(|| json!([])),
        }))
    }
}
