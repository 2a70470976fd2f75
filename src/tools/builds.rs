// ABOUTME: Build pipeline tools over a BuildHistory - pipeline status, recent
// ABOUTME: failures with categories, failure analysis, and success-rate metrics.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::rules::RuleStore;
use crate::tool::{ParamKind, Tool, ToolSchema};

const MONITORING_KEY: &str = "build_monitoring";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: u32,
    pub name: String,
    pub project: String,
    pub folder: String,
    pub latest_build_status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub build_id: u64,
    pub pipeline_name: String,
    pub status: String,
    /// `succeeded` or `failed`.
    pub result: String,
    pub start_time: DateTime<Utc>,
    pub duration_minutes: u32,
    pub triggered_by: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[async_trait]
pub trait BuildHistory: Send + Sync {
    async fn pipelines(&self) -> Result<Vec<Pipeline>, anyhow::Error>;

    async fn builds(&self) -> Result<Vec<BuildRecord>, anyhow::Error>;
}

#[derive(Debug, Clone, Default)]
pub struct StaticBuildHistory {
    pipelines: Vec<Pipeline>,
    builds: Vec<BuildRecord>,
}

impl StaticBuildHistory {
    pub fn new(pipelines: Vec<Pipeline>, builds: Vec<BuildRecord>) -> Self {
        Self { pipelines, builds }
    }

    /// Three pipelines and four builds from the last few days.
    pub fn sample() -> Self {
        let pipeline = |id, name: &str, folder: &str, status: &str| Pipeline {
            id,
            name: name.into(),
            project: "MyProject".into(),
            folder: folder.into(),
            latest_build_status: status.into(),
        };
        let now = Utc::now();
        let build = |id, pipeline: &str, result: &str, ago: Duration, minutes, by: &str, error: Option<&str>| {
            BuildRecord {
                build_id: id,
                pipeline_name: pipeline.into(),
                status: "completed".into(),
                result: result.into(),
                start_time: now - ago,
                duration_minutes: minutes,
                triggered_by: by.into(),
                error_message: error.map(str::to_string),
            }
        };
        Self::new(
            vec![
                pipeline(1, "CI-Main", "CI", "succeeded"),
                pipeline(2, "CD-Production", "CD", "succeeded"),
                pipeline(3, "Nightly-Tests", "Tests", "failed"),
            ],
            vec![
                build(101, "CI-Main", "succeeded", Duration::hours(2), 15, "user1@example.com", None),
                build(
                    102,
                    "Nightly-Tests",
                    "failed",
                    Duration::days(1),
                    30,
                    "schedule",
                    Some("OutOfMemoryError: Java heap space"),
                ),
                build(
                    103,
                    "CI-Main",
                    "failed",
                    Duration::days(2),
                    10,
                    "user2@example.com",
                    Some("npm ERR! code ENOTFOUND"),
                ),
                build(104, "CD-Production", "succeeded", Duration::days(3), 45, "user1@example.com", None),
            ],
        )
    }
}

#[async_trait]
impl BuildHistory for StaticBuildHistory {
    async fn pipelines(&self) -> Result<Vec<Pipeline>, anyhow::Error> {
        Ok(self.pipelines.clone())
    }

    async fn builds(&self) -> Result<Vec<BuildRecord>, anyhow::Error> {
        Ok(self.builds.clone())
    }
}

/// Failure patterns used when the rules configure none.
const DEFAULT_FAILURE_PATTERNS: &[(&str, &str, &str)] = &[
    ("OutOfMemory|heap space|Cannot allocate memory", "memory", "Increase agent memory or reduce parallelism"),
    ("ENOTFOUND|ETIMEDOUT|ECONNRESET|Connection (refused|reset)", "network", "Check network connectivity and retry"),
    ("test(s)? failed|AssertionError|assertion failed", "test", "Investigate failing tests"),
    ("could not resolve|dependency|version conflict", "dependency", "Pin or update dependencies"),
    ("docker|image pull|manifest unknown", "docker", "Check container registry and image tags"),
];

struct FailurePattern {
    regex: Regex,
    category: String,
    suggested_action: String,
}

/// Maps build error messages to failure categories.
struct FailureClassifier {
    patterns: Vec<FailurePattern>,
}

impl FailureClassifier {
    fn from_rules(rules: &dyn RuleStore) -> Self {
        #[derive(Deserialize)]
        struct Configured {
            pattern: String,
            category: String,
            #[serde(default)]
            suggested_action: Option<String>,
        }

        let configured: Vec<Configured> = rules
            .get(&format!("{MONITORING_KEY}.build_failure_analysis.failure_patterns"))
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let raw: Vec<(String, String, String)> = if configured.is_empty() {
            DEFAULT_FAILURE_PATTERNS
                .iter()
                .map(|(p, c, a)| (p.to_string(), c.to_string(), a.to_string()))
                .collect()
        } else {
            configured
                .into_iter()
                .map(|c| {
                    let action = c.suggested_action.unwrap_or_else(|| "Investigate this issue".into());
                    (c.pattern, c.category, action)
                })
                .collect()
        };

        let patterns = raw
            .into_iter()
            .filter_map(|(pattern, category, suggested_action)| {
                match Regex::new(&format!("(?i){pattern}")) {
                    Ok(regex) => Some(FailurePattern {
                        regex,
                        category,
                        suggested_action,
                    }),
                    Err(e) => {
                        tracing::warn!(pattern = %pattern, error = %e, "skipping invalid failure pattern");
                        None
                    }
                }
            })
            .collect();
        Self { patterns }
    }

    fn categorize(&self, error_message: Option<&str>) -> &str {
        let Some(message) = error_message.filter(|m| !m.is_empty()) else {
            return "unknown";
        };
        self.patterns
            .iter()
            .find(|p| p.regex.is_match(message))
            .map_or("unknown", |p| p.category.as_str())
    }

    fn suggested_action(&self, category: &str) -> Option<&str> {
        self.patterns
            .iter()
            .find(|p| p.category == category)
            .map(|p| p.suggested_action.as_str())
    }
}

#[derive(Deserialize)]
struct DaysParams {
    days: Option<i64>,
}

fn days_schema() -> ToolSchema {
    ToolSchema::new().optional("days", ParamKind::Integer, "Look-back window in days (default: 7)")
}

fn parse_days(params: Value) -> anyhow::Result<i64> {
    let params: DaysParams = serde_json::from_value(params)?;
    let days = params.days.unwrap_or(7);
    if days <= 0 {
        anyhow::bail!("days must be positive, got {days}");
    }
    Ok(days)
}

async fn recent_builds(history: &dyn BuildHistory, days: i64) -> anyhow::Result<Vec<BuildRecord>> {
    let cutoff = super::days_ago(days)?;
    Ok(history
        .builds()
        .await?
        .into_iter()
        .filter(|b| b.start_time > cutoff)
        .collect())
}

async fn failures(rules: &dyn RuleStore, history: &dyn BuildHistory, days: i64) -> anyhow::Result<Vec<Value>> {
    let classifier = FailureClassifier::from_rules(rules);
    Ok(recent_builds(history, days)
        .await?
        .into_iter()
        .filter(|b| b.result == "failed")
        .map(|b| {
            json!({
                "build_id": b.build_id,
                "pipeline": b.pipeline_name,
                "status": b.status,
                "result": b.result,
                "start_time": b.start_time.to_rfc3339(),
                "duration_minutes": b.duration_minutes,
                "failure_category": classifier.categorize(b.error_message.as_deref()),
                "error_message": b.error_message,
                "triggered_by": b.triggered_by,
            })
        })
        .collect())
}

/// Count occurrences, most frequent first, ties in first-seen order, at most five.
fn top_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(v, _)| v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(5);
    counts
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut start = true;
    for c in s.chars() {
        if c.is_alphanumeric() {
            if start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            start = false;
        } else {
            out.push(c);
            start = true;
        }
    }
    out
}

pub struct QueryPipelineStatusTool {
    rules: Arc<dyn RuleStore>,
    history: Arc<dyn BuildHistory>,
}

impl QueryPipelineStatusTool {
    pub fn new(rules: Arc<dyn RuleStore>, history: Arc<dyn BuildHistory>) -> Self {
        Self { rules, history }
    }
}

#[async_trait]
impl Tool for QueryPipelineStatusTool {
    fn name(&self) -> &str {
        "query_pipeline_status"
    }

    fn description(&self) -> &str {
        "Latest status of a pipeline, or of every monitored pipeline when no name is given."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new().optional("pipeline_name", ParamKind::String, "Pipeline name")
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        #[derive(Deserialize)]
        struct Params {
            pipeline_name: Option<String>,
        }
        let params: Params = serde_json::from_value(params)?;
        let all = self.history.pipelines().await?;

        let monitored: Vec<String> = self
            .rules
            .get(&format!("{MONITORING_KEY}.pipeline_monitoring.monitored_pipelines"))
            .and_then(|v| v.as_array().cloned())
            .unwrap_or_default()
            .iter()
            .filter_map(|p| p.get("name").and_then(Value::as_str).map(str::to_string))
            .collect();

        let selected: Vec<&Pipeline> = match &params.pipeline_name {
            Some(name) => all.iter().filter(|p| &p.name == name).collect(),
            None if !monitored.is_empty() => all.iter().filter(|p| monitored.contains(&p.name)).collect(),
            None => all.iter().collect(),
        };

        let pipelines: Vec<Value> = selected
            .iter()
            .map(|p| {
                json!({
                    "pipeline_id": p.id,
                    "name": p.name,
                    "project": p.project,
                    "latest_status": p.latest_build_status,
                    "folder": p.folder,
                })
            })
            .collect();
        tracing::info!(pipeline = ?params.pipeline_name, count = pipelines.len(), "queried pipelines");
        Ok(json!({"count": pipelines.len(), "pipelines": pipelines}))
    }
}

pub struct GetBuildFailuresTool {
    rules: Arc<dyn RuleStore>,
    history: Arc<dyn BuildHistory>,
}

impl GetBuildFailuresTool {
    pub fn new(rules: Arc<dyn RuleStore>, history: Arc<dyn BuildHistory>) -> Self {
        Self { rules, history }
    }
}

#[async_trait]
impl Tool for GetBuildFailuresTool {
    fn name(&self) -> &str {
        "get_build_failures"
    }

    fn description(&self) -> &str {
        "Failed builds within the last N days, each with a failure category."
    }

    fn schema(&self) -> ToolSchema {
        days_schema()
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        let days = parse_days(params)?;
        let failures = failures(self.rules.as_ref(), self.history.as_ref(), days).await?;
        tracing::info!(days, count = failures.len(), "collected build failures");
        Ok(json!({"days": days, "count": failures.len(), "failures": failures}))
    }
}

pub struct AnalyzeBuildFailuresTool {
    rules: Arc<dyn RuleStore>,
    history: Arc<dyn BuildHistory>,
}

impl AnalyzeBuildFailuresTool {
    pub fn new(rules: Arc<dyn RuleStore>, history: Arc<dyn BuildHistory>) -> Self {
        Self { rules, history }
    }
}

#[async_trait]
impl Tool for AnalyzeBuildFailuresTool {
    fn name(&self) -> &str {
        "analyze_build_failures"
    }

    fn description(&self) -> &str {
        "Group recent build failures by category and pipeline, with recommendations."
    }

    fn schema(&self) -> ToolSchema {
        days_schema()
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        let days = parse_days(params)?;
        let rules = self.rules.as_ref();
        let failures = failures(rules, self.history.as_ref(), days).await?;

        if failures.is_empty() {
            return Ok(json!({
                "total_failures": 0,
                "message": format!("No build failures in the last {days} days"),
            }));
        }

        let field = |key: &'static str| failures.iter().filter_map(move |f| f[key].as_str());
        let categories = top_counts(field("failure_category"));
        let pipelines = top_counts(field("pipeline"));

        let classifier = FailureClassifier::from_rules(rules);
        let recommendations: Vec<String> = categories
            .iter()
            .filter_map(|(category, count)| {
                classifier
                    .suggested_action(category)
                    .map(|action| format!("{} ({count} occurrences): {action}", title_case(category)))
            })
            .collect();

        let to_map = |counts: &[(String, usize)]| -> Map<String, Value> {
            counts.iter().map(|(k, n)| (k.clone(), json!(n))).collect()
        };

        Ok(json!({
            "total_failures": failures.len(),
            "analysis_period_days": days,
            "failure_categories": to_map(&categories),
            "affected_pipelines": to_map(&pipelines),
            "recommendations": recommendations,
            "recent_failures": failures.iter().take(5).collect::<Vec<_>>(),
        }))
    }
}

pub struct GetBuildMetricsTool {
    rules: Arc<dyn RuleStore>,
    history: Arc<dyn BuildHistory>,
}

impl GetBuildMetricsTool {
    pub fn new(rules: Arc<dyn RuleStore>, history: Arc<dyn BuildHistory>) -> Self {
        Self { rules, history }
    }
}

#[async_trait]
impl Tool for GetBuildMetricsTool {
    fn name(&self) -> &str {
        "get_build_metrics"
    }

    fn description(&self) -> &str {
        "Build count, success rate and average duration over the last N days, with threshold alerts."
    }

    fn schema(&self) -> ToolSchema {
        days_schema()
    }

    async fn execute(&self, params: Value) -> Result<Value, anyhow::Error> {
        let days = parse_days(params)?;
        let builds = recent_builds(self.history.as_ref(), days).await?;
        if builds.is_empty() {
            return Ok(json!({"period_days": days, "total_builds": 0, "message": "No builds in the specified period"}));
        }

        let total = builds.len();
        let succeeded = builds.iter().filter(|b| b.result == "succeeded").count();
        let failed = builds.iter().filter(|b| b.result == "failed").count();
        let success_rate = succeeded as f64 / total as f64 * 100.0;
        let avg_duration = builds.iter().map(|b| f64::from(b.duration_minutes)).sum::<f64>() / total as f64;

        let threshold = |name: &str, default: f64| {
            self.rules
                .get(&format!("{MONITORING_KEY}.performance_metrics.{name}"))
                .and_then(|v| v.as_f64())
                .unwrap_or(default)
        };
        let duration_threshold = threshold("duration_threshold_minutes", 60.0);
        let rate_threshold = threshold("success_rate_threshold_percent", 80.0);

        let mut alerts = Vec::new();
        if success_rate < rate_threshold {
            alerts.push(format!(
                "Success rate ({success_rate:.1}%) is below threshold ({rate_threshold}%)"
            ));
        }
        if avg_duration > duration_threshold {
            alerts.push(format!(
                "Average duration ({avg_duration:.1} min) exceeds threshold ({duration_threshold} min)"
            ));
        }

        let round2 = |x: f64| (x * 100.0).round() / 100.0;
        Ok(json!({
            "period_days": days,
            "total_builds": total,
            "successful_builds": succeeded,
            "failed_builds": failed,
            "success_rate_percent": round2(success_rate),
            "average_duration_minutes": round2(avg_duration),
            "alerts": alerts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::StaticRuleStore;

    fn rules() -> Arc<dyn RuleStore> {
        Arc::new(StaticRuleStore::default().with_document(
            "build_monitoring",
            json!({
                "pipeline_monitoring": {
                    "monitored_pipelines": [{"name": "CI-Main"}, {"name": "Nightly-Tests"}]
                },
                "build_failure_analysis": {
                    "failure_patterns": [
                        {"pattern": "outofmemory", "category": "memory", "suggested_action": "Raise heap size"},
                        {"pattern": "ENOTFOUND", "category": "network", "suggested_action": "Check DNS"}
                    ]
                },
                "performance_metrics": {"duration_threshold_minutes": 20, "success_rate_threshold_percent": 80}
            }),
        ))
    }

    fn history() -> Arc<dyn BuildHistory> {
        Arc::new(StaticBuildHistory::sample())
    }

    #[tokio::test]
    async fn test_pipeline_status_defaults_to_monitored() {
        let tool = QueryPipelineStatusTool::new(rules(), history());

        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["count"], 2);
        assert_eq!(result["pipelines"][1]["latest_status"], "failed");

        let result = tool.execute(json!({"pipeline_name": "CD-Production"})).await.unwrap();
        assert_eq!(result["pipelines"][0]["pipeline_id"], 2);

        let unmonitored = QueryPipelineStatusTool::new(Arc::new(StaticRuleStore::default()), history());
        assert_eq!(unmonitored.execute(json!({})).await.unwrap()["count"], 3);
    }

    #[tokio::test]
    async fn test_failures_are_categorized() {
        let tool = GetBuildFailuresTool::new(rules(), history());

        let result = tool.execute(json!({"days": 7})).await.unwrap();
        assert_eq!(result["count"], 2);
        assert_eq!(result["failures"][0]["failure_category"], "memory");
        assert_eq!(result["failures"][1]["failure_category"], "network");

        let result = tool.execute(json!({"days": 1})).await.unwrap();
        assert_eq!(result["count"], 0);
        assert!(tool.execute(json!({"days": 0})).await.is_err());
        assert!(tool.execute(json!({"days": i64::MAX})).await.is_err());
    }

    #[tokio::test]
    async fn test_default_patterns_when_unconfigured() {
        let tool = GetBuildFailuresTool::new(Arc::new(StaticRuleStore::default()), history());
        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["failures"][0]["failure_category"], "memory");
        assert_eq!(result["failures"][1]["failure_category"], "network");
    }

    #[tokio::test]
    async fn test_analysis_recommendations() {
        let tool = AnalyzeBuildFailuresTool::new(rules(), history());

        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["total_failures"], 2);
        assert_eq!(result["failure_categories"], json!({"memory": 1, "network": 1}));
        assert_eq!(result["affected_pipelines"], json!({"CI-Main": 1, "Nightly-Tests": 1}));
        assert_eq!(
            result["recommendations"],
            json!(["Memory (1 occurrences): Raise heap size", "Network (1 occurrences): Check DNS"])
        );

        let empty = AnalyzeBuildFailuresTool::new(rules(), Arc::new(StaticBuildHistory::default()));
        assert_eq!(empty.execute(json!({})).await.unwrap()["total_failures"], 0);
    }

    #[tokio::test]
    async fn test_metrics_and_alerts() {
        let tool = GetBuildMetricsTool::new(rules(), history());

        let result = tool.execute(json!({})).await.unwrap();
        assert_eq!(result["total_builds"], 4);
        assert_eq!(result["successful_builds"], 2);
        assert_eq!(result["success_rate_percent"], 50.0);
        assert_eq!(result["average_duration_minutes"], 25.0);
        let alerts = result["alerts"].as_array().unwrap();
        assert_eq!(alerts.len(), 2);
        assert!(alerts[0].as_str().unwrap().contains("below threshold"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("memory"), "Memory");
        assert_eq!(title_case("out_of_memory"), "Out_Of_Memory");
    }
}
