// ABOUTME: YamlRuleStore - loads every *.yaml document in a config directory,
// ABOUTME: applies per-environment overrides and expands ${VAR} values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::store::{RuleStore, deep_merge, lookup_path};
use crate::error::RuleError;

/// Name of the document holding per-environment overrides and feature flags.
pub const ENVIRONMENTS_DOCUMENT: &str = "environments";

const DEFAULT_ENVIRONMENT: &str = "development";

/// Rules loaded from a directory of YAML files, one document per file stem.
#[derive(Debug, Clone)]
pub struct YamlRuleStore {
    dir: PathBuf,
    environment: String,
    documents: BTreeMap<String, Value>,
}

impl YamlRuleStore {
    /// Load `dir` for the given environment.
    ///
    /// `environments.yaml` may hold one section per environment; inside it,
    /// a key naming another document is deep-merged into that document.
    pub fn load(dir: impl AsRef<Path>, environment: impl Into<String>) -> Result<Self, RuleError> {
        let mut store = Self {
            dir: dir.as_ref().to_path_buf(),
            environment: environment.into(),
            documents: BTreeMap::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Load `dir` for the environment named by `ENVIRONMENT`, or development.
    pub fn from_env(dir: impl AsRef<Path>) -> Result<Self, RuleError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| DEFAULT_ENVIRONMENT.to_string());
        Self::load(dir, environment)
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of the loaded documents, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.documents.keys().map(String::as_str).collect()
    }

    pub fn document(&self, name: &str) -> Option<&Value> {
        self.documents.get(name)
    }

    /// Re-read every document from disk.
    pub fn reload(&mut self) -> Result<(), RuleError> {
        if !self.dir.is_dir() {
            return Err(RuleError::DirectoryNotFound(self.dir.clone()));
        }

        let mut documents = BTreeMap::new();
        for path in yaml_files(&self.dir)? {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            documents.insert(name, read_document(&path)?);
        }

        let overrides = documents
            .get(ENVIRONMENTS_DOCUMENT)
            .and_then(|env| env.get(&self.environment))
            .cloned();
        if overrides.is_none() {
            tracing::debug!(environment = %self.environment, "no environment overrides");
        }

        for (name, document) in documents.iter_mut() {
            if name != ENVIRONMENTS_DOCUMENT {
                if let Some(overlay) = overrides.as_ref().and_then(|o| o.get(name.as_str())) {
                    deep_merge(document, overlay);
                }
            }
            expand_env_vars(document);
        }

        tracing::info!(
            dir = %self.dir.display(),
            environment = %self.environment,
            documents = documents.len(),
            "rules loaded"
        );
        self.documents = documents;
        Ok(())
    }

    /// Flag from `environments.feature_flags.<environment>.<name>`; false when unset.
    pub fn feature_flag(&self, name: &str) -> bool {
        let key = format!("{ENVIRONMENTS_DOCUMENT}.feature_flags.{}.{name}", self.environment);
        matches!(self.lookup(&key), Ok(Value::Bool(true)))
    }

    /// Check that a document has the sections its consumers rely on.
    pub fn validate(&self, name: &str) -> Result<(), RuleError> {
        let document = self
            .documents
            .get(name)
            .ok_or_else(|| RuleError::NotFound(name.to_string()))?;
        let invalid = |reason: String| RuleError::Invalid {
            name: name.to_string(),
            reason,
        };
        if !document.is_object() {
            return Err(invalid("document must be a mapping".into()));
        }

        let require = |sections: &[&str]| {
            sections
                .iter()
                .find(|s| document.get(**s).is_none())
                .map_or(Ok(()), |s| Err(invalid(format!("missing required section: {s}"))))
        };

        match name {
            "azure_resources" => {
                require(&["vm_naming_patterns", "vm_cleanup"])?;
                for (pattern, spec) in sections_of(document, "vm_naming_patterns") {
                    if spec.get("regex").is_none() {
                        return Err(invalid(format!("VM pattern {pattern} missing 'regex' field")));
                    }
                }
            }
            "storage_cleanup" => {
                require(&["blob_retention", "storage_accounts"])?;
                for (artifact, policy) in sections_of(document, "blob_retention") {
                    for field in ["keep_latest_count", "age_threshold_days"] {
                        if policy.get(field).is_none() {
                            return Err(invalid(format!("retention policy {artifact} missing '{field}' field")));
                        }
                    }
                }
            }
            "build_monitoring" => require(&["pipeline_monitoring", "build_failure_analysis"])?,
            _ => {}
        }

        tracing::debug!(name, "rules validated");
        Ok(())
    }
}

impl RuleStore for YamlRuleStore {
    fn lookup(&self, key: &str) -> Result<Value, RuleError> {
        let (name, rest) = key.split_once('.').unwrap_or((key, ""));
        let document = self
            .documents
            .get(name)
            .ok_or_else(|| RuleError::NotFound(key.to_string()))?;
        if rest.is_empty() {
            return Ok(document.clone());
        }
        lookup_path(document, rest).map_err(|_| RuleError::NotFound(key.to_string()))
    }
}

fn sections_of<'a>(document: &'a Value, key: &str) -> Vec<(&'a String, &'a Value)> {
    document
        .get(key)
        .and_then(Value::as_object)
        .map(|m| m.iter().collect())
        .unwrap_or_default()
}

fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>, RuleError> {
    let entries = std::fs::read_dir(dir).map_err(|source| RuleError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().and_then(|e| e.to_str()) == Some("yaml"))
        .collect();
    files.sort();
    Ok(files)
}

fn read_document(path: &Path) -> Result<Value, RuleError> {
    let content = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(RuleError::Empty(path.to_path_buf()));
    }
    let document: Value = serde_yaml::from_str(&content).map_err(|source| RuleError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    if document.is_null() {
        return Err(RuleError::Empty(path.to_path_buf()));
    }
    Ok(document)
}

/// Replace whole-string `${VAR}` values with the variable's value when set.
fn expand_env_vars(value: &mut Value) {
    match value {
        Value::Object(map) => map.values_mut().for_each(expand_env_vars),
        Value::Array(items) => items.iter_mut().for_each(expand_env_vars),
        Value::String(s) => {
            let Some(var) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) else {
                return;
            };
            match std::env::var(var) {
                Ok(expanded) if !expanded.is_empty() => *s = expanded,
                _ => tracing::warn!(var, "environment variable not set, keeping placeholder"),
            }
        }
        _ => {}
    }
}
