// ABOUTME: The RuleStore trait - dotted-key lookup and naming-pattern matching
// ABOUTME: over configuration documents - plus an in-memory StaticRuleStore.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::RuleError;

/// Key prefix under which VM naming patterns live.
pub const VM_PATTERNS_KEY: &str = "azure_resources.vm_naming_patterns";

static CI_TEMPLATE_VERSION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"template-(\d+-\d+-\d+)\.(\w+)-(\d+)").ok());

/// Read-only access to configuration rules.
///
/// Keys are dotted paths whose first segment names the document, e.g.
/// `azure_resources.vm_cleanup.keep_latest_count`. Tools consult rules;
/// the orchestrator never does.
pub trait RuleStore: Send + Sync {
    fn lookup(&self, key: &str) -> Result<Value, RuleError>;

    /// Whether `candidate` matches the regex of naming pattern `pattern_key`.
    ///
    /// The regex is anchored at the start only. A missing pattern, missing
    /// regex or invalid regex never matches.
    fn matches(&self, candidate: &str, pattern_key: &str) -> bool {
        let key = format!("{VM_PATTERNS_KEY}.{pattern_key}.regex");
        let regex = match self.lookup(&key) {
            Ok(Value::String(regex)) => regex,
            Ok(other) => {
                tracing::warn!(pattern = pattern_key, value = %other, "naming pattern regex is not a string");
                return false;
            }
            Err(_) => {
                tracing::warn!(pattern = pattern_key, "naming pattern not found");
                return false;
            }
        };
        match Regex::new(&format!("^(?:{regex})")) {
            Ok(re) => re.is_match(candidate),
            Err(e) => {
                tracing::error!(pattern = pattern_key, error = %e, "invalid naming pattern regex");
                false
            }
        }
    }

    /// Version of a `ci_templates` name, e.g. `template-26-1-0.beta-2026...` gives `26.1.0-beta`.
    fn extract_version(&self, name: &str, pattern_key: &str) -> Option<String> {
        if pattern_key != "ci_templates" || !self.matches(name, pattern_key) {
            return None;
        }
        let caps = CI_TEMPLATE_VERSION.as_ref()?.captures(name)?;
        Some(format!("{}-{}", caps[1].replace('-', "."), &caps[2]))
    }

    /// Lookup that treats any error as absent.
    fn get(&self, key: &str) -> Option<Value> {
        self.lookup(key).ok()
    }
}

/// Walk a dotted key through nested objects and arrays.
pub(crate) fn lookup_path(root: &Value, key: &str) -> Result<Value, RuleError> {
    let mut node = root;
    for segment in key.split('.') {
        node = match node {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(|| RuleError::NotFound(key.to_string()))?;
    }
    Ok(node.clone())
}

/// Deep merge `overlay` into `base`; objects merge key by key, anything else replaces.
pub(crate) fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Rules held in memory as one JSON document keyed by document name.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleStore {
    root: Value,
}

impl StaticRuleStore {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Add or replace one document.
    #[must_use]
    pub fn with_document(mut self, name: impl Into<String>, document: Value) -> Self {
        if !self.root.is_object() {
            self.root = Value::Object(Map::new());
        }
        if let Value::Object(map) = &mut self.root {
            map.insert(name.into(), document);
        }
        self
    }
}

impl RuleStore for StaticRuleStore {
    fn lookup(&self, key: &str) -> Result<Value, RuleError> {
        lookup_path(&self.root, key)
    }
}
