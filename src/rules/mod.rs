// ABOUTME: Configuration-rule module - lookup and pattern matching over rule documents.
// ABOUTME: Domain tools consult it; YAML-backed and in-memory stores are provided.

mod store;
mod yaml;

pub use store::{RuleStore, StaticRuleStore, VM_PATTERNS_KEY};
pub use yaml::{ENVIRONMENTS_DOCUMENT, YamlRuleStore};

#[cfg(test)]
mod yaml_test;
