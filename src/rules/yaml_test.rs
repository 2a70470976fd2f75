// ABOUTME: Tests for YamlRuleStore - directory loading, environment overrides,
// ABOUTME: variable expansion, feature flags, and per-document validation.

use std::fs;

use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::error::RuleError;

const AZURE: &str = r#"
vm_naming_patterns:
  ci_templates:
    regex: "vhds-ci-wat-template-\\d+-\\d+-\\d+"
  production:
    regex: "vhds-prod-"
vm_cleanup:
  keep_latest_count: 5
  age_threshold_days: 30
  dry_run: true
  subscription: "${SWITCHBOARD_TEST_SUBSCRIPTION}"
  tenant: "${SWITCHBOARD_TEST_UNSET_TENANT}"
"#;

const ENVIRONMENTS: &str = r#"
production:
  azure_resources:
    vm_cleanup:
      dry_run: false
feature_flags:
  production:
    auto_cleanup: true
  development:
    auto_cleanup: false
"#;

fn config_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("azure_resources.yaml"), AZURE).unwrap();
    fs::write(dir.path().join("environments.yaml"), ENVIRONMENTS).unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
    dir
}

#[test]
fn test_load_documents_by_stem() {
    let dir = config_dir();
    let store = YamlRuleStore::load(dir.path(), "development").unwrap();

    assert_eq!(store.names(), vec!["azure_resources", "environments"]);
    assert_eq!(store.environment(), "development");
    assert_eq!(
        store.lookup("azure_resources.vm_cleanup.keep_latest_count").unwrap(),
        json!(5)
    );
    assert!(store.lookup("azure_resources").unwrap().is_object());
    assert!(matches!(store.lookup("storage_cleanup.x"), Err(RuleError::NotFound(_))));
}

#[test]
fn test_environment_override_applies_to_named_document() {
    let dir = config_dir();

    let dev = YamlRuleStore::load(dir.path(), "development").unwrap();
    assert_eq!(dev.lookup("azure_resources.vm_cleanup.dry_run").unwrap(), json!(true));

    let prod = YamlRuleStore::load(dir.path(), "production").unwrap();
    assert_eq!(prod.lookup("azure_resources.vm_cleanup.dry_run").unwrap(), json!(false));
    assert_eq!(prod.lookup("azure_resources.vm_cleanup.keep_latest_count").unwrap(), json!(5));
}

#[test]
fn test_env_var_expansion() {
    // SAFETY: test-only variable with a unique name
    unsafe { std::env::set_var("SWITCHBOARD_TEST_SUBSCRIPTION", "sub-1234") };
    let dir = config_dir();
    let store = YamlRuleStore::load(dir.path(), "development").unwrap();

    assert_eq!(store.lookup("azure_resources.vm_cleanup.subscription").unwrap(), json!("sub-1234"));
    assert_eq!(
        store.lookup("azure_resources.vm_cleanup.tenant").unwrap(),
        json!("${SWITCHBOARD_TEST_UNSET_TENANT}")
    );
}

#[test]
fn test_feature_flags() {
    let dir = config_dir();
    assert!(YamlRuleStore::load(dir.path(), "production").unwrap().feature_flag("auto_cleanup"));
    assert!(!YamlRuleStore::load(dir.path(), "development").unwrap().feature_flag("auto_cleanup"));
    assert!(!YamlRuleStore::load(dir.path(), "staging").unwrap().feature_flag("auto_cleanup"));
}

#[test]
fn test_pattern_matching_through_store() {
    let dir = config_dir();
    let store = YamlRuleStore::load(dir.path(), "development").unwrap();

    assert!(store.matches("vhds-ci-wat-template-26-1-0.beta-20260213025457", "ci_templates"));
    assert!(store.matches("vhds-prod-api-1.2.3", "production"));
    assert!(!store.matches("vhds-prod-api-1.2.3", "ci_templates"));
    assert_eq!(
        store.extract_version("vhds-ci-wat-template-25-2-1.release-20260115103022", "ci_templates"),
        Some("25.2.1-release".to_string())
    );
}

#[test]
fn test_validate() {
    let dir = config_dir();
    fs::write(dir.path().join("build_monitoring.yaml"), "pipeline_monitoring: {}\n").unwrap();
    fs::write(
        dir.path().join("storage_cleanup.yaml"),
        "blob_retention:\n  ci_artifacts:\n    keep_latest_count: 3\nstorage_accounts: []\n",
    )
    .unwrap();
    let store = YamlRuleStore::load(dir.path(), "development").unwrap();

    assert!(store.validate("azure_resources").is_ok());
    let err = store.validate("build_monitoring").unwrap_err();
    assert!(err.to_string().contains("build_failure_analysis"));
    let err = store.validate("storage_cleanup").unwrap_err();
    assert!(err.to_string().contains("age_threshold_days"));
    assert!(matches!(store.validate("missing"), Err(RuleError::NotFound(_))));
}

#[test]
fn test_missing_directory() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(matches!(
        YamlRuleStore::load(&missing, "development"),
        Err(RuleError::DirectoryNotFound(p)) if p == missing
    ));
}

#[test]
fn test_empty_and_malformed_documents() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("empty.yaml"), "").unwrap();
    assert!(matches!(
        YamlRuleStore::load(dir.path(), "development"),
        Err(RuleError::Empty(_))
    ));

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bad.yaml"), "key: [unclosed").unwrap();
    assert!(matches!(
        YamlRuleStore::load(dir.path(), "development"),
        Err(RuleError::Yaml { .. })
    ));
}

#[test]
fn test_reload_picks_up_changes() {
    let dir = config_dir();
    let mut store = YamlRuleStore::load(dir.path(), "development").unwrap();
    fs::write(dir.path().join("azure_resources.yaml"), "vm_cleanup:\n  keep_latest_count: 2\n").unwrap();

    store.reload().unwrap();
    assert_eq!(store.lookup("azure_resources.vm_cleanup.keep_latest_count").unwrap(), json!(2));
}
