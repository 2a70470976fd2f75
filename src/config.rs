// ABOUTME: Orchestrator configuration - round, retry and timeout budgets.
// ABOUTME: Loadable from YAML with defaults for every field.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Budgets that bound one Manager run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Speaker selections allowed per conversation.
    pub max_rounds: u32,
    /// Corrective retries after an invalid tool call, per turn.
    pub max_retries: u32,
    /// Consecutive failed tool results before a sub-task is failed.
    pub max_tool_failures: u32,
    /// Proposals one agent may make within a single turn.
    pub max_turn_steps: u32,
    pub tool_timeout_secs: u64,
    pub oracle_timeout_secs: u64,
    pub oracle_retries: u32,
    /// Let the selector dispatch independent agents as a parallel batch.
    pub parallel: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: 12,
            max_retries: 2,
            max_tool_failures: 2,
            max_turn_steps: 6,
            tool_timeout_secs: 30,
            oracle_timeout_secs: 60,
            oracle_retries: 2,
            parallel: false,
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a YAML file. Missing fields take their defaults.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject budgets that would make every run fail immediately.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = [
            ("max_rounds", self.max_rounds == 0),
            ("max_tool_failures", self.max_tool_failures == 0),
            ("max_turn_steps", self.max_turn_steps == 0),
            ("tool_timeout_secs", self.tool_timeout_secs == 0),
            ("oracle_timeout_secs", self.oracle_timeout_secs == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }
        Ok(())
    }

    #[must_use]
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max;
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    #[must_use]
    pub fn with_max_tool_failures(mut self, max: u32) -> Self {
        self.max_tool_failures = max;
        self
    }

    #[must_use]
    pub fn with_max_turn_steps(mut self, max: u32) -> Self {
        self.max_turn_steps = max;
        self
    }

    #[must_use]
    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout_secs = timeout.as_secs().max(1);
        self
    }

    #[must_use]
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout_secs = timeout.as_secs().max(1);
        self
    }

    #[must_use]
    pub fn with_oracle_retries(mut self, retries: u32) -> Self {
        self.oracle_retries = retries;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_rounds, 12);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.max_tool_failures, 2);
        assert_eq!(config.tool_timeout(), Duration::from_secs(30));
        assert!(!config.parallel);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = OrchestratorConfig::new()
            .with_max_rounds(2)
            .with_parallel(true)
            .with_tool_timeout(Duration::from_secs(5));
        assert_eq!(config.max_rounds, 2);
        assert!(config.parallel);
        assert_eq!(config.tool_timeout_secs, 5);
    }

    #[test]
    fn test_from_yaml_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_rounds: 4\nparallel: true").unwrap();

        let config = OrchestratorConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.max_rounds, 4);
        assert!(config.parallel);
        assert_eq!(config.max_retries, 2);
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_rounds: 0").unwrap();

        let err = OrchestratorConfig::from_yaml_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("max_rounds")));
    }

    #[test]
    fn test_missing_file() {
        let err = OrchestratorConfig::from_yaml_file("/nonexistent/switchboard.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
