//! Ledger configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode config: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Tuning knobs for [`crate::ProgressLedger`].
///
/// ```toml
/// max_commit_retries = 5
/// warn_on_lesson_count_mismatch = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Extra attempts after an optimistic-concurrency conflict on an
    /// enrollment write before giving up.
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,

    /// Log a warning when a course's authored `lesson_count` disagrees with
    /// its published lessons.
    #[serde(default = "default_true")]
    pub warn_on_lesson_count_mismatch: bool,
}

fn default_max_commit_retries() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: default_max_commit_retries(),
            warn_on_lesson_count_mismatch: true,
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Save config to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_uses_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.max_commit_retries, 5);
    }

    #[test]
    fn fields_override_defaults() {
        let config = LedgerConfig::from_toml_str(
            "max_commit_retries = 0\nwarn_on_lesson_count_mismatch = false\n",
        )
        .unwrap();
        assert_eq!(config.max_commit_retries, 0);
        assert!(!config.warn_on_lesson_count_mismatch);
    }

    #[test]
    fn wrong_types_are_rejected() {
        let err = LedgerConfig::from_toml_str("max_commit_retries = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.toml");
        let config = LedgerConfig {
            max_commit_retries: 9,
            ..LedgerConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(LedgerConfig::load(&path).unwrap(), config);
    }
}
