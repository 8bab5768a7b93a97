//! RON configuration for a worker

use crate::{Error, Result};
use reblock_core::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current version written into state envelopes
pub const STATE_VERSION: u32 = 1;

/// Worker configuration
///
/// Every field has a default, so an empty RON struct `()` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Render engine settings
    #[serde(default)]
    pub engine: EngineConfig,
    /// Version stamped on state envelopes; blobs of another version are rejected
    #[serde(default = "default_state_version")]
    pub state_version: u32,
    /// `tracing` filter directive used by [`crate::logging::init`]
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_state_version() -> u32 {
    STATE_VERSION
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            state_version: STATE_VERSION,
            log_filter: default_log_filter(),
        }
    }
}

impl WorkerConfig {
    /// Parse configuration from RON text
    pub fn from_ron(content: &str) -> Result<Self> {
        ron::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_ron(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = WorkerConfig::from_ron("()").unwrap();
        assert_eq!(config, WorkerConfig::default());
        assert_eq!(config.engine.max_restarts(), 3);
    }

    #[test]
    fn test_config_overrides() {
        let config = WorkerConfig::from_ron(
            r#"(
                engine: (max_restarts: 5),
                state_version: 2,
                log_filter: "reblock_core=debug",
            )"#,
        )
        .unwrap();
        assert_eq!(config.engine.max_restarts(), 5);
        assert_eq!(config.state_version, 2);
        assert_eq!(config.log_filter, "reblock_core=debug");
    }

    #[test]
    fn test_config_errors() {
        assert!(matches!(
            WorkerConfig::from_ron("(state_version: \"two\")"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            WorkerConfig::load("/nonexistent/worker.ron"),
            Err(Error::Config(_))
        ));
    }
}
