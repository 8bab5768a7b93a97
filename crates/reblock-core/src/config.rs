//! Engine configuration

use serde::{Deserialize, Serialize};

/// Default bound on render restarts caused by deferred initializers
pub const DEFAULT_MAX_RESTARTS: u32 = 3;

/// Configuration for the render engine
///
/// # Example
///
/// ```
/// use reblock_core::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.max_restarts(), 3);
///
/// let config = EngineConfig::with_max_restarts(5);
/// assert_eq!(config.max_restarts(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many times a render may restart after resolving deferred
    /// initializers before it fails with `Error::RestartLimit`
    #[serde(default = "default_max_restarts")]
    max_restarts: u32,
}

fn default_max_restarts() -> u32 {
    DEFAULT_MAX_RESTARTS
}

impl EngineConfig {
    pub fn with_max_restarts(max_restarts: u32) -> Self {
        Self { max_restarts }
    }

    pub fn max_restarts(&self) -> u32 {
        self.max_restarts
    }

    pub fn set_max_restarts(&mut self, n: u32) {
        self.max_restarts = n;
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_restarts: DEFAULT_MAX_RESTARTS,
        }
    }
}
