//! Engine configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;

/// Tunables shared by the compiler, the session controller and the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Failed turns a compiled state tolerates before the stall fallback applies.
    pub default_max_attempts: u32,
    /// Advice items attached to each state.
    pub advice_limit_per_state: usize,
    /// Whether compiled data-collection states are skipped when already answered.
    pub skip_if_already_known: bool,
    /// Prefix of compiled data-collection state ids (`q_budget`).
    pub state_id_prefix: String,
    /// Overrides the cascading-skip guard, which defaults to the number of states.
    pub max_cascade_hops: Option<usize>,
    /// Inactivity after which a session may be marked abandoned.
    pub idle_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_max_attempts: 3,
            advice_limit_per_state: 1,
            skip_if_already_known: true,
            state_id_prefix: "q_".to_string(),
            max_cascade_hops: None,
            idle_timeout_secs: 30 * 60,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::JsonParseError(format!("Could not read '{}': {}", path, e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))
    }
}
