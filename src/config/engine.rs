//! Answering engine configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Answering engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the answering service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Retrieval pattern used when the client supplies none
    #[serde(default = "default_retrieval_pattern")]
    pub default_retrieval_pattern: String,

    /// Per-turn deadline in seconds
    #[serde(default = "default_turn_timeout")]
    pub turn_timeout_secs: u64,
}

impl EngineConfig {
    /// Validate engine configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidEngineUrl);
        }
        if self.turn_timeout_secs == 0 || self.turn_timeout_secs > 600 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            default_retrieval_pattern: default_retrieval_pattern(),
            turn_timeout_secs: default_turn_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_retrieval_pattern() -> String {
    "hybridsearch".to_string()
}

fn default_turn_timeout() -> u64 {
    60
}
