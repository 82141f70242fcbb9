//! Storage configuration

use serde::Deserialize;
use std::path::PathBuf;

use super::error::ValidationError;

/// Storage configuration (conversation files and log destinations)
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one file per conversation
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Operational log destination; stderr only when unset
    pub operational_log_path: Option<PathBuf>,

    /// Request-audit log file
    #[serde(default = "default_audit_log_path")]
    pub audit_log_path: PathBuf,
}

impl StorageConfig {
    /// Validate storage configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(ValidationError::InvalidStorePath);
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            operational_log_path: None,
            audit_log_path: default_audit_log_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("data/conversations")
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("data/audit.jsonl")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.store_path, PathBuf::from("data/conversations"));
        assert!(config.operational_log_path.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_store_path_is_rejected() {
        let config = StorageConfig {
            store_path: PathBuf::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
