//! Conversation access configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Access policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AccessConfig {
    /// Roles allowed to use conversations (comma-separated)
    #[serde(default = "default_roles")]
    pub conversation_roles: String,
}

impl AccessConfig {
    /// Get the allow-listed roles as a vector
    pub fn roles_list(&self) -> Vec<String> {
        self.conversation_roles
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Validate access configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.roles_list().is_empty() {
            return Err(ValidationError::EmptyRoleList);
        }
        Ok(())
    }
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            conversation_roles: default_roles(),
        }
    }
}

fn default_roles() -> String {
    "superuser, globaldesigner".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_parsing_trims_and_drops_empties() {
        let config = AccessConfig {
            conversation_roles: "superuser, analyst,, ".to_string(),
        };
        assert_eq!(config.roles_list(), vec!["superuser", "analyst"]);
    }

    #[test]
    fn test_empty_role_list_is_rejected() {
        let config = AccessConfig {
            conversation_roles: " , ".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_validate() {
        assert!(AccessConfig::default().validate().is_ok());
    }
}
