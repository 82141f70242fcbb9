//! Credential verifier configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Credential verifier configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Verification endpoint that resolves tokens to callers
    pub verify_url: String,
}

impl AuthConfig {
    /// Validate auth configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.verify_url.is_empty() {
            return Err(ValidationError::MissingRequired("auth.verify_url"));
        }
        if !self.verify_url.starts_with("http://") && !self.verify_url.starts_with("https://") {
            return Err(ValidationError::InvalidVerifyUrl);
        }
        Ok(())
    }
}
