//! Static credential verifier for testing.
//!
//! Resolves tokens from a fixed map configured up-front. Anything not in the
//! map is rejected.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::foundation::DomainError;
use crate::ports::{AuthVerifier, Caller};

/// Verifier with a fixed token-to-caller map.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthVerifier {
    callers: HashMap<String, Caller>,
}

impl StaticAuthVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a token that resolves to the given caller.
    pub fn with_caller(mut self, token: impl Into<String>, caller: Caller) -> Self {
        self.callers.insert(token.into(), caller);
        self
    }
}

#[async_trait]
impl AuthVerifier for StaticAuthVerifier {
    async fn verify(&self, token: &str) -> Result<Caller, DomainError> {
        self.callers
            .get(token)
            .cloned()
            .ok_or_else(|| DomainError::unauthorized("unknown credential"))
    }
}
