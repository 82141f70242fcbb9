//! Credential verification port.
//!
//! Tokens are opaque to this service; they are forwarded to an external
//! verifier which resolves the caller identity and role set checked against
//! the conversation access allow-list.

use async_trait::async_trait;

use crate::domain::access::Role;
use crate::domain::foundation::{DomainError, UserId};

/// Verified caller identity and role set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Caller {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }
}

/// Port for the external credential verifier.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    /// Resolves an opaque token to a caller.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` for rejected or unknown tokens.
    async fn verify(&self, token: &str) -> Result<Caller, DomainError>;
}
