//! HTTP credential verifier adapter.
//!
//! Posts the opaque token to an external verification endpoint which answers
//! with the caller identity and role set. Any non-success status is an
//! authentication failure; the token itself is never logged.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::access::Role;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::{AuthVerifier, Caller};

#[derive(Debug, Serialize)]
struct VerifyBody<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    user_id: String,
    #[serde(default)]
    roles: Vec<String>,
}

/// Verifier backed by an external HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpAuthVerifier {
    client: reqwest::Client,
    verify_url: String,
}

impl HttpAuthVerifier {
    pub fn new(verify_url: impl Into<String>) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(DomainError::internal)?;
        Ok(Self {
            client,
            verify_url: verify_url.into(),
        })
    }
}

#[async_trait]
impl AuthVerifier for HttpAuthVerifier {
    async fn verify(&self, token: &str) -> Result<Caller, DomainError> {
        let response = self
            .client
            .post(&self.verify_url)
            .json(&VerifyBody { token })
            .send()
            .await
            .map_err(|e| DomainError::unauthorized(format!("verifier unreachable: {}", e)))?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "credential rejected by verifier");
            return Err(DomainError::unauthorized("credential rejected"));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| DomainError::unauthorized(format!("malformed verifier reply: {}", e)))?;
        let user_id = UserId::new(body.user_id)?;
        let roles = body.roles.into_iter().map(Role::new).collect();
        Ok(Caller::new(user_id, roles))
    }
}
