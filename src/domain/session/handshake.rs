//! Session handshake: the fixed three-value negotiation preceding turns.
//!
//! A client opens a stream and sends, in strict order: an opaque credential
//! token, a retrieval-pattern identifier, and a conversation target (an
//! existing id, or the literal `"new"` to request allocation). Handshake
//! state is transient per-connection and never persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ConversationId, DomainError, ErrorCode};

/// Retrieval pattern used when the client supplies none.
pub const DEFAULT_RETRIEVAL_PATTERN: &str = "hybridsearch";

/// Literal sentinel requesting allocation of a fresh conversation.
pub const NEW_CONVERSATION_SENTINEL: &str = "new";

/// Identifier selecting which answering strategy the engine should use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalPattern(String);

impl RetrievalPattern {
    /// Creates a pattern from a client-supplied value, falling back to the
    /// given default when the value is empty.
    pub fn from_client(raw: &str, default: &RetrievalPattern) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            default.clone()
        } else {
            Self(trimmed.to_string())
        }
    }

    /// Creates a pattern from a trusted (configuration) value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RetrievalPattern {
    fn default() -> Self {
        Self(DEFAULT_RETRIEVAL_PATTERN.to_string())
    }
}

impl fmt::Display for RetrievalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which conversation the client wants to attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationTarget {
    /// Allocate a fresh conversation.
    New,
    /// Resume a previously obtained conversation id.
    Existing(ConversationId),
}

impl ConversationTarget {
    /// Parses the third handshake value.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed == NEW_CONVERSATION_SENTINEL {
            return Ok(ConversationTarget::New);
        }
        let id = ConversationId::new(trimmed)?;
        Ok(ConversationTarget::Existing(id))
    }
}

/// Fully negotiated handshake values for one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeState {
    /// Opaque token, forwarded to the external credential verifier.
    pub credentials: String,
    pub retrieval_pattern: RetrievalPattern,
    pub target: ConversationTarget,
}

/// Collects the three handshake values in strict order.
#[derive(Debug)]
pub struct HandshakeIntake {
    default_pattern: RetrievalPattern,
    credentials: Option<String>,
    retrieval_pattern: Option<RetrievalPattern>,
}

impl HandshakeIntake {
    pub fn new(default_pattern: RetrievalPattern) -> Self {
        Self {
            default_pattern,
            credentials: None,
            retrieval_pattern: None,
        }
    }

    /// Offers the next raw handshake frame.
    ///
    /// Returns `Some(HandshakeState)` once all three values have arrived.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the credential frame is empty.
    /// - `InvalidFormat` if the conversation target is malformed.
    pub fn offer(&mut self, raw: &str) -> Result<Option<HandshakeState>, DomainError> {
        if self.credentials.is_none() {
            let token = raw.trim();
            if token.is_empty() {
                return Err(DomainError::new(
                    ErrorCode::Unauthorized,
                    "Missing credential token",
                ));
            }
            self.credentials = Some(token.to_string());
            return Ok(None);
        }
        if self.retrieval_pattern.is_none() {
            self.retrieval_pattern =
                Some(RetrievalPattern::from_client(raw, &self.default_pattern));
            return Ok(None);
        }

        let target = ConversationTarget::parse(raw)?;
        // First two are guaranteed present by the arms above.
        let credentials = self.credentials.clone().unwrap_or_default();
        let retrieval_pattern = self
            .retrieval_pattern
            .clone()
            .unwrap_or_else(|| self.default_pattern.clone());
        Ok(Some(HandshakeState {
            credentials,
            retrieval_pattern,
            target,
        }))
    }
}
