//! Answering engine port.
//!
//! The engine is an external collaborator: the session service carries its
//! inputs and outputs but never its logic. Replies are raw payloads that the
//! session layer classifies exactly once at the boundary (see
//! `domain::session::ResponseFrame`).

use async_trait::async_trait;

use crate::domain::foundation::{ConversationId, DomainError};
use crate::domain::session::RetrievalPattern;

/// One question forwarded to the answering engine.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    /// Which backing graph to query.
    pub graph: String,
    pub question: String,
    pub retrieval_pattern: RetrievalPattern,
    pub conversation_id: ConversationId,
}

/// Port for the external answering engine.
#[async_trait]
pub trait AnswerEngine: Send + Sync {
    /// Returns the raw response payloads produced for one turn, in order.
    ///
    /// # Errors
    ///
    /// - `UpstreamTimeout` when the engine is unreachable or unresponsive.
    async fn ask(&self, request: &AnswerRequest) -> Result<Vec<String>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_engine_is_object_safe() {
        fn _accepts_dyn(_engine: &dyn AnswerEngine) {}
    }
}
