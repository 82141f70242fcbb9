//! Session Store port: durable record of conversations and messages.
//!
//! History is append-only: no message is ever deleted or reordered after
//! being finalized, and only feedback fields may be mutated afterwards, so
//! the semantic content of an answer is never silently altered.
//!
//! Implementations must be safe for concurrent use by many connections and
//! must serialize concurrent appends to the *same* conversation id: appends
//! never interleave or truncate each other.

use async_trait::async_trait;

use crate::domain::conversation::{ConversationSummary, Feedback, Message};
use crate::domain::foundation::{ConversationId, DomainError, MessageId};

/// Port for conversation persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Allocates a fresh, globally unique conversation id.
    ///
    /// # Errors
    ///
    /// - `StorageUnavailable` on storage failure.
    async fn create_conversation(&self) -> Result<ConversationId, DomainError>;

    /// Appends a message; durably recorded before the call returns.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the id is unknown.
    /// - `StorageUnavailable` on I/O failure.
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> Result<(), DomainError>;

    /// Returns messages in append order, stable across repeated reads.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the id is unknown.
    /// - `StorageUnavailable` on I/O failure.
    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError>;

    /// Updates only the feedback/comment fields of an existing message.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation is unknown.
    /// - `MessageNotFound` if the message id does not exist within it.
    /// - `StorageUnavailable` on I/O failure.
    async fn record_feedback(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        feedback: Feedback,
    ) -> Result<(), DomainError>;

    /// Lists the most recently active conversations, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<ConversationSummary>, DomainError>;
}
