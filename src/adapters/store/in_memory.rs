//! In-memory Session Store.
//!
//! Used by tests and development. The map-wide write lock serializes
//! concurrent appends, so appends to one conversation never interleave.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::conversation::{Conversation, ConversationSummary, Feedback, Message};
use crate::domain::foundation::{ConversationId, DomainError, MessageId};
use crate::ports::SessionStore;

/// In-memory store for conversations.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    conversations: RwLock<HashMap<ConversationId, Conversation>>,
}

impl InMemorySessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a conversation with a known id (useful for tests).
    pub async fn seed(&self, conversation: Conversation) {
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id().clone(), conversation);
    }

    /// Number of stored conversations.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_conversation(&self) -> Result<ConversationId, DomainError> {
        let id = ConversationId::generate();
        let mut conversations = self.conversations.write().await;
        conversations.insert(id.clone(), Conversation::new(id.clone()));
        Ok(id)
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        message: Message,
    ) -> Result<(), DomainError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| DomainError::conversation_not_found(conversation_id))?;
        conversation.append(message)
    }

    async fn get_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError> {
        let conversations = self.conversations.read().await;
        let conversation = conversations
            .get(conversation_id)
            .ok_or_else(|| DomainError::conversation_not_found(conversation_id))?;
        Ok(conversation.messages().to_vec())
    }

    async fn record_feedback(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        feedback: Feedback,
    ) -> Result<(), DomainError> {
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| DomainError::conversation_not_found(conversation_id))?;
        conversation.record_feedback(message_id, feedback)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ConversationSummary>, DomainError> {
        let conversations = self.conversations.read().await;
        let mut summaries: Vec<ConversationSummary> =
            conversations.values().map(|c| c.summary()).collect();
        summaries.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
        summaries.truncate(limit);
        Ok(summaries)
    }
}
