//! Conversation aggregate.
//!
//! A conversation is append-only: once finalized, messages are never deleted
//! or reordered, and only their feedback fields may change afterwards. This
//! lets any client (including a reconnecting browser tab) reconstruct exact
//! prior state from a replay.

use serde::{Deserialize, Serialize};

use super::{Feedback, Message};
use crate::domain::foundation::{ConversationId, DomainError, MessageId, Timestamp};

/// A durable, ordered sequence of messages identified by one id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    created_at: Timestamp,
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    pub fn new(id: ConversationId) -> Self {
        Self {
            id,
            created_at: Timestamp::now(),
            messages: Vec::new(),
        }
    }

    /// Reconstructs a conversation from persisted parts.
    ///
    /// Messages must already be in append order.
    pub fn from_parts(
        id: ConversationId,
        created_at: Timestamp,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            id,
            created_at,
            messages,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Messages in append order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Id of the most recently appended message, if any.
    pub fn last_message_id(&self) -> Option<MessageId> {
        self.messages.last().map(|m| m.id)
    }

    /// Appends a message.
    ///
    /// # Errors
    ///
    /// - `InternalError` if the message belongs to a different conversation
    ///   or reuses an existing message id; both indicate a caller bug, not
    ///   client input.
    pub fn append(&mut self, message: Message) -> Result<(), DomainError> {
        if message.conversation_id != self.id {
            return Err(DomainError::internal(format!(
                "message for conversation {} appended to {}",
                message.conversation_id, self.id
            )));
        }
        if self.messages.iter().any(|m| m.id == message.id) {
            return Err(DomainError::internal(format!(
                "duplicate message id {} in conversation {}",
                message.id, self.id
            )));
        }
        self.messages.push(message);
        Ok(())
    }

    /// Updates only the feedback fields of an existing message.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound` if the id does not exist within this conversation.
    pub fn record_feedback(
        &mut self,
        message_id: &MessageId,
        feedback: Feedback,
    ) -> Result<(), DomainError> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == *message_id)
            .ok_or_else(|| DomainError::message_not_found(message_id))?;
        message.feedback = feedback;
        Ok(())
    }

    /// Lightweight summary for listing endpoints.
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            conversation_id: self.id.clone(),
            created_at: self.created_at,
            message_count: self.messages.len(),
            last_activity: self
                .messages
                .last()
                .map(|m| m.created_at)
                .unwrap_or(self.created_at),
        }
    }
}

/// Summary of a conversation for list-recent responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: ConversationId,
    pub created_at: Timestamp,
    pub message_count: usize,
    pub last_activity: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::conversation::FeedbackValue;

    fn conversation() -> Conversation {
        Conversation::new(ConversationId::new("c-100").unwrap())
    }

    #[test]
    fn append_preserves_order() {
        let mut conv = conversation();
        let first = Message::user(conv.id().clone(), None, "first");
        let second = Message::assistant(conv.id().clone(), Some(first.id), "second", None);
        conv.append(first.clone()).unwrap();
        conv.append(second.clone()).unwrap();

        let contents: Vec<&str> = conv.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(conv.last_message_id(), Some(second.id));
    }

    #[test]
    fn append_rejects_foreign_conversation_id() {
        let mut conv = conversation();
        let other = ConversationId::new("c-999").unwrap();
        let msg = Message::user(other, None, "lost");
        assert!(conv.append(msg).is_err());
    }

    #[test]
    fn append_rejects_duplicate_message_id() {
        let mut conv = conversation();
        let msg = Message::user(conv.id().clone(), None, "once");
        conv.append(msg.clone()).unwrap();
        assert!(conv.append(msg).is_err());
    }

    #[test]
    fn record_feedback_updates_only_feedback_fields() {
        let mut conv = conversation();
        let question = Message::user(conv.id().clone(), None, "q");
        let answer = Message::assistant(conv.id().clone(), Some(question.id), "a", None);
        let answer_id = answer.id;
        conv.append(question.clone()).unwrap();
        conv.append(answer.clone()).unwrap();

        conv.record_feedback(&answer_id, Feedback::new(FeedbackValue::Like))
            .unwrap();

        let stored = &conv.messages()[1];
        assert_eq!(stored.feedback.value, FeedbackValue::Like);
        assert_eq!(stored.content, "a");
        assert_eq!(stored.id, answer_id);
        assert_eq!(conv.messages()[0], question);
    }

    #[test]
    fn record_feedback_fails_for_unknown_message() {
        let mut conv = conversation();
        let err = conv
            .record_feedback(&MessageId::new(), Feedback::new(FeedbackValue::Dislike))
            .unwrap_err();
        assert_eq!(
            err.code(),
            crate::domain::foundation::ErrorCode::MessageNotFound
        );
    }

    #[test]
    fn summary_reflects_message_count_and_last_activity() {
        let mut conv = conversation();
        assert_eq!(conv.summary().message_count, 0);
        let msg = Message::user(conv.id().clone(), None, "q");
        let created = msg.created_at;
        conv.append(msg).unwrap();

        let summary = conv.summary();
        assert_eq!(summary.message_count, 1);
        assert_eq!(summary.last_activity, created);
    }
}
