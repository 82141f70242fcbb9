//! Message value types.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, MessageId, Timestamp};

/// Role of the message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

/// Whether a message is a finalized answer or an ephemeral progress fragment.
///
/// A `Progress` message is always superseded by exactly one `Final` message
/// with the same parent before the turn is complete; clients replace it in
/// place rather than appending both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Final,
    Progress,
}

/// User feedback value on an assistant message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackValue {
    #[default]
    None,
    Like,
    Dislike,
}

/// Feedback on a message: a value plus an optional free-text comment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Feedback {
    pub value: FeedbackValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Feedback {
    /// Feedback with no value set.
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates feedback with the given value and no comment.
    pub fn new(value: FeedbackValue) -> Self {
        Self {
            value,
            comment: None,
        }
    }

    /// Attaches a free-text comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// A single message within a conversation.
///
/// `query_sources` is an opaque payload produced by the external answering
/// engine and is passed through unmodified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Back-reference to the owning conversation.
    pub conversation_id: ConversationId,
    /// Unique within the conversation.
    pub id: MessageId,
    /// The message this one replies to; None for the first message.
    pub parent_id: Option<MessageId>,
    pub role: MessageRole,
    pub content: String,
    pub kind: ResponseKind,
    #[serde(default)]
    pub feedback: Feedback,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_sources: Option<serde_json::Value>,
    pub created_at: Timestamp,
}

impl Message {
    /// Creates a finalized user question.
    pub fn user(
        conversation_id: ConversationId,
        parent_id: Option<MessageId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            id: MessageId::new(),
            parent_id,
            role: MessageRole::User,
            content: content.into(),
            kind: ResponseKind::Final,
            feedback: Feedback::none(),
            query_sources: None,
            created_at: Timestamp::now(),
        }
    }

    /// Creates a finalized assistant answer.
    pub fn assistant(
        conversation_id: ConversationId,
        parent_id: Option<MessageId>,
        content: impl Into<String>,
        query_sources: Option<serde_json::Value>,
    ) -> Self {
        Self {
            conversation_id,
            id: MessageId::new(),
            parent_id,
            role: MessageRole::Assistant,
            content: content.into(),
            kind: ResponseKind::Final,
            feedback: Feedback::none(),
            query_sources,
            created_at: Timestamp::now(),
        }
    }

    /// Creates an ephemeral assistant progress fragment.
    pub fn progress(
        conversation_id: ConversationId,
        parent_id: Option<MessageId>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id,
            id: MessageId::new(),
            parent_id,
            role: MessageRole::Assistant,
            content: content.into(),
            kind: ResponseKind::Progress,
            feedback: Feedback::none(),
            query_sources: None,
            created_at: Timestamp::now(),
        }
    }

    /// Returns true if this is a finalized message.
    pub fn is_final(&self) -> bool {
        self.kind == ResponseKind::Final
    }
}
