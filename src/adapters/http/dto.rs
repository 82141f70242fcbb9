//! HTTP DTOs for the history and feedback endpoints.
//!
//! These types decouple the HTTP API from domain types, allowing independent
//! evolution.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::{ConversationSummary, FeedbackValue, Message};

// ════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════

/// Request to attach feedback to a message.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub feedback: FeedbackValue,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Query parameters for listing conversations.
#[derive(Debug, Clone, Deserialize)]
pub struct ListConversationsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

// ════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════

/// One message in a history response.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub role: String,
    pub content: String,
    pub feedback: FeedbackValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_sources: Option<serde_json::Value>,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id.to_string(),
            parent_id: message.parent_id.map(|id| id.to_string()),
            role: match message.role {
                crate::domain::conversation::MessageRole::User => "user".to_string(),
                crate::domain::conversation::MessageRole::Assistant => "assistant".to_string(),
            },
            content: message.content,
            feedback: message.feedback.value,
            query_sources: message.query_sources,
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// Full history of one conversation.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub conversation_id: String,
    pub messages: Vec<MessageResponse>,
}

/// One entry in a conversation listing.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummaryResponse {
    pub conversation_id: String,
    pub created_at: String,
    pub message_count: usize,
    pub last_activity: String,
}

impl From<ConversationSummary> for ConversationSummaryResponse {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            conversation_id: summary.conversation_id.to_string(),
            created_at: summary.created_at.to_rfc3339(),
            message_count: summary.message_count,
            last_activity: summary.last_activity.to_rfc3339(),
        }
    }
}

/// Listing of recent conversations.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<ConversationSummaryResponse>,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}
