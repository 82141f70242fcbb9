//! Structured request-audit log port.
//!
//! Separate from the operational log: every handshake, turn, denial, and
//! failure produces one structured record, written to a dedicated path
//! configured at start-up.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, DomainError, Timestamp, UserId};

/// What was attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOperation {
    Handshake,
    Question,
    Answer,
    Feedback,
    ReadHistory,
    ListConversations,
    Close,
}

/// How it ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Ok,
    Denied,
    Failed,
}

/// One audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: Timestamp,
    pub operation: AuditOperation,
    pub outcome: AuditOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditRecord {
    pub fn new(operation: AuditOperation, outcome: AuditOutcome) -> Self {
        Self {
            timestamp: Timestamp::now(),
            operation,
            outcome,
            user_id: None,
            conversation_id: None,
            detail: None,
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Port for the request-audit log.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Records one audit entry. Failures are reported but callers treat the
    /// audit path as best-effort: a failed audit write never fails the turn.
    async fn record(&self, record: AuditRecord) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_record_builder_sets_optional_fields() {
        let record = AuditRecord::new(AuditOperation::Question, AuditOutcome::Denied)
            .with_user(UserId::new("u1").unwrap())
            .with_conversation(ConversationId::new("c-100").unwrap())
            .with_detail("no allow-listed role");

        assert_eq!(record.operation, AuditOperation::Question);
        assert_eq!(record.outcome, AuditOutcome::Denied);
        assert_eq!(record.user_id.unwrap().as_str(), "u1");
        assert_eq!(record.conversation_id.unwrap().as_str(), "c-100");
    }

    #[test]
    fn audit_record_serializes_snake_case() {
        let record = AuditRecord::new(AuditOperation::ReadHistory, AuditOutcome::Ok);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["operation"], "read_history");
        assert_eq!(json["outcome"], "ok");
    }
}
