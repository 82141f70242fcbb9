//! Feedback recording on stored answers.

use std::sync::Arc;

use crate::domain::access::{AccessPolicy, Operation};
use crate::domain::conversation::Feedback;
use crate::domain::foundation::{ConversationId, DomainError, MessageId};
use crate::ports::{
    AuditLog, AuditOperation, AuditOutcome, AuditRecord, Caller, SessionStore,
};

/// Request to attach feedback to one message.
#[derive(Debug, Clone)]
pub struct FeedbackCommand {
    pub conversation_id: ConversationId,
    pub message_id: MessageId,
    pub feedback: Feedback,
}

/// Handler for feedback commands.
pub struct FeedbackHandler {
    store: Arc<dyn SessionStore>,
    policy: Arc<AccessPolicy>,
    audit: Arc<dyn AuditLog>,
}

impl FeedbackHandler {
    pub fn new(
        store: Arc<dyn SessionStore>,
        policy: Arc<AccessPolicy>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            store,
            policy,
            audit,
        }
    }

    /// Records feedback; requires write access to the conversation.
    pub async fn handle(&self, caller: &Caller, command: FeedbackCommand) -> Result<(), DomainError> {
        let allowed = self
            .policy
            .authorize(
                &caller.roles,
                Operation::Write,
                Some(&command.conversation_id),
            )
            .is_allowed();
        if !allowed {
            self.record_audit(caller, &command, AuditOutcome::Denied).await;
            return Err(DomainError::forbidden());
        }

        let result = self
            .store
            .record_feedback(
                &command.conversation_id,
                &command.message_id,
                command.feedback.clone(),
            )
            .await;
        let outcome = if result.is_ok() {
            AuditOutcome::Ok
        } else {
            AuditOutcome::Failed
        };
        self.record_audit(caller, &command, outcome).await;
        result
    }

    async fn record_audit(&self, caller: &Caller, command: &FeedbackCommand, outcome: AuditOutcome) {
        let record = AuditRecord::new(AuditOperation::Feedback, outcome)
            .with_user(caller.user_id.clone())
            .with_conversation(command.conversation_id.clone());
        if let Err(e) = self.audit.record(record).await {
            tracing::warn!(error = %e, "audit write failed");
        }
    }
}
