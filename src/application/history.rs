//! Read-side queries over stored conversations.
//!
//! Every read goes through the access policy first. A denied read and a
//! missing conversation both surface as `Forbidden` so conversation ids
//! cannot be probed through this surface.

use std::sync::Arc;

use crate::domain::access::{AccessPolicy, Operation};
use crate::domain::conversation::{ConversationSummary, Message};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode};
use crate::ports::{
    AuditLog, AuditOperation, AuditOutcome, AuditRecord, Caller, SessionStore,
};

/// Default page size for conversation listings.
const DEFAULT_LIST_LIMIT: usize = 50;

/// Query handlers for conversation history.
pub struct HistoryQueries {
    store: Arc<dyn SessionStore>,
    policy: Arc<AccessPolicy>,
    audit: Arc<dyn AuditLog>,
}

impl HistoryQueries {
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

    /// Full message history of one conversation, oldest first.
    pub async fn get_conversation(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, DomainError> {
        if !self
            .policy
            .authorize(&caller.roles, Operation::Read, Some(conversation_id))
            .is_allowed()
        {
            self.audit_read(caller, conversation_id, AuditOutcome::Denied)
                .await;
            return Err(DomainError::forbidden());
        }
        match self.store.get_conversation(conversation_id).await {
            Ok(messages) => {
                self.audit_read(caller, conversation_id, AuditOutcome::Ok)
                    .await;
                Ok(messages)
            }
            Err(e) if e.code() == ErrorCode::ConversationNotFound => {
                // Indistinguishable from a denied read at the surface.
                self.audit_read(caller, conversation_id, AuditOutcome::Denied)
                    .await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Recent conversation summaries, most recently active first.
    pub async fn list_recent(
        &self,
        caller: &Caller,
        limit: Option<usize>,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
        if !self
            .policy
            .authorize(&caller.roles, Operation::Read, None)
            .is_allowed()
        {
            self.record_audit(
                AuditRecord::new(AuditOperation::ListConversations, AuditOutcome::Denied)
                    .with_user(caller.user_id.clone()),
            )
            .await;
            return Err(DomainError::forbidden());
        }
        let summaries = self
            .store
            .list_recent(limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .await?;
        self.record_audit(
            AuditRecord::new(AuditOperation::ListConversations, AuditOutcome::Ok)
                .with_user(caller.user_id.clone()),
        )
        .await;
        Ok(summaries)
    }

    async fn audit_read(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
        outcome: AuditOutcome,
    ) {
        self.record_audit(
            AuditRecord::new(AuditOperation::ReadHistory, outcome)
                .with_user(caller.user_id.clone())
                .with_conversation(conversation_id.clone()),
        )
        .await;
    }

    async fn record_audit(&self, record: AuditRecord) {
        if let Err(e) = self.audit.record(record).await {
            tracing::warn!(error = %e, "audit write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::audit::NoopAuditLog;
    use crate::adapters::store::InMemorySessionStore;
    use crate::domain::access::Role;
    use crate::domain::conversation::Message;
    use crate::domain::foundation::UserId;

    fn caller(role: &str) -> Caller {
        Caller::new(UserId::new("u1").unwrap(), vec![Role::new(role)])
    }

    fn queries(store: Arc<InMemorySessionStore>) -> HistoryQueries {
        HistoryQueries::new(
            store,
            Arc::new(AccessPolicy::from_names(["analyst"])),
            Arc::new(NoopAuditLog),
        )
    }

    #[tokio::test]
    async fn allowed_role_reads_history_in_order() {
        let store = Arc::new(InMemorySessionStore::new());
        let id = store.create_conversation().await.unwrap();
        store
            .append_message(&id, Message::user(id.clone(), None, "q"))
            .await
            .unwrap();
        let queries = queries(store);

        let messages = queries
            .get_conversation(&caller("analyst"), &id)
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[tokio::test]
    async fn denied_role_and_missing_conversation_look_alike() {
        let store = Arc::new(InMemorySessionStore::new());
        let id = store.create_conversation().await.unwrap();
        let queries = queries(store);

        let denied = queries
            .get_conversation(&caller("guest"), &id)
            .await
            .unwrap_err();
        let missing = queries
            .get_conversation(&caller("analyst"), &ConversationId::new("c-404").unwrap())
            .await
            .unwrap_err();

        // Same surface rendering: both map to 403 with no resource detail.
        assert!(matches!(
            denied.code(),
            ErrorCode::Forbidden | ErrorCode::ConversationNotFound
        ));
        assert!(matches!(
            missing.code(),
            ErrorCode::Forbidden | ErrorCode::ConversationNotFound
        ));
    }

    #[tokio::test]
    async fn list_recent_requires_an_allowed_role() {
        let store = Arc::new(InMemorySessionStore::new());
        store.create_conversation().await.unwrap();
        let queries = queries(store);

        let err = queries
            .list_recent(&caller("guest"), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let listed = queries.list_recent(&caller("analyst"), None).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
