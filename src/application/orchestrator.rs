//! Per-connection session orchestrator.
//!
//! Runs one connection end to end: handshake intake, credential verification,
//! conversation binding, then the turn loop. All IO (store, engine, transport,
//! audit) happens here; sequencing decisions live in the synchronous
//! [`SessionMachine`].
//!
//! Turn flow: the user question is persisted first, a progress placeholder is
//! streamed, then the engine call is raced against the per-turn deadline and
//! client disconnect. Placeholder and timeout-notice content is never
//! persisted; the store holds only user questions and final answers.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::domain::access::{AccessPolicy, Operation};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, MessageId};
use crate::domain::session::{
    ConversationTarget, HandshakeState, ResponseFrame, RetrievalPattern, ServerFrame,
    SessionEffect, SessionMachine,
};
use crate::ports::{
    AnswerEngine, AnswerRequest, AuditLog, AuditOperation, AuditOutcome, AuditRecord,
    AuthVerifier, Caller, Inbound, MessageTransport, SessionStore,
};

/// Per-connection tunables.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Deadline for one engine turn, measured from dispatch.
    pub turn_timeout: Duration,
    /// Pattern used when the client leaves the handshake value empty.
    pub default_retrieval_pattern: RetrievalPattern,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(60),
            default_retrieval_pattern: RetrievalPattern::default(),
        }
    }
}

/// How a turn's wait phase resolved.
enum TurnWait {
    Engine(Result<Vec<String>, DomainError>),
    TimedOut,
    Disconnected,
}

/// Whether the connection loop continues after a turn.
enum TurnFlow {
    Continue,
    Disconnected,
}

/// Drives one client connection against the ports.
pub struct SessionOrchestrator {
    store: Arc<dyn SessionStore>,
    policy: Arc<AccessPolicy>,
    engine: Arc<dyn AnswerEngine>,
    auth: Arc<dyn AuthVerifier>,
    audit: Arc<dyn AuditLog>,
    settings: SessionSettings,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        policy: Arc<AccessPolicy>,
        engine: Arc<dyn AnswerEngine>,
        auth: Arc<dyn AuthVerifier>,
        audit: Arc<dyn AuditLog>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            store,
            policy,
            engine,
            auth,
            audit,
            settings,
        }
    }

    /// Runs the connection to completion. Never panics; internal failures
    /// surface to the client as an error frame before the connection ends.
    pub async fn run<T: MessageTransport>(&self, mut transport: T, graph: impl Into<String>) {
        let graph = graph.into();
        if let Err(error) = self.drive(&mut transport, &graph).await {
            warn!(code = %error.code(), error = %error, "session ended abnormally");
            let frame = ServerFrame::error(ErrorCode::InternalError, "Internal error");
            let _ = transport.send(frame).await;
        }
    }

    async fn drive<T: MessageTransport>(
        &self,
        transport: &mut T,
        graph: &str,
    ) -> Result<(), DomainError> {
        let mut machine = SessionMachine::new(self.settings.default_retrieval_pattern.clone());
        machine.on_connected()?;

        let handshake = match self.collect_handshake(transport, &mut machine).await? {
            Some(handshake) => handshake,
            None => return Ok(()),
        };

        let caller = match self.auth.verify(&handshake.credentials).await {
            Ok(caller) => caller,
            Err(error) => {
                debug!(code = %error.code(), "credential verification failed");
                let frame = ServerFrame::error(ErrorCode::Unauthorized, "Credential rejected");
                let _ = transport.send(frame).await;
                machine.fault();
                self.record_audit(AuditRecord::new(
                    AuditOperation::Handshake,
                    AuditOutcome::Denied,
                ))
                .await;
                return Ok(());
            }
        };

        let bound = self
            .resolve_conversation(transport, &caller, &handshake.target)
            .await?;
        let (conversation_id, history_tail) = match bound {
            Some(bound) => bound,
            None => {
                machine.fault();
                return Ok(());
            }
        };
        machine.bind_conversation(conversation_id.clone(), history_tail)?;
        transport
            .send(ServerFrame::ConversationAck {
                conversation_id: conversation_id.clone(),
            })
            .await?;
        info!(conversation_id = %conversation_id, user_id = %caller.user_id, "session established");
        self.record_audit(
            AuditRecord::new(AuditOperation::Handshake, AuditOutcome::Ok)
                .with_user(caller.user_id.clone())
                .with_conversation(conversation_id.clone()),
        )
        .await;

        loop {
            let raw = match transport.recv().await {
                Inbound::Text(raw) => raw,
                Inbound::Closed(_) => break,
            };
            let question = raw.trim().to_string();
            if question.is_empty() {
                let frame =
                    ServerFrame::error(ErrorCode::ValidationFailed, "Question cannot be empty");
                transport.send(frame).await?;
                continue;
            }
            let flow = self
                .run_turn(
                    transport,
                    &mut machine,
                    &caller,
                    graph,
                    &handshake.retrieval_pattern,
                    &conversation_id,
                    &question,
                )
                .await?;
            if let TurnFlow::Disconnected = flow {
                break;
            }
        }

        machine.close();
        self.record_audit(
            AuditRecord::new(AuditOperation::Close, AuditOutcome::Ok)
                .with_user(caller.user_id.clone())
                .with_conversation(conversation_id),
        )
        .await;
        Ok(())
    }

    /// Collects the three handshake values. `None` means the connection ended
    /// during the handshake (closed or rejected).
    async fn collect_handshake<T: MessageTransport>(
        &self,
        transport: &mut T,
        machine: &mut SessionMachine,
    ) -> Result<Option<HandshakeState>, DomainError> {
        loop {
            match transport.recv().await {
                Inbound::Text(raw) => match machine.offer_handshake(&raw) {
                    Ok(Some(handshake)) => return Ok(Some(handshake)),
                    Ok(None) => {}
                    Err(error) => {
                        let frame = ServerFrame::error(error.code(), error.message.clone());
                        let _ = transport.send(frame).await;
                        machine.fault();
                        self.record_audit(AuditRecord::new(
                            AuditOperation::Handshake,
                            AuditOutcome::Denied,
                        ))
                        .await;
                        return Ok(None);
                    }
                },
                Inbound::Closed(_) => {
                    machine.close();
                    return Ok(None);
                }
            }
        }
    }

    /// Resolves the handshake target to a conversation id and history tail.
    ///
    /// Denied access and a missing conversation send the identical frame, so
    /// a caller cannot distinguish them. `None` means the handshake failed
    /// and the session must fault.
    async fn resolve_conversation<T: MessageTransport>(
        &self,
        transport: &mut T,
        caller: &Caller,
        target: &ConversationTarget,
    ) -> Result<Option<(ConversationId, Option<MessageId>)>, DomainError> {
        match target {
            ConversationTarget::New => {
                if !self
                    .policy
                    .authorize(&caller.roles, Operation::Write, None)
                    .is_allowed()
                {
                    self.deny_handshake(transport, caller).await?;
                    return Ok(None);
                }
                let id = match self.store.create_conversation().await {
                    Ok(id) => id,
                    Err(error) => {
                        self.fail_handshake(
                            transport,
                            caller,
                            error,
                            "Could not allocate a conversation",
                        )
                        .await;
                        return Ok(None);
                    }
                };
                Ok(Some((id, None)))
            }
            ConversationTarget::Existing(id) => {
                if !self
                    .policy
                    .authorize(&caller.roles, Operation::Read, Some(id))
                    .is_allowed()
                {
                    self.deny_handshake(transport, caller).await?;
                    return Ok(None);
                }
                match self.store.get_conversation(id).await {
                    Ok(messages) => {
                        let tail = messages.last().map(|m| m.id);
                        Ok(Some((id.clone(), tail)))
                    }
                    Err(error) if error.code() == ErrorCode::ConversationNotFound => {
                        self.deny_handshake(transport, caller).await?;
                        Ok(None)
                    }
                    Err(error) => {
                        self.fail_handshake(
                            transport,
                            caller,
                            error,
                            "Could not load the conversation",
                        )
                        .await;
                        Ok(None)
                    }
                }
            }
        }
    }

    /// Storage failure during the handshake: the client has already been
    /// told, so the session ends without a trailing internal-error frame.
    async fn fail_handshake<T: MessageTransport>(
        &self,
        transport: &mut T,
        caller: &Caller,
        error: DomainError,
        notice: &str,
    ) {
        warn!(code = %error.code(), error = %error, "handshake failed on storage");
        let frame = ServerFrame::error(ErrorCode::StorageUnavailable, notice);
        let _ = transport.send(frame).await;
        self.record_audit(
            AuditRecord::new(AuditOperation::Handshake, AuditOutcome::Failed)
                .with_user(caller.user_id.clone()),
        )
        .await;
    }

    async fn deny_handshake<T: MessageTransport>(
        &self,
        transport: &mut T,
        caller: &Caller,
    ) -> Result<(), DomainError> {
        let denied = DomainError::forbidden();
        transport
            .send(ServerFrame::error(denied.code(), denied.message))
            .await?;
        self.record_audit(
            AuditRecord::new(AuditOperation::Handshake, AuditOutcome::Denied)
                .with_user(caller.user_id.clone()),
        )
        .await;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_turn<T: MessageTransport>(
        &self,
        transport: &mut T,
        machine: &mut SessionMachine,
        caller: &Caller,
        graph: &str,
        retrieval_pattern: &RetrievalPattern,
        conversation_id: &ConversationId,
        question: &str,
    ) -> Result<TurnFlow, DomainError> {
        if !self
            .policy
            .authorize(&caller.roles, Operation::Write, Some(conversation_id))
            .is_allowed()
        {
            // Denied before any persistence or engine traffic.
            let denied = DomainError::forbidden();
            transport
                .send(ServerFrame::error(denied.code(), denied.message))
                .await?;
            self.record_audit(
                AuditRecord::new(AuditOperation::Question, AuditOutcome::Denied)
                    .with_user(caller.user_id.clone())
                    .with_conversation(conversation_id.clone()),
            )
            .await;
            return Ok(TurnFlow::Continue);
        }

        let turn = machine.begin_turn(question)?;
        if let Err(error) = self
            .store
            .append_message(conversation_id, turn.user_message.clone())
            .await
        {
            warn!(error = %error, "failed to persist user question");
            machine.fail_turn();
            let frame = ServerFrame::error(
                ErrorCode::StorageUnavailable,
                "Could not record the question",
            );
            transport.send(frame).await?;
            self.record_audit(
                AuditRecord::new(AuditOperation::Question, AuditOutcome::Failed)
                    .with_user(caller.user_id.clone())
                    .with_conversation(conversation_id.clone()),
            )
            .await;
            return Ok(TurnFlow::Continue);
        }
        self.record_audit(
            AuditRecord::new(AuditOperation::Question, AuditOutcome::Ok)
                .with_user(caller.user_id.clone())
                .with_conversation(conversation_id.clone()),
        )
        .await;
        transport
            .send(ServerFrame::progress(
                turn.placeholder.id,
                turn.placeholder.content.clone(),
            ))
            .await?;

        let request = AnswerRequest {
            graph: graph.to_string(),
            question: question.to_string(),
            retrieval_pattern: retrieval_pattern.clone(),
            conversation_id: conversation_id.clone(),
        };
        let engine = Arc::clone(&self.engine);
        let mut engine_call = Box::pin(async move { engine.ask(&request).await });
        let deadline = tokio::time::sleep(self.settings.turn_timeout);
        tokio::pin!(deadline);

        // Dropping out of this loop cancels the in-flight engine call.
        let wait = loop {
            tokio::select! {
                result = &mut engine_call => break TurnWait::Engine(result),
                _ = &mut deadline => break TurnWait::TimedOut,
                inbound = transport.recv() => match inbound {
                    Inbound::Text(_) => {}
                    Inbound::Closed(_) => break TurnWait::Disconnected,
                },
            }
            // Only a question received mid-turn falls through the select.
            // One turn is in flight per connection; tell the client so the
            // input can be re-offered instead of vanishing.
            warn!(conversation_id = %conversation_id, "question received mid-turn, signalling busy");
            let frame = ServerFrame::error(
                ErrorCode::ValidationFailed,
                "A turn is already in flight; resend the question after the current answer",
            );
            transport.send(frame).await?;
        };

        match wait {
            TurnWait::Engine(Ok(frames)) => {
                for raw in frames {
                    match ResponseFrame::parse(&raw) {
                        Ok(frame) => {
                            let effect = machine.apply_frame(frame)?;
                            self.apply_effect(transport, caller, conversation_id, effect)
                                .await?;
                        }
                        Err(malformed) => {
                            warn!(conversation_id = %conversation_id, "unparseable engine payload, degrading to literal text");
                            let effect = machine.apply_malformed(malformed);
                            self.apply_effect(transport, caller, conversation_id, effect)
                                .await?;
                        }
                    }
                }
                if let Some(pending) = machine.fail_turn() {
                    // The engine finished without producing a final answer.
                    let frame = ServerFrame::turn_error(
                        ErrorCode::UpstreamTimeout,
                        "The answering service produced no answer",
                        Some(pending.placeholder_id),
                    );
                    transport.send(frame).await?;
                    self.audit_answer(caller, conversation_id, AuditOutcome::Failed)
                        .await;
                }
                Ok(TurnFlow::Continue)
            }
            TurnWait::Engine(Err(error)) => {
                warn!(error = %error, "answer engine call failed");
                // The outstanding placeholder is named so the client can
                // terminate it in place.
                let pending = machine.fail_turn();
                let frame = ServerFrame::turn_error(
                    ErrorCode::UpstreamTimeout,
                    "The answering service is unavailable",
                    pending.map(|p| p.placeholder_id),
                );
                transport.send(frame).await?;
                self.audit_answer(caller, conversation_id, AuditOutcome::Failed)
                    .await;
                Ok(TurnFlow::Continue)
            }
            TurnWait::TimedOut => {
                let pending = machine.fail_turn();
                let frame = ServerFrame::turn_error(
                    ErrorCode::UpstreamTimeout,
                    "No answer arrived within the allotted time",
                    pending.map(|p| p.placeholder_id),
                );
                transport.send(frame).await?;
                self.audit_answer(caller, conversation_id, AuditOutcome::Failed)
                    .await;
                Ok(TurnFlow::Continue)
            }
            TurnWait::Disconnected => {
                machine.fail_turn();
                Ok(TurnFlow::Disconnected)
            }
        }
    }

    async fn apply_effect<T: MessageTransport>(
        &self,
        transport: &mut T,
        caller: &Caller,
        conversation_id: &ConversationId,
        effect: SessionEffect,
    ) -> Result<(), DomainError> {
        match effect {
            SessionEffect::ReplacePlaceholder { message, .. }
            | SessionEffect::AppendAnswer { message } => {
                if let Err(error) = self
                    .store
                    .append_message(conversation_id, message.clone())
                    .await
                {
                    warn!(error = %error, "failed to persist final answer");
                    let frame = ServerFrame::error(
                        ErrorCode::StorageUnavailable,
                        "Could not record the answer",
                    );
                    transport.send(frame).await?;
                    self.audit_answer(caller, conversation_id, AuditOutcome::Failed)
                        .await;
                    return Ok(());
                }
                transport
                    .send(ServerFrame::final_answer(
                        message.id,
                        message.content,
                        message.query_sources,
                    ))
                    .await?;
                self.audit_answer(caller, conversation_id, AuditOutcome::Ok)
                    .await;
            }
            SessionEffect::EmitProgress {
                placeholder_id,
                content,
            } => {
                let id = placeholder_id.unwrap_or_else(MessageId::new);
                transport.send(ServerFrame::progress(id, content)).await?;
            }
            SessionEffect::DiscardMetadata { conversation_id } => {
                debug!(conversation_id = %conversation_id, "discarding handshake metadata frame");
            }
        }
        Ok(())
    }

    async fn audit_answer(
        &self,
        caller: &Caller,
        conversation_id: &ConversationId,
        outcome: AuditOutcome,
    ) {
        self.record_audit(
            AuditRecord::new(AuditOperation::Answer, outcome)
                .with_user(caller.user_id.clone())
                .with_conversation(conversation_id.clone()),
        )
        .await;
    }

    async fn record_audit(&self, record: AuditRecord) {
        if let Err(error) = self.audit.record(record).await {
            warn!(error = %error, "audit write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::audit::NoopAuditLog;
    use crate::adapters::engine::MockAnswerEngine;
    use crate::adapters::store::InMemorySessionStore;
    use crate::adapters::transport::{duplex_pair, ClientHandle};
    use crate::adapters::auth::StaticAuthVerifier;
    use crate::domain::access::Role;
    use crate::domain::conversation::{
        ConversationSummary, Feedback, Message, MessageRole, ResponseKind,
    };
    use crate::domain::foundation::UserId;
    use crate::domain::session::AnswerFrame;
    use serde_json::json;

    const TOKEN: &str = "tok-analyst";

    fn analyst() -> Caller {
        Caller::new(UserId::new("u1").unwrap(), vec![Role::new("analyst")])
    }

    fn orchestrator(
        store: Arc<InMemorySessionStore>,
        engine: MockAnswerEngine,
    ) -> SessionOrchestrator {
        SessionOrchestrator::new(
            store,
            Arc::new(AccessPolicy::from_names(["analyst"])),
            Arc::new(engine),
            Arc::new(StaticAuthVerifier::new().with_caller(TOKEN, analyst())),
            Arc::new(NoopAuditLog),
            SessionSettings {
                turn_timeout: Duration::from_millis(500),
                ..SessionSettings::default()
            },
        )
    }

    async fn handshake(client: &ClientHandle) {
        client.send_text(TOKEN);
        client.send_text("");
        client.send_text("new");
    }

    async fn expect_ack(client: &mut ClientHandle) -> ConversationId {
        match client.next_frame().await {
            Some(ServerFrame::ConversationAck { conversation_id }) => conversation_id,
            other => panic!("expected ack, got {:?}", other),
        }
    }

    fn expect_answer(frame: Option<ServerFrame>) -> AnswerFrame {
        match frame {
            Some(ServerFrame::Answer(answer)) => answer,
            other => panic!("expected answer frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn full_turn_streams_placeholder_then_final_answer() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = MockAnswerEngine::new()
            .with_answer(r#"{"content": "There are 42.", "query_sources": {"cypher": "MATCH"}}"#);
        let orchestrator = orchestrator(Arc::clone(&store), engine);
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "Transaction_Fraud").await;
        });

        handshake(&client).await;
        let conversation_id = expect_ack(&mut client).await;
        client.send_text("How many Card vertices are there?");

        let placeholder = expect_answer(client.next_frame().await);
        assert_eq!(placeholder.response_type, Some(ResponseKind::Progress));

        let answer = expect_answer(client.next_frame().await);
        assert_eq!(answer.content, "There are 42.");
        assert!(answer.response_type.is_none());
        assert_eq!(answer.query_sources, Some(json!({"cypher": "MATCH"})));

        client.close();
        server.await.unwrap();

        // Only the question and the final answer were persisted.
        let messages = store.get_conversation(&conversation_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].role, MessageRole::Assistant);
        assert_eq!(messages[1].parent_id, Some(messages[0].id));
    }

    #[tokio::test]
    async fn rejected_credential_faults_the_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let orchestrator = orchestrator(Arc::clone(&store), MockAnswerEngine::new());
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        client.send_text("bad-token");
        client.send_text("");
        client.send_text("new");

        match client.next_frame().await {
            Some(ServerFrame::Error { error }) => assert_eq!(error.code, "UNAUTHORIZED"),
            other => panic!("expected error frame, got {:?}", other),
        }
        server.await.unwrap();
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn denied_question_never_reaches_the_engine() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = MockAnswerEngine::new().with_answer(r#"{"content": "never"}"#);
        let outsider = Caller::new(UserId::new("u2").unwrap(), vec![Role::new("guest")]);
        // Outsider can pass verification but holds no allow-listed role.
        let orchestrator = SessionOrchestrator::new(
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::new(AccessPolicy::from_names(["analyst"])),
            Arc::new(engine.clone()),
            Arc::new(StaticAuthVerifier::new().with_caller("tok-guest", outsider)),
            Arc::new(NoopAuditLog),
            SessionSettings::default(),
        );
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        client.send_text("tok-guest");
        client.send_text("");
        client.send_text("new");

        match client.next_frame().await {
            Some(ServerFrame::Error { error }) => {
                assert_eq!(error.code, "FORBIDDEN");
                assert_eq!(error.message, "Access denied");
            }
            other => panic!("expected forbidden frame, got {:?}", other),
        }
        server.await.unwrap();
        assert_eq!(engine.call_count(), 0);
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn resuming_a_missing_conversation_looks_like_denied_access() {
        let store = Arc::new(InMemorySessionStore::new());
        let orchestrator = orchestrator(Arc::clone(&store), MockAnswerEngine::new());
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        client.send_text(TOKEN);
        client.send_text("");
        client.send_text("c-does-not-exist");

        match client.next_frame().await {
            Some(ServerFrame::Error { error }) => {
                assert_eq!(error.code, "FORBIDDEN");
                assert_eq!(error.message, "Access denied");
            }
            other => panic!("expected forbidden frame, got {:?}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn engine_timeout_ends_the_turn_but_not_the_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = MockAnswerEngine::new()
            .with_delay(Duration::from_secs(30))
            .with_answer(r#"{"content": "too late"}"#)
            .with_answer(r#"{"content": "recovered"}"#);
        let orchestrator = SessionOrchestrator::new(
            Arc::clone(&store) as Arc<dyn SessionStore>,
            Arc::new(AccessPolicy::from_names(["analyst"])),
            Arc::new(engine),
            Arc::new(StaticAuthVerifier::new().with_caller(TOKEN, analyst())),
            Arc::new(NoopAuditLog),
            SessionSettings {
                turn_timeout: Duration::from_millis(50),
                ..SessionSettings::default()
            },
        );
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        handshake(&client).await;
        let conversation_id = expect_ack(&mut client).await;
        client.send_text("slow question");

        let placeholder = expect_answer(client.next_frame().await);
        assert_eq!(placeholder.response_type, Some(ResponseKind::Progress));
        match client.next_frame().await {
            Some(ServerFrame::Error { error }) => {
                assert_eq!(error.code, "UPSTREAM_TIMEOUT");
                // The notice names the placeholder so the client can
                // terminate it in place.
                assert_eq!(error.message_id, Some(placeholder.message_id));
            }
            other => panic!("expected timeout frame, got {:?}", other),
        }

        client.close();
        server.await.unwrap();

        // The question stands; no answer or timeout notice was persisted.
        let messages = store.get_conversation(&conversation_id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn engine_failure_notice_addresses_the_outstanding_placeholder() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine =
            MockAnswerEngine::new().with_error(DomainError::upstream_timeout("engine offline"));
        let orchestrator = orchestrator(Arc::clone(&store), engine);
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        handshake(&client).await;
        expect_ack(&mut client).await;
        client.send_text("q");

        let placeholder = expect_answer(client.next_frame().await);
        match client.next_frame().await {
            Some(ServerFrame::Error { error }) => {
                assert_eq!(error.code, "UPSTREAM_TIMEOUT");
                assert_eq!(error.message_id, Some(placeholder.message_id));
            }
            other => panic!("expected error frame, got {:?}", other),
        }

        client.close();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn question_sent_mid_turn_gets_a_busy_signal_and_can_be_resent() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = MockAnswerEngine::new()
            .with_delay(Duration::from_millis(100))
            .with_answer(r#"{"content": "first answer"}"#)
            .with_answer(r#"{"content": "second answer"}"#);
        let orchestrator = orchestrator(Arc::clone(&store), engine);
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        handshake(&client).await;
        let conversation_id = expect_ack(&mut client).await;
        client.send_text("first question");
        let _placeholder = expect_answer(client.next_frame().await);

        // A question between placeholder and final gets an explicit signal
        // instead of vanishing.
        client.send_text("second question");
        match client.next_frame().await {
            Some(ServerFrame::Error { error }) => assert_eq!(error.code, "VALIDATION_FAILED"),
            other => panic!("expected busy frame, got {:?}", other),
        }

        let first = expect_answer(client.next_frame().await);
        assert_eq!(first.content, "first answer");

        // The resent question runs as a normal turn.
        client.send_text("second question");
        let _placeholder = expect_answer(client.next_frame().await);
        let second = expect_answer(client.next_frame().await);
        assert_eq!(second.content, "second answer");

        client.close();
        server.await.unwrap();

        let messages = store.get_conversation(&conversation_id).await.unwrap();
        assert_eq!(messages.len(), 4);
    }

    #[tokio::test]
    async fn malformed_engine_payload_degrades_to_literal_progress_text() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = MockAnswerEngine::new().with_answer("I could not map that question");
        let orchestrator = orchestrator(Arc::clone(&store), engine);
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        handshake(&client).await;
        let conversation_id = expect_ack(&mut client).await;
        client.send_text("odd question");

        let placeholder = expect_answer(client.next_frame().await);
        let degraded = expect_answer(client.next_frame().await);
        assert_eq!(degraded.message_id, placeholder.message_id);
        assert_eq!(degraded.content, "I could not map that question");
        assert_eq!(degraded.response_type, Some(ResponseKind::Progress));

        // The session stays usable for the next question.
        client.send_text("");
        match client.next_frame().await {
            Some(ServerFrame::Error { error }) => assert_eq!(error.code, "VALIDATION_FAILED"),
            other => panic!("expected validation frame, got {:?}", other),
        }

        client.close();
        server.await.unwrap();

        // Degraded progress text is never persisted.
        let messages = store.get_conversation(&conversation_id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
    }

    #[tokio::test]
    async fn multi_frame_turn_emits_progress_then_replaces_placeholder() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = MockAnswerEngine::new().with_frames(vec![
            r#"{"content": "mapping question to schema", "response_type": "progress"}"#.to_string(),
            r#"{"content": "Final answer.", "query_sources": {"hops": 2}}"#.to_string(),
        ]);
        let orchestrator = orchestrator(Arc::clone(&store), engine);
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        handshake(&client).await;
        let conversation_id = expect_ack(&mut client).await;
        client.send_text("multi step question");

        let placeholder = expect_answer(client.next_frame().await);
        let interim = expect_answer(client.next_frame().await);
        assert_eq!(interim.message_id, placeholder.message_id);
        assert_eq!(interim.content, "mapping question to schema");
        assert_eq!(interim.response_type, Some(ResponseKind::Progress));

        let answer = expect_answer(client.next_frame().await);
        assert_eq!(answer.content, "Final answer.");
        assert!(answer.response_type.is_none());

        client.close();
        server.await.unwrap();

        // Interim progress frames were forwarded but never persisted.
        let messages = store.get_conversation(&conversation_id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages.iter().all(|m| m.is_final()));
    }

    #[tokio::test]
    async fn bare_id_metadata_frame_is_not_surfaced_as_an_answer() {
        let store = Arc::new(InMemorySessionStore::new());
        let engine = MockAnswerEngine::new().with_frames(vec![
            r#"{"conversation_id": "c-100"}"#.to_string(),
            r#"{"content": "real answer"}"#.to_string(),
        ]);
        let orchestrator = orchestrator(Arc::clone(&store), engine);
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        handshake(&client).await;
        expect_ack(&mut client).await;
        client.send_text("q");

        let _placeholder = expect_answer(client.next_frame().await);
        // Next frame is the real answer; the metadata frame was discarded.
        let answer = expect_answer(client.next_frame().await);
        assert_eq!(answer.content, "real answer");

        client.close();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn resumed_conversation_threads_parents_from_stored_history() {
        let store = Arc::new(InMemorySessionStore::new());
        let id = store.create_conversation().await.unwrap();
        let prior_question = crate::domain::conversation::Message::user(id.clone(), None, "old q");
        let prior_answer = crate::domain::conversation::Message::assistant(
            id.clone(),
            Some(prior_question.id),
            "old a",
            None,
        );
        let tail = prior_answer.id;
        store.append_message(&id, prior_question).await.unwrap();
        store.append_message(&id, prior_answer).await.unwrap();

        let engine = MockAnswerEngine::new().with_answer(r#"{"content": "new a"}"#);
        let orchestrator = orchestrator(Arc::clone(&store), engine);
        let (transport, mut client) = duplex_pair();

        let id_for_client = id.clone();
        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        client.send_text(TOKEN);
        client.send_text("");
        client.send_text(id_for_client.as_str());
        let acked = expect_ack(&mut client).await;
        assert_eq!(acked, id);

        client.send_text("new q");
        let _placeholder = expect_answer(client.next_frame().await);
        let _answer = expect_answer(client.next_frame().await);

        client.close();
        server.await.unwrap();

        let messages = store.get_conversation(&id).await.unwrap();
        assert_eq!(messages.len(), 4);
        // The resumed question replies to the stored tail.
        assert_eq!(messages[2].parent_id, Some(tail));
        assert_eq!(messages[3].parent_id, Some(messages[2].id));
    }

    /// Store whose every operation fails with `StorageUnavailable`.
    struct UnavailableStore;

    #[async_trait::async_trait]
    impl SessionStore for UnavailableStore {
        async fn create_conversation(&self) -> Result<ConversationId, DomainError> {
            Err(DomainError::storage_unavailable("disk offline"))
        }

        async fn append_message(
            &self,
            _conversation_id: &ConversationId,
            _message: Message,
        ) -> Result<(), DomainError> {
            Err(DomainError::storage_unavailable("disk offline"))
        }

        async fn get_conversation(
            &self,
            _conversation_id: &ConversationId,
        ) -> Result<Vec<Message>, DomainError> {
            Err(DomainError::storage_unavailable("disk offline"))
        }

        async fn record_feedback(
            &self,
            _conversation_id: &ConversationId,
            _message_id: &MessageId,
            _feedback: Feedback,
        ) -> Result<(), DomainError> {
            Err(DomainError::storage_unavailable("disk offline"))
        }

        async fn list_recent(
            &self,
            _limit: usize,
        ) -> Result<Vec<ConversationSummary>, DomainError> {
            Err(DomainError::storage_unavailable("disk offline"))
        }
    }

    #[tokio::test]
    async fn handshake_storage_failure_sends_a_single_explicit_frame() {
        let orchestrator = SessionOrchestrator::new(
            Arc::new(UnavailableStore),
            Arc::new(AccessPolicy::from_names(["analyst"])),
            Arc::new(MockAnswerEngine::new()),
            Arc::new(StaticAuthVerifier::new().with_caller(TOKEN, analyst())),
            Arc::new(NoopAuditLog),
            SessionSettings::default(),
        );
        let (transport, mut client) = duplex_pair();

        let server = tokio::spawn(async move {
            orchestrator.run(transport, "g").await;
        });

        handshake(&client).await;
        match client.next_frame().await {
            Some(ServerFrame::Error { error }) => {
                assert_eq!(error.code, "STORAGE_UNAVAILABLE")
            }
            other => panic!("expected storage frame, got {:?}", other),
        }
        // The session ends here; no trailing internal-error frame follows.
        assert_eq!(client.next_frame().await, None);
        server.await.unwrap();
    }
}
