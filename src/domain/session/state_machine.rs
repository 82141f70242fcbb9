//! Per-connection conversation state machine.
//!
//! Sequences the handshake, tracks the bound conversation id, and reconciles
//! in-flight progress placeholders with finalized answers. The machine is
//! synchronous and IO-free: callers feed it handshake values and classified
//! response frames and act on the returned [`SessionEffect`]s. All
//! persistence, transport, and engine IO lives in the orchestrator.

use crate::domain::conversation::Message;
use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, StateMachine,
};
use crate::domain::session::{
    HandshakeIntake, HandshakeState, MalformedFrame, ResponseFrame, RetrievalPattern,
};

/// Placeholder content streamed while an answer is pending.
pub const PENDING_ANSWER_TEXT: &str = "Generating an answer...";

/// Connection lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Connecting,
    Handshaking,
    Active,
    Closing,
    Faulted,
}

impl StateMachine for SessionPhase {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SessionPhase::*;
        matches!(
            (self, target),
            (Connecting, Handshaking)
                | (Handshaking, Active)
                | (Active, Closing)
                | (Handshaking, Closing)
                | (Connecting, Faulted)
                | (Handshaking, Faulted)
                | (Active, Faulted)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SessionPhase::*;
        match self {
            Connecting => vec![Handshaking, Faulted],
            Handshaking => vec![Active, Closing, Faulted],
            Active => vec![Closing, Faulted],
            Closing => vec![],
            Faulted => vec![],
        }
    }
}

/// The single in-flight turn: the persisted user question and the ephemeral
/// placeholder emitted for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub user_message_id: MessageId,
    pub placeholder_id: MessageId,
}

/// Messages produced when a turn begins.
#[derive(Debug, Clone)]
pub struct TurnStart {
    /// Finalized user question; persisted before anything else happens.
    pub user_message: Message,
    /// Ephemeral progress placeholder; forwarded, never persisted.
    pub placeholder: Message,
}

/// What the caller must do with a classified inbound frame.
#[derive(Debug, Clone)]
pub enum SessionEffect {
    /// Persist and forward the final answer, replacing the placeholder in
    /// place (never append both).
    ReplacePlaceholder {
        placeholder_id: MessageId,
        message: Message,
    },
    /// A final answer arrived with no outstanding placeholder; append it as
    /// a new message rather than dropping it.
    AppendAnswer { message: Message },
    /// Forward ephemeral progress content; nothing is persisted.
    EmitProgress {
        placeholder_id: Option<MessageId>,
        content: String,
    },
    /// Handshake metadata received mid-session; discard without surfacing.
    DiscardMetadata { conversation_id: ConversationId },
}

/// State machine for one client connection.
#[derive(Debug)]
pub struct SessionMachine {
    phase: SessionPhase,
    intake: HandshakeIntake,
    conversation: Option<ConversationId>,
    last_message_id: Option<MessageId>,
    pending: Option<PendingTurn>,
}

impl SessionMachine {
    pub fn new(default_pattern: RetrievalPattern) -> Self {
        Self {
            phase: SessionPhase::Connecting,
            intake: HandshakeIntake::new(default_pattern),
            conversation: None,
            last_message_id: None,
            pending: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The conversation bound to this connection, once handshaking is done.
    pub fn conversation(&self) -> Option<&ConversationId> {
        self.conversation.as_ref()
    }

    /// Whether a turn is awaiting its final answer.
    pub fn has_pending_turn(&self) -> bool {
        self.pending.is_some()
    }

    /// Transport-level connection established.
    pub fn on_connected(&mut self) -> Result<(), DomainError> {
        self.phase = self
            .phase
            .transition_to(SessionPhase::Handshaking)
            .map_err(DomainError::from)?;
        Ok(())
    }

    /// Offers the next raw handshake frame; complete after three values.
    pub fn offer_handshake(&mut self, raw: &str) -> Result<Option<HandshakeState>, DomainError> {
        if self.phase != SessionPhase::Handshaking {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Handshake frame outside handshaking phase",
            ));
        }
        self.intake.offer(raw)
    }

    /// Binds the resolved conversation id for the connection lifetime.
    ///
    /// `history_tail` is the id of the last persisted message when resuming,
    /// so the next turn threads its parent reference correctly.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` on rebinding or binding outside handshake.
    pub fn bind_conversation(
        &mut self,
        id: ConversationId,
        history_tail: Option<MessageId>,
    ) -> Result<(), DomainError> {
        if self.conversation.is_some() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Conversation id is immutable for the lifetime of the connection",
            ));
        }
        self.phase = self
            .phase
            .transition_to(SessionPhase::Active)
            .map_err(DomainError::from)?;
        self.conversation = Some(id);
        self.last_message_id = history_tail;
        Ok(())
    }

    /// Starts a turn for a user question.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` outside `Active` or while another turn is
    ///   in flight (one turn per connection at a time).
    pub fn begin_turn(&mut self, question: &str) -> Result<TurnStart, DomainError> {
        if self.phase != SessionPhase::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Turn submitted outside active phase",
            ));
        }
        if self.pending.is_some() {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "A turn is already in flight on this connection",
            ));
        }
        let conversation_id = self
            .conversation
            .clone()
            .ok_or_else(|| DomainError::internal("active session without bound conversation"))?;

        let user_message = Message::user(conversation_id.clone(), self.last_message_id, question);
        let placeholder = Message::progress(
            conversation_id,
            Some(user_message.id),
            PENDING_ANSWER_TEXT,
        );
        self.pending = Some(PendingTurn {
            user_message_id: user_message.id,
            placeholder_id: placeholder.id,
        });
        self.last_message_id = Some(user_message.id);

        Ok(TurnStart {
            user_message,
            placeholder,
        })
    }

    /// Applies a classified inbound frame.
    pub fn apply_frame(&mut self, frame: ResponseFrame) -> Result<SessionEffect, DomainError> {
        if self.phase != SessionPhase::Active {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                "Response frame outside active phase",
            ));
        }
        let conversation_id = self
            .conversation
            .clone()
            .ok_or_else(|| DomainError::internal("active session without bound conversation"))?;

        match frame {
            ResponseFrame::HandshakeAck { conversation_id } => {
                // Metadata only; must not surface as a chat message.
                Ok(SessionEffect::DiscardMetadata { conversation_id })
            }
            ResponseFrame::ProgressUpdate { content } => Ok(SessionEffect::EmitProgress {
                placeholder_id: self.pending.as_ref().map(|p| p.placeholder_id),
                content,
            }),
            ResponseFrame::FinalAnswer {
                content,
                query_sources,
            } => {
                let parent = self
                    .pending
                    .as_ref()
                    .map(|p| p.user_message_id)
                    .or(self.last_message_id);
                let message =
                    Message::assistant(conversation_id, parent, content, query_sources);
                self.last_message_id = Some(message.id);
                match self.pending.take() {
                    Some(pending) => Ok(SessionEffect::ReplacePlaceholder {
                        placeholder_id: pending.placeholder_id,
                        message,
                    }),
                    None => Ok(SessionEffect::AppendAnswer { message }),
                }
            }
        }
    }

    /// Degrades an unparseable payload to literal progress text.
    ///
    /// Recoverable: the connection stays active. The degraded text ends the
    /// in-flight turn, since no structured final answer will follow it.
    pub fn apply_malformed(&mut self, frame: MalformedFrame) -> SessionEffect {
        let placeholder_id = self.pending.take().map(|p| p.placeholder_id);
        SessionEffect::EmitProgress {
            placeholder_id,
            content: frame.raw,
        }
    }

    /// Abandons the in-flight turn (engine timeout or failure).
    ///
    /// The already-persisted user question stands; nothing further is
    /// recorded for the turn.
    pub fn fail_turn(&mut self) -> Option<PendingTurn> {
        self.pending.take()
    }

    /// Client-initiated termination. Clears only transient state; stored
    /// history is untouched.
    pub fn close(&mut self) {
        self.pending = None;
        if !self.phase.is_terminal() {
            self.phase = SessionPhase::Closing;
        }
    }

    /// Unrecoverable failure path.
    pub fn fault(&mut self) {
        self.pending = None;
        if !self.phase.is_terminal() {
            self.phase = SessionPhase::Faulted;
        }
    }
}
