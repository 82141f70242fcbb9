//! Per-connection session logic: handshake, wire frames, state machine.

mod frames;
mod handshake;
mod state_machine;

pub use frames::{AnswerFrame, ErrorFrame, MalformedFrame, ResponseFrame, ServerFrame};
pub use handshake::{
    ConversationTarget, HandshakeIntake, HandshakeState, RetrievalPattern,
    DEFAULT_RETRIEVAL_PATTERN, NEW_CONVERSATION_SENTINEL,
};
pub use state_machine::{
    PendingTurn, SessionEffect, SessionMachine, SessionPhase, TurnStart, PENDING_ANSWER_TEXT,
};
