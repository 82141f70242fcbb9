//! Ports: contracts between the application core and external collaborators.

mod answer_engine;
mod audit_log;
mod auth_verifier;
mod session_store;
mod transport;

pub use answer_engine::{AnswerEngine, AnswerRequest};
pub use audit_log::{AuditLog, AuditOperation, AuditOutcome, AuditRecord};
pub use auth_verifier::{AuthVerifier, Caller};
pub use session_store::SessionStore;
pub use transport::{CloseReason, Inbound, MessageTransport};
