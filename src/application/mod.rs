//! Application layer: use-case handlers wiring the domain to the ports.

mod feedback;
mod history;
mod orchestrator;

pub use feedback::{FeedbackCommand, FeedbackHandler};
pub use history::HistoryQueries;
pub use orchestrator::{SessionOrchestrator, SessionSettings};
