//! Conversation aggregate: a durable, append-only sequence of messages.

mod conversation;
mod message;

pub use conversation::{Conversation, ConversationSummary};
pub use message::{Feedback, FeedbackValue, Message, MessageRole, ResponseKind};
