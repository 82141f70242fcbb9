//! Wire frames for the streaming session protocol.
//!
//! Inbound payloads from the answering engine are dynamic in shape: a bare
//! conversation id (handshake metadata), a full answer, a progress update,
//! or free text. They are classified exactly once, at the boundary, into a
//! tagged [`ResponseFrame`]; anything unparseable is a [`MalformedFrame`]
//! which callers route to the literal-text degradation path instead of
//! failing the connection.

use serde::{Deserialize, Serialize};

use crate::domain::conversation::ResponseKind;
use crate::domain::foundation::{ConversationId, ErrorCode, MessageId};

/// An inbound engine payload, classified at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFrame {
    /// Bare conversation id with no content: handshake metadata, never
    /// surfaced to the UI-facing collaborator as a chat message.
    HandshakeAck { conversation_id: ConversationId },
    /// A finalized answer; replaces the outstanding progress placeholder.
    FinalAnswer {
        content: String,
        query_sources: Option<serde_json::Value>,
    },
    /// An interim fragment; shown in place of the placeholder, superseded
    /// by the eventual final answer.
    ProgressUpdate { content: String },
}

/// A payload that could not be parsed as structured data.
///
/// Non-fatal: the raw text degrades to literal progress content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedFrame {
    pub raw: String,
}

impl ResponseFrame {
    /// Classifies one raw engine payload.
    ///
    /// A JSON object with a `content` field is an answer (`response_type`
    /// `"progress"` marks it interim; absence implies final). An object with
    /// only a `conversation_id` is handshake metadata. Everything else is
    /// malformed.
    pub fn parse(raw: &str) -> Result<ResponseFrame, MalformedFrame> {
        let value: serde_json::Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(_) => {
                return Err(MalformedFrame {
                    raw: raw.to_string(),
                })
            }
        };
        let object = match value.as_object() {
            Some(o) => o,
            None => {
                return Err(MalformedFrame {
                    raw: raw.to_string(),
                })
            }
        };

        if let Some(content) = object.get("content").and_then(|c| c.as_str()) {
            let is_progress = object
                .get("response_type")
                .and_then(|t| t.as_str())
                .map(|t| t.eq_ignore_ascii_case("progress"))
                .unwrap_or(false);
            if is_progress {
                return Ok(ResponseFrame::ProgressUpdate {
                    content: content.to_string(),
                });
            }
            return Ok(ResponseFrame::FinalAnswer {
                content: content.to_string(),
                query_sources: object.get("query_sources").cloned(),
            });
        }

        if let Some(id) = object.get("conversation_id").and_then(|c| c.as_str()) {
            if let Ok(conversation_id) = ConversationId::new(id) {
                return Ok(ResponseFrame::HandshakeAck { conversation_id });
            }
        }

        Err(MalformedFrame {
            raw: raw.to_string(),
        })
    }
}

// ============================================
// Server → Client Frames
// ============================================

/// All frames sent to the connected client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    /// Error indicator for a failed turn or denied operation.
    Error { error: ErrorFrame },
    /// Answer content (final or progress placeholder).
    Answer(AnswerFrame),
    /// Handshake acknowledgment carrying only the bound conversation id.
    ConversationAck { conversation_id: ConversationId },
}

impl ServerFrame {
    /// A final answer frame for a persisted assistant message.
    pub fn final_answer(
        message_id: MessageId,
        content: impl Into<String>,
        query_sources: Option<serde_json::Value>,
    ) -> Self {
        ServerFrame::Answer(AnswerFrame {
            message_id,
            content: content.into(),
            response_type: None,
            query_sources,
        })
    }

    /// An ephemeral progress frame the client replaces in place.
    pub fn progress(message_id: MessageId, content: impl Into<String>) -> Self {
        ServerFrame::Answer(AnswerFrame {
            message_id,
            content: content.into(),
            response_type: Some(ResponseKind::Progress),
            query_sources: None,
        })
    }

    /// An error frame with the given code.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        ServerFrame::Error {
            error: ErrorFrame {
                code: code.to_string(),
                message: message.into(),
                message_id: None,
            },
        }
    }

    /// An error frame addressed to the placeholder it terminates, so the
    /// client replaces the pending content in place instead of leaving it
    /// dangling next to the error indicator.
    pub fn turn_error(
        code: ErrorCode,
        message: impl Into<String>,
        message_id: Option<MessageId>,
    ) -> Self {
        ServerFrame::Error {
            error: ErrorFrame {
                code: code.to_string(),
                message: message.into(),
                message_id,
            },
        }
    }
}

/// Answer payload. `response_type` absent means final.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerFrame {
    pub message_id: MessageId,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_sources: Option<serde_json::Value>,
}

/// Error payload rendered by the client as an indicator, not a chat message.
///
/// `message_id` is present when the error ends a turn whose placeholder is
/// still outstanding; it names the placeholder to terminate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
}
