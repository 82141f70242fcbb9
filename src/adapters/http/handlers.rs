//! HTTP handlers for history and feedback endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{
    FeedbackCommand, FeedbackHandler, HistoryQueries, SessionOrchestrator, SessionSettings,
};
use crate::domain::access::AccessPolicy;
use crate::domain::conversation::Feedback;
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, MessageId};
use crate::ports::{AnswerEngine, AuditLog, AuthVerifier, Caller, SessionStore};

use super::dto::{
    ConversationListResponse, ConversationResponse, ErrorResponse, FeedbackRequest,
    ListConversationsQuery, MessageResponse,
};

// ════════════════════════════════════════════════════════════════════════════
// Shared state
// ════════════════════════════════════════════════════════════════════════════

/// Everything the HTTP surface needs, injected at start-up.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub policy: Arc<AccessPolicy>,
    pub engine: Arc<dyn AnswerEngine>,
    pub auth: Arc<dyn AuthVerifier>,
    pub audit: Arc<dyn AuditLog>,
    pub settings: SessionSettings,
}

impl AppState {
    pub fn history_queries(&self) -> HistoryQueries {
        HistoryQueries::new(
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
            Arc::clone(&self.audit),
        )
    }

    pub fn feedback_handler(&self) -> FeedbackHandler {
        FeedbackHandler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
            Arc::clone(&self.audit),
        )
    }

    pub fn orchestrator(&self) -> SessionOrchestrator {
        SessionOrchestrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.policy),
            Arc::clone(&self.engine),
            Arc::clone(&self.auth),
            Arc::clone(&self.audit),
            self.settings.clone(),
        )
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<Caller, DomainError> {
        let token = bearer_token(headers)
            .ok_or_else(|| DomainError::unauthorized("Missing bearer token"))?;
        self.auth.verify(token).await
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

// ════════════════════════════════════════════════════════════════════════════
// HTTP handlers
// ════════════════════════════════════════════════════════════════════════════

/// GET /api/conversations - List recent conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListConversationsQuery>,
) -> Response {
    let caller = match state.authenticate(&headers).await {
        Ok(caller) => caller,
        Err(e) => return error_response(e),
    };
    match state
        .history_queries()
        .list_recent(&caller, query.limit)
        .await
    {
        Ok(summaries) => {
            let response = ConversationListResponse {
                conversations: summaries.into_iter().map(Into::into).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// GET /api/conversations/:id - Full message history
pub async fn get_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<String>,
) -> Response {
    let caller = match state.authenticate(&headers).await {
        Ok(caller) => caller,
        Err(e) => return error_response(e),
    };
    let conversation_id = match conversation_id.parse::<ConversationId>() {
        Ok(id) => id,
        Err(_) => {
            // Malformed ids render like any other inaccessible conversation.
            return error_response(DomainError::forbidden());
        }
    };
    match state
        .history_queries()
        .get_conversation(&caller, &conversation_id)
        .await
    {
        Ok(messages) => {
            let response = ConversationResponse {
                conversation_id: conversation_id.to_string(),
                messages: messages.into_iter().map(MessageResponse::from).collect(),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /api/conversations/:id/messages/:message_id/feedback
pub async fn record_feedback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((conversation_id, message_id)): Path<(String, String)>,
    Json(request): Json<FeedbackRequest>,
) -> Response {
    let caller = match state.authenticate(&headers).await {
        Ok(caller) => caller,
        Err(e) => return error_response(e),
    };
    let conversation_id = match conversation_id.parse::<ConversationId>() {
        Ok(id) => id,
        Err(_) => return error_response(DomainError::forbidden()),
    };
    let message_id = match message_id.parse::<MessageId>() {
        Ok(id) => id,
        Err(_) => return error_response(DomainError::message_not_found(message_id)),
    };
    let feedback = match request.comment {
        Some(comment) => Feedback::new(request.feedback).with_comment(comment),
        None => Feedback::new(request.feedback),
    };
    let command = FeedbackCommand {
        conversation_id,
        message_id,
        feedback,
    };
    match state.feedback_handler().handle(&caller, command).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Error mapping
// ════════════════════════════════════════════════════════════════════════════

/// Maps a domain error to a response.
///
/// `Forbidden` and `ConversationNotFound` produce byte-identical responses so
/// conversation ids cannot be enumerated through this surface.
pub fn error_response(error: DomainError) -> Response {
    let (status, code, message) = match error.code() {
        ErrorCode::Unauthorized => (
            StatusCode::UNAUTHORIZED,
            ErrorCode::Unauthorized,
            "Credential rejected".to_string(),
        ),
        ErrorCode::Forbidden | ErrorCode::ConversationNotFound => (
            StatusCode::FORBIDDEN,
            ErrorCode::Forbidden,
            "Access denied".to_string(),
        ),
        ErrorCode::MessageNotFound => (
            StatusCode::NOT_FOUND,
            ErrorCode::MessageNotFound,
            error.message.clone(),
        ),
        ErrorCode::ValidationFailed | ErrorCode::EmptyField | ErrorCode::InvalidFormat => (
            StatusCode::BAD_REQUEST,
            error.code(),
            error.message.clone(),
        ),
        ErrorCode::StorageUnavailable => (
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::StorageUnavailable,
            "Storage unavailable".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalError,
            "Internal error".to_string(),
        ),
    };
    (
        status,
        Json(ErrorResponse::new(code.to_string(), message)),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_is_extracted_from_authorization_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer tok-123".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("tok-123"));
    }

    #[test]
    fn missing_or_malformed_authorization_yields_none() {
        assert_eq!(bearer_token(&HeaderMap::new()), None);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn forbidden_and_missing_conversation_render_identically() {
        let forbidden = error_response(DomainError::forbidden());
        let missing = error_response(DomainError::conversation_not_found("c-1"));
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(missing.status(), StatusCode::FORBIDDEN);

        let forbidden_body = axum::body::to_bytes(forbidden.into_body(), 1024)
            .await
            .unwrap();
        let missing_body = axum::body::to_bytes(missing.into_body(), 1024)
            .await
            .unwrap();
        assert_eq!(forbidden_body, missing_body);
    }

    #[test]
    fn message_not_found_is_a_plain_404() {
        let response = error_response(DomainError::message_not_found("m-1"));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
