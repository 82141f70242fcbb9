//! HTTP Answer Engine adapter.
//!
//! Calls the retrieval-augmented answering service over HTTP. One question is
//! one POST to `{base_url}/{graph}/query`; the response body is returned raw
//! and classified by the session layer.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::foundation::DomainError;
use crate::ports::{AnswerEngine, AnswerRequest};

#[derive(Debug, Serialize)]
struct QueryBody<'a> {
    question: &'a str,
    retrieval_pattern: &'a str,
    conversation_id: &'a str,
}

/// Answer engine backed by an HTTP answering service.
#[derive(Debug, Clone)]
pub struct HttpAnswerEngine {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnswerEngine {
    /// Creates an engine for the given base URL.
    ///
    /// The client carries its own connect timeout; the per-turn deadline is
    /// enforced by the caller, which races the whole call against it.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(DomainError::internal)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn query_url(&self, graph: &str) -> String {
        format!("{}/{}/query", self.base_url, graph)
    }
}

#[async_trait]
impl AnswerEngine for HttpAnswerEngine {
    async fn ask(&self, request: &AnswerRequest) -> Result<Vec<String>, DomainError> {
        let url = self.query_url(&request.graph);
        debug!(url = %url, conversation_id = %request.conversation_id, "querying answer engine");

        let body = QueryBody {
            question: &request.question,
            retrieval_pattern: request.retrieval_pattern.as_str(),
            conversation_id: request.conversation_id.as_str(),
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(DomainError::upstream_timeout)?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(DomainError::upstream_timeout(format!(
                "answer engine returned {}",
                status
            )));
        }

        let payload = response
            .text()
            .await
            .map_err(DomainError::upstream_timeout)?;
        Ok(vec![payload])
    }
}
