//! Mock Answer Engine for testing.
//!
//! Configurable to script whole turns (each turn is the list of raw frames
//! the engine emits for one question), simulate latency, or inject errors.
//! Calls are recorded for verification.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::domain::foundation::DomainError;
use crate::ports::{AnswerEngine, AnswerRequest};

/// One scripted turn.
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// Emit these raw frames, in order.
    Frames(Vec<String>),
    /// Fail the call.
    Error(DomainError),
}

/// Scriptable answer engine for tests.
#[derive(Debug, Clone, Default)]
pub struct MockAnswerEngine {
    turns: Arc<Mutex<VecDeque<MockTurn>>>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<AnswerRequest>>>,
}

impl MockAnswerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a single-frame turn.
    pub fn with_answer(self, raw: impl Into<String>) -> Self {
        self.with_turn(MockTurn::Frames(vec![raw.into()]))
    }

    /// Scripts a multi-frame turn (progress frames followed by a final).
    pub fn with_frames(self, raws: Vec<String>) -> Self {
        self.with_turn(MockTurn::Frames(raws))
    }

    /// Scripts a failing turn.
    pub fn with_error(self, error: DomainError) -> Self {
        self.with_turn(MockTurn::Error(error))
    }

    fn with_turn(self, turn: MockTurn) -> Self {
        self.turns
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(turn);
        self
    }

    /// Simulates latency before each response.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<AnswerRequest> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl AnswerEngine for MockAnswerEngine {
    async fn ask(&self, request: &AnswerRequest) -> Result<Vec<String>, DomainError> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(request.clone());

        if let Some(delay) = self.delay {
            sleep(delay).await;
        }

        let turn = self
            .turns
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .pop_front();
        match turn {
            Some(MockTurn::Frames(frames)) => Ok(frames),
            Some(MockTurn::Error(error)) => Err(error),
            None => Err(DomainError::upstream_timeout("no scripted turn left")),
        }
    }
}
