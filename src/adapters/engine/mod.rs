//! Answer Engine adapters.

mod http;
mod mock;

pub use http::HttpAnswerEngine;
pub use mock::{MockAnswerEngine, MockTurn};
