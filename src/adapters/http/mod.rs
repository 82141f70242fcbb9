//! HTTP surface: REST history/feedback endpoints and the websocket upgrade.

mod dto;
mod handlers;
mod routes;
mod ws;

pub use handlers::AppState;
pub use routes::app_router;
