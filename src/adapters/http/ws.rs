//! WebSocket upgrade for chat sessions.
//!
//! Route: `GET /ws/:graph`. The upgrade itself is unauthenticated; the
//! credential token arrives as the first in-band handshake frame and the
//! orchestrator rejects the session before anything else happens if it does
//! not verify.

use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    response::Response,
};
use tracing::info;

use crate::adapters::transport::WsTransport;

use super::handlers::AppState;

/// Handles the websocket upgrade and runs the session to completion.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(graph): Path<String>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| async move {
        info!(graph = %graph, "websocket session opened");
        let orchestrator = state.orchestrator();
        orchestrator.run(WsTransport::new(socket), graph).await;
    })
}
