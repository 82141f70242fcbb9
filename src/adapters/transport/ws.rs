//! WebSocket transport adapter.
//!
//! Wraps an upgraded axum WebSocket as a [`MessageTransport`]. Server frames
//! are serialized to JSON text; inbound text frames pass through untouched
//! for the session layer to interpret. Pings are answered here and never
//! surface to the session layer.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tracing::debug;

use crate::domain::foundation::DomainError;
use crate::domain::session::ServerFrame;
use crate::ports::{CloseReason, Inbound, MessageTransport};

/// Transport over one upgraded WebSocket connection.
pub struct WsTransport {
    sender: SplitSink<WebSocket, Message>,
    receiver: SplitStream<WebSocket>,
    closed: Option<CloseReason>,
}

impl WsTransport {
    pub fn new(socket: WebSocket) -> Self {
        let (sender, receiver) = socket.split();
        Self {
            sender,
            receiver,
            closed: None,
        }
    }
}

#[async_trait]
impl MessageTransport for WsTransport {
    async fn send(&mut self, frame: ServerFrame) -> Result<(), DomainError> {
        let payload = serde_json::to_string(&frame).map_err(DomainError::internal)?;
        self.sender
            .send(Message::Text(payload))
            .await
            .map_err(|_| DomainError::transport_closed())
    }

    async fn recv(&mut self) -> Inbound {
        if let Some(reason) = self.closed {
            return Inbound::Closed(reason);
        }
        loop {
            match self.receiver.next().await {
                Some(Ok(Message::Text(text))) => return Inbound::Text(text),
                Some(Ok(Message::Ping(payload))) => {
                    if self.sender.send(Message::Pong(payload)).await.is_err() {
                        self.closed = Some(CloseReason::Error);
                        return Inbound::Closed(CloseReason::Error);
                    }
                }
                Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Binary(_))) => {
                    debug!("ignoring binary frame");
                    continue;
                }
                Some(Ok(Message::Close(_))) | None => {
                    self.closed = Some(CloseReason::Normal);
                    return Inbound::Closed(CloseReason::Normal);
                }
                Some(Err(e)) => {
                    debug!(error = %e, "websocket receive error");
                    self.closed = Some(CloseReason::Error);
                    return Inbound::Closed(CloseReason::Error);
                }
            }
        }
    }
}
