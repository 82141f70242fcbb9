//! In-memory transport for testing.
//!
//! `duplex_pair` returns the server-side transport and a client handle wired
//! over two channels. Dropping or closing the client handle surfaces as a
//! closure on the server side, which lets tests drive disconnect paths.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::domain::foundation::DomainError;
use crate::domain::session::ServerFrame;
use crate::ports::{CloseReason, Inbound, MessageTransport};

/// Server side of an in-memory connection.
#[derive(Debug)]
pub struct InMemoryTransport {
    outbound: mpsc::UnboundedSender<ServerFrame>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    closed: Option<CloseReason>,
}

/// Client side of an in-memory connection.
#[derive(Debug)]
pub struct ClientHandle {
    to_server: mpsc::UnboundedSender<Inbound>,
    from_server: mpsc::UnboundedReceiver<ServerFrame>,
}

/// Creates a connected transport/client pair.
pub fn duplex_pair() -> (InMemoryTransport, ClientHandle) {
    let (to_server, inbound) = mpsc::unbounded_channel();
    let (outbound, from_server) = mpsc::unbounded_channel();
    (
        InMemoryTransport {
            outbound,
            inbound,
            closed: None,
        },
        ClientHandle {
            to_server,
            from_server,
        },
    )
}

impl ClientHandle {
    /// Sends a text frame to the server.
    pub fn send_text(&self, text: impl Into<String>) {
        let _ = self.to_server.send(Inbound::Text(text.into()));
    }

    /// Signals an orderly close to the server.
    pub fn close(&self) {
        let _ = self.to_server.send(Inbound::Closed(CloseReason::Normal));
    }

    /// Awaits the next frame from the server, if any.
    pub async fn next_frame(&mut self) -> Option<ServerFrame> {
        self.from_server.recv().await
    }
}

#[async_trait]
impl MessageTransport for InMemoryTransport {
    async fn send(&mut self, frame: ServerFrame) -> Result<(), DomainError> {
        self.outbound
            .send(frame)
            .map_err(|_| DomainError::transport_closed())
    }

    async fn recv(&mut self) -> Inbound {
        if let Some(reason) = self.closed {
            return Inbound::Closed(reason);
        }
        let event = match self.inbound.recv().await {
            Some(event) => event,
            // Client handle dropped without an explicit close.
            None => Inbound::Closed(CloseReason::Error),
        };
        if let Inbound::Closed(reason) = &event {
            self.closed = Some(*reason);
        }
        event
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ErrorCode, MessageId};

    #[tokio::test]
    async fn text_frames_arrive_in_order() {
        let (mut server, client) = duplex_pair();
        client.send_text("one");
        client.send_text("two");
        assert_eq!(server.recv().await, Inbound::Text("one".to_string()));
        assert_eq!(server.recv().await, Inbound::Text("two".to_string()));
    }

    #[tokio::test]
    async fn server_frames_reach_the_client() {
        let (mut server, mut client) = duplex_pair();
        let frame = ServerFrame::progress(MessageId::new(), "working");
        server.send(frame.clone()).await.unwrap();
        assert_eq!(client.next_frame().await, Some(frame));
    }

    #[tokio::test]
    async fn close_is_sticky() {
        let (mut server, client) = duplex_pair();
        client.close();
        assert_eq!(server.recv().await, Inbound::Closed(CloseReason::Normal));
        assert_eq!(server.recv().await, Inbound::Closed(CloseReason::Normal));
    }

    #[tokio::test]
    async fn dropped_client_reads_as_error_close() {
        let (mut server, client) = duplex_pair();
        drop(client);
        assert_eq!(server.recv().await, Inbound::Closed(CloseReason::Error));
    }

    #[tokio::test]
    async fn send_after_client_drop_fails() {
        let (mut server, client) = duplex_pair();
        drop(client);
        let err = server
            .send(ServerFrame::progress(MessageId::new(), "late"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::TransportClosed);
    }
}
