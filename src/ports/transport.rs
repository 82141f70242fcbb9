//! Streaming transport port.
//!
//! One bidirectional ordered frame channel per client connection. Frames
//! sent by one side arrive in order; delivery does not survive reconnects.
//! A reconnecting client starts a fresh handshake and resumes by supplying
//! its previously obtained conversation id instead of `"new"`.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::session::ServerFrame;

/// Why the channel closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Normal,
    Error,
    Timeout,
}

/// One inbound event from the client side of the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A text frame (handshake value or question).
    Text(String),
    /// The channel closed; no further frames will arrive.
    Closed(CloseReason),
}

/// Port over one client connection's frame channel.
#[async_trait]
pub trait MessageTransport: Send {
    /// Sends a frame to the client.
    ///
    /// # Errors
    ///
    /// - `TransportClosed` if the channel is no longer writable.
    async fn send(&mut self, frame: ServerFrame) -> Result<(), DomainError>;

    /// Awaits the next inbound frame or closure notification.
    ///
    /// After a `Closed` has been returned, further calls keep returning
    /// `Closed` with the same reason.
    async fn recv(&mut self) -> Inbound;
}
