//! Transport layer for the pongdang session client.
//!
//! Provides the [`Connector`] and [`Connection`] traits that abstract over
//! how a text channel to the game server is dialed, the STOMP 1.2 [`Frame`]
//! codec spoken on top of it, and the background [`StompClient`] that keeps
//! one room connection alive across drops.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket connector via `tokio-tungstenite`

mod client;
mod credentials;
mod error;
mod frame;
pub mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use client::{
    StompClient, StompConfig, StompHandle, StompMessage, SubscriptionId,
};
pub use credentials::{
    Anonymous, Credentials, IdentityProvider, StaticIdentity, StaticToken,
    TokenProvider,
};
pub use error::TransportError;
pub use frame::{Command, Frame};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector};

use std::fmt;
use std::future::Future;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Dials fresh connections to the server.
///
/// The STOMP client calls [`connect`](Self::connect) once at start-up and
/// again after every drop, so implementations must be able to produce more
/// than one connection.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Opens a new connection.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single connection that carries text messages in both directions.
pub trait Connection: Send + Sync + 'static {
    /// Sends one text message to the remote peer.
    fn send(
        &self,
        text: String,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
