//! Unified error type for the pongdang client.

use pongdang_protocol::ProtocolError;
use pongdang_room::RoomError;
use pongdang_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each wrapping variant lets `?` convert
/// sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PongdangError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (config, closed, publish).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The client builder was given unusable settings.
    #[error("invalid client config: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let pongdang_err: PongdangError = err.into();
        assert!(matches!(pongdang_err, PongdangError::Transport(_)));
        assert!(pongdang_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let pongdang_err: PongdangError = err.into();
        assert!(matches!(pongdang_err, PongdangError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::Closed("7".into());
        let pongdang_err: PongdangError = err.into();
        assert!(matches!(pongdang_err, PongdangError::Room(_)));
        assert_eq!(pongdang_err.to_string(), "room 7 is closed");
    }
}
