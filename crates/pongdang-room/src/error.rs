//! Error types for the room layer.

use pongdang_protocol::{ProtocolError, RoomId};
use pongdang_transport::TransportError;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room configuration cannot be used to join.
    #[error("invalid room config: {0}")]
    InvalidConfig(String),

    /// The room was left or its actor has stopped.
    #[error("room {0} is closed")]
    Closed(RoomId),

    /// An action body could not be serialized.
    #[error("failed to encode {action}: {source}")]
    Encode {
        action: &'static str,
        #[source]
        source: ProtocolError,
    },

    /// The transport refused the `SEND`.
    #[error("failed to publish {action}: {source}")]
    Publish {
        action: &'static str,
        #[source]
        source: TransportError,
    },
}
