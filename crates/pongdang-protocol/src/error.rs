//! Error types for the protocol layer.
//!
//! Decoding inbound frames never fails (bad frames become
//! [`GameEvent::Unknown`](crate::GameEvent::Unknown)), so these errors only
//! surface on the outbound side and from explicit [`Codec`](crate::Codec)
//! calls.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Deserialization failed: malformed JSON or a shape mismatch.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The message is well-formed but not usable, e.g. a body that is not
    /// valid UTF-8.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
