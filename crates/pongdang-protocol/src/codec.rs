//! Codec trait and the JSON implementation.
//!
//! The game server speaks JSON in both directions, so [`JsonCodec`] is the
//! only implementation. Outbound action bodies are encoded with it and
//! inbound frame bodies are parsed with it.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts between Rust values and the bytes carried in a frame body.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or do not
    /// match `T`.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;

    /// Serializes a value into a UTF-8 string, for text transports.
    ///
    /// # Errors
    /// Fails like [`encode`](Self::encode), or with
    /// [`ProtocolError::InvalidMessage`] if the output is not UTF-8.
    fn encode_text<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        let bytes = self.encode(value)?;
        String::from_utf8(bytes).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use pongdang_protocol::{Codec, DiceRoll, JsonCodec};
///
/// let text = JsonCodec.encode_text(&DiceRoll::new(3, 3)).unwrap();
/// assert_eq!(text, r#"{"dice":[3,3],"is_double":true}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LandId, Player, UserId};

    #[test]
    fn test_json_codec_decode_player() {
        let player: Player = JsonCodec
            .decode(br#"{"user_id":4,"nickname":"mo","balance":100}"#)
            .unwrap();
        assert_eq!(player.user_id, UserId(4));
        assert_eq!(player.balance, 100);
        assert!(player.active);
    }

    #[test]
    fn test_json_codec_decode_garbage_is_error() {
        let result: Result<Player, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_text_transparent_ids() {
        assert_eq!(JsonCodec.encode_text(&LandId(7)).unwrap(), "7");
    }
}
