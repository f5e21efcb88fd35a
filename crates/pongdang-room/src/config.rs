//! Room configuration.

use pongdang_protocol::RoomId;
use tracing::warn;

use crate::RoomError;

/// Where a room lives on the broker and where to go when it ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomConfig {
    /// The room to join.
    pub room_id: RoomId,

    /// Game type segment of the start destination (`/app/{game_type}/start/{room}`).
    pub game_type: String,

    /// Prefix of the room topic. The client subscribes to
    /// `{topic_prefix}/{room_id}`.
    pub topic_prefix: String,

    /// Route handed to the navigator when a forced exit names no target.
    pub exit_route: String,
}

impl RoomConfig {
    pub const DEFAULT_GAME_TYPE: &'static str = "marble";
    pub const DEFAULT_TOPIC_PREFIX: &'static str = "/topic/game";
    pub const DEFAULT_EXIT_ROUTE: &'static str = "/";

    /// A config for `room_id` with every other field at its default.
    pub fn new(room_id: impl Into<RoomId>) -> Self {
        Self {
            room_id: room_id.into(),
            game_type: Self::DEFAULT_GAME_TYPE.to_string(),
            topic_prefix: Self::DEFAULT_TOPIC_PREFIX.to_string(),
            exit_route: Self::DEFAULT_EXIT_ROUTE.to_string(),
        }
    }

    #[must_use]
    pub fn with_game_type(mut self, game_type: impl Into<String>) -> Self {
        self.game_type = game_type.into();
        self
    }

    #[must_use]
    pub fn with_topic_prefix(mut self, topic_prefix: impl Into<String>) -> Self {
        self.topic_prefix = topic_prefix.into();
        self
    }

    #[must_use]
    pub fn with_exit_route(mut self, exit_route: impl Into<String>) -> Self {
        self.exit_route = exit_route.into();
        self
    }

    /// The topic carrying this room's events.
    pub fn topic(&self) -> String {
        format!("{}/{}", self.topic_prefix.trim_end_matches('/'), self.room_id)
    }

    /// Checks the room id and fills in blank fields.
    ///
    /// - Blank `game_type`, `topic_prefix` or `exit_route` fall back to
    ///   their defaults.
    ///
    /// # Errors
    /// [`RoomError::InvalidConfig`] if the room id is blank.
    pub fn validated(mut self) -> Result<Self, RoomError> {
        if self.room_id.as_str().trim().is_empty() {
            return Err(RoomError::InvalidConfig("room_id is empty".into()));
        }
        if self.game_type.trim().is_empty() {
            warn!(default = Self::DEFAULT_GAME_TYPE, "game_type is empty, using default");
            self.game_type = Self::DEFAULT_GAME_TYPE.to_string();
        }
        if self.topic_prefix.trim().is_empty() {
            warn!(default = Self::DEFAULT_TOPIC_PREFIX, "topic_prefix is empty, using default");
            self.topic_prefix = Self::DEFAULT_TOPIC_PREFIX.to_string();
        }
        if self.exit_route.trim().is_empty() {
            self.exit_route = Self::DEFAULT_EXIT_ROUTE.to_string();
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_joins_prefix_and_room() {
        assert_eq!(RoomConfig::new("42").topic(), "/topic/game/42");
        let cfg = RoomConfig::new("42").with_topic_prefix("/topic/marble/");
        assert_eq!(cfg.topic(), "/topic/marble/42");
    }

    #[test]
    fn test_validated_rejects_blank_room() {
        let err = RoomConfig::new(" ").validated().unwrap_err();
        assert!(matches!(err, RoomError::InvalidConfig(_)));
    }

    #[test]
    fn test_validated_fills_blank_fields() {
        let cfg = RoomConfig::new("7")
            .with_game_type("")
            .with_topic_prefix("")
            .with_exit_route(" ")
            .validated()
            .unwrap();
        assert_eq!(cfg.game_type, RoomConfig::DEFAULT_GAME_TYPE);
        assert_eq!(cfg.topic_prefix, RoomConfig::DEFAULT_TOPIC_PREFIX);
        assert_eq!(cfg.exit_route, RoomConfig::DEFAULT_EXIT_ROUTE);
    }
}
