//! Outbound game actions.
//!
//! Each method maps one player intent to a `SEND` on the room's
//! destination. Publishing is fire-and-forget: when the transport is down
//! the action is dropped with a warning and the method returns `false`.
//! Nothing is queued for later.

use pongdang_protocol::{Action, DiceRoll, LandId, RoomId};
use pongdang_transport::{StompHandle, TransportError};
use tracing::{debug, warn};

use crate::{RoomConfig, RoomError};

/// Sends actions for one room. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ActionPublisher {
    stomp: StompHandle,
    room_id: RoomId,
    game_type: String,
}

impl ActionPublisher {
    pub fn new(stomp: StompHandle, config: &RoomConfig) -> Self {
        Self {
            stomp,
            room_id: config.room_id.clone(),
            game_type: config.game_type.clone(),
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Publishes `action`, reporting why it could not be sent.
    ///
    /// # Errors
    /// - [`RoomError::Encode`] if the body fails to serialize
    /// - [`RoomError::Publish`] if the transport is down or stopped
    pub fn send(&self, action: Action) -> Result<(), RoomError> {
        let body = action.body().map_err(|source| RoomError::Encode {
            action: action.name(),
            source,
        })?;
        let destination = action.destination(&self.room_id, &self.game_type);
        self.stomp
            .publish(&destination, body)
            .map_err(|source| RoomError::Publish {
                action: action.name(),
                source,
            })?;
        debug!(room_id = %self.room_id, action = action.name(), %destination, "action sent");
        Ok(())
    }

    fn fire(&self, action: Action) -> bool {
        match self.send(action) {
            Ok(()) => true,
            Err(RoomError::Publish {
                source: TransportError::NotConnected,
                ..
            }) => {
                warn!(
                    room_id = %self.room_id,
                    action = action.name(),
                    "not connected, action dropped"
                );
                false
            }
            Err(e) => {
                warn!(room_id = %self.room_id, action = action.name(), error = %e, "action dropped");
                false
            }
        }
    }

    /// Asks the server to start the game.
    pub fn start(&self) -> bool {
        self.fire(Action::Start)
    }

    pub fn roll(&self, dice: DiceRoll) -> bool {
        self.fire(Action::Roll(dice))
    }

    pub fn purchase(&self, land_id: LandId) -> bool {
        self.fire(Action::Purchase(land_id))
    }

    pub fn toll(&self, land_id: LandId) -> bool {
        self.fire(Action::Toll(land_id))
    }

    pub fn tax(&self, land_id: LandId) -> bool {
        self.fire(Action::Tax(land_id))
    }

    pub fn salary(&self, land_id: LandId) -> bool {
        self.fire(Action::Salary(land_id))
    }

    /// Requests a quiz for the current tile.
    pub fn quiz(&self) -> bool {
        self.fire(Action::Quiz)
    }

    /// Submits the chosen answer. `is_correct` is graded locally.
    pub fn quiz_check(&self, select_idx: u32, is_correct: bool) -> bool {
        self.fire(Action::QuizCheck {
            select_idx,
            is_correct,
        })
    }

    /// Ends the local player's turn.
    pub fn turn(&self) -> bool {
        self.fire(Action::Turn)
    }

    pub fn end(&self) -> bool {
        self.fire(Action::End)
    }
}
