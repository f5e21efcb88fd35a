//! Outbound user intents.
//!
//! Each [`Action`] knows its STOMP destination and its JSON body. All
//! destinations are scoped to one room:
//!
//! | Action | Destination | Body |
//! |---|---|---|
//! | `Start` | `/app/{game_type}/start/{room}` | none |
//! | `Roll` | `/app/roll/{room}` | `{ dice, is_double }` |
//! | `Purchase` / `Toll` / `Tax` / `Salary` | `/app/{name}/{room}` | `{ land_id }` |
//! | `Quiz` | `/app/quiz/{room}` | none |
//! | `QuizCheck` | `/app/quiz/check/{room}` | `{ select_idx, is_correct }` |
//! | `Turn` | `/app/turn/{room}` | none |
//! | `End` | `/app/game/end/{room}` | none |

use rand::Rng;
use serde::Serialize;

use crate::codec::{Codec, JsonCodec};
use crate::types::{LandId, RoomId};
use crate::ProtocolError;

/// Two die faces as reported to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiceRoll {
    pub dice: [u8; 2],
    pub is_double: bool,
}

impl DiceRoll {
    pub fn new(first: u8, second: u8) -> Self {
        Self {
            dice: [first, second],
            is_double: first == second,
        }
    }

    /// Rolls two six-sided dice.
    pub fn throw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng.random_range(1..=6), rng.random_range(1..=6))
    }

    pub fn total(&self) -> u8 {
        self.dice[0] + self.dice[1]
    }
}

#[derive(Serialize)]
struct LandBody {
    land_id: LandId,
}

#[derive(Serialize)]
struct QuizCheckBody {
    select_idx: u32,
    is_correct: bool,
}

/// Something the local player asks the server to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Roll(DiceRoll),
    Purchase(LandId),
    Toll(LandId),
    Tax(LandId),
    Salary(LandId),
    Quiz,
    QuizCheck { select_idx: u32, is_correct: bool },
    Turn,
    End,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Roll(_) => "roll",
            Self::Purchase(_) => "purchase",
            Self::Toll(_) => "toll",
            Self::Tax(_) => "tax",
            Self::Salary(_) => "salary",
            Self::Quiz => "quiz",
            Self::QuizCheck { .. } => "quiz_check",
            Self::Turn => "turn",
            Self::End => "end",
        }
    }

    /// The STOMP destination for this action in `room`.
    pub fn destination(&self, room: &RoomId, game_type: &str) -> String {
        match self {
            Self::Start => format!("/app/{game_type}/start/{room}"),
            Self::Roll(_) => format!("/app/roll/{room}"),
            Self::Purchase(_) => format!("/app/purchase/{room}"),
            Self::Toll(_) => format!("/app/toll/{room}"),
            Self::Tax(_) => format!("/app/tax/{room}"),
            Self::Salary(_) => format!("/app/salary/{room}"),
            Self::Quiz => format!("/app/quiz/{room}"),
            Self::QuizCheck { .. } => format!("/app/quiz/check/{room}"),
            Self::Turn => format!("/app/turn/{room}"),
            Self::End => format!("/app/game/end/{room}"),
        }
    }

    /// The JSON body, or `None` for actions sent without one.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the body fails to serialize.
    pub fn body(&self) -> Result<Option<String>, ProtocolError> {
        let codec = JsonCodec;
        let body = match *self {
            Self::Roll(roll) => codec.encode_text(&roll)?,
            Self::Purchase(land_id)
            | Self::Toll(land_id)
            | Self::Tax(land_id)
            | Self::Salary(land_id) => codec.encode_text(&LandBody { land_id })?,
            Self::QuizCheck {
                select_idx,
                is_correct,
            } => codec.encode_text(&QuizCheckBody {
                select_idx,
                is_correct,
            })?,
            Self::Start | Self::Quiz | Self::Turn | Self::End => return Ok(None),
        };
        Ok(Some(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn room() -> RoomId {
        RoomId::from("12")
    }

    #[test]
    fn test_destination_start_uses_game_type() {
        assert_eq!(
            Action::Start.destination(&room(), "marble"),
            "/app/marble/start/12"
        );
    }

    #[test]
    fn test_destination_each_action() {
        let cases = [
            (Action::Roll(DiceRoll::new(1, 2)), "/app/roll/12"),
            (Action::Purchase(LandId(3)), "/app/purchase/12"),
            (Action::Toll(LandId(3)), "/app/toll/12"),
            (Action::Tax(LandId(3)), "/app/tax/12"),
            (Action::Salary(LandId(3)), "/app/salary/12"),
            (Action::Quiz, "/app/quiz/12"),
            (
                Action::QuizCheck {
                    select_idx: 1,
                    is_correct: true,
                },
                "/app/quiz/check/12",
            ),
            (Action::Turn, "/app/turn/12"),
            (Action::End, "/app/game/end/12"),
        ];
        for (action, expected) in cases {
            assert_eq!(action.destination(&room(), "marble"), expected, "{action:?}");
        }
    }

    #[test]
    fn test_body_roll() {
        let body = Action::Roll(DiceRoll::new(2, 5)).body().unwrap();
        assert_eq!(body.as_deref(), Some(r#"{"dice":[2,5],"is_double":false}"#));
    }

    #[test]
    fn test_body_land_actions() {
        let body = Action::Purchase(LandId(7)).body().unwrap();
        assert_eq!(body.as_deref(), Some(r#"{"land_id":7}"#));
    }

    #[test]
    fn test_body_quiz_check() {
        let body = Action::QuizCheck {
            select_idx: 2,
            is_correct: false,
        }
        .body()
        .unwrap();
        assert_eq!(body.as_deref(), Some(r#"{"select_idx":2,"is_correct":false}"#));
    }

    #[test]
    fn test_body_bodiless_actions_are_none() {
        for action in [Action::Start, Action::Quiz, Action::Turn, Action::End] {
            assert_eq!(action.body().unwrap(), None);
        }
    }

    #[test]
    fn test_dice_throw_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let roll = DiceRoll::throw(&mut rng);
            assert!((1..=6).contains(&roll.dice[0]));
            assert!((1..=6).contains(&roll.dice[1]));
            assert_eq!(roll.is_double, roll.dice[0] == roll.dice[1]);
            assert!((2..=12).contains(&roll.total()));
        }
    }
}
