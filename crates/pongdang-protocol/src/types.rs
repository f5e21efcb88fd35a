//! Wire types for the marble game.
//!
//! The server is not consistent about field casing (`roomState` next to
//! `land_id`), so every multi-word field accepts both the snake_case and the
//! camelCase spelling. Anything optional on the wire defaults instead of
//! failing, so a sparse payload still decodes.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The server's id for a signed-in user. Players are keyed by it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// Stable key of a board tile (0..23 on the marble board).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct LandId(pub u32);

impl fmt::Display for LandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L-{}", self.0)
    }
}

/// Identifies a room. Rooms are addressed by whatever string the lobby
/// handed out, usually a number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl RoomId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for RoomId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

// ---------------------------------------------------------------------------
// Room, lands, players, quiz
// ---------------------------------------------------------------------------

/// Round bookkeeping shared by the whole room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomState {
    /// `turn_order` of the player expected to act next.
    #[serde(alias = "currentTurn")]
    pub current_turn: i64,
    pub round: u32,
    #[serde(alias = "maxRound")]
    pub max_round: u32,
    /// Shared vault balance, collected through salary.
    pub pot: i64,
    #[serde(alias = "doubleCount")]
    pub double_count: u32,
    pub double: bool,
}

/// One board tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Land {
    #[serde(alias = "landId")]
    pub land_id: LandId,
    #[serde(default)]
    pub name: String,
    /// Zero for tiles that cannot be bought.
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub toll: i64,
    #[serde(default, alias = "ownerId")]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub color: String,
    #[serde(default, alias = "buildingLevel", skip_serializing_if = "Option::is_none")]
    pub building_level: Option<u32>,
}

impl Land {
    /// A blank tile with only its id set.
    pub fn new(land_id: LandId) -> Self {
        Self {
            land_id,
            name: String::new(),
            price: 0,
            toll: 0,
            owner_id: None,
            color: String::new(),
            building_level: None,
        }
    }

    pub fn is_purchasable(&self) -> bool {
        self.price > 0
    }
}

/// A partial update to one tile. Absent fields leave the stored value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LandPatch {
    #[serde(alias = "landId")]
    pub land_id: LandId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub toll: Option<i64>,
    /// `None` keeps the owner, `Some(None)` clears it, `Some(Some(id))` sets it.
    #[serde(default, alias = "ownerId", deserialize_with = "present")]
    pub owner_id: Option<Option<UserId>>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default, alias = "buildingLevel")]
    pub building_level: Option<u32>,
}

impl LandPatch {
    /// Returns `land` with every present field of the patch applied.
    pub fn apply(&self, land: &Land) -> Land {
        Land {
            land_id: land.land_id,
            name: self.name.clone().unwrap_or_else(|| land.name.clone()),
            price: self.price.unwrap_or(land.price),
            toll: self.toll.unwrap_or(land.toll),
            owner_id: self.owner_id.unwrap_or(land.owner_id),
            color: self.color.clone().unwrap_or_else(|| land.color.clone()),
            building_level: self.building_level.or(land.building_level),
        }
    }

    /// Builds a tile from the patch alone, for ids the client has not seen.
    pub fn to_land(&self) -> Land {
        self.apply(&Land::new(self.land_id))
    }
}

impl From<Land> for LandPatch {
    fn from(land: Land) -> Self {
        Self {
            land_id: land.land_id,
            name: Some(land.name),
            price: Some(land.price),
            toll: Some(land.toll),
            owner_id: Some(land.owner_id),
            color: Some(land.color),
            building_level: land.building_level,
        }
    }
}

/// Distinguishes an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Reads `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

fn default_active() -> bool {
    true
}

/// A participant in the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    #[serde(alias = "userId")]
    pub user_id: UserId,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub balance: i64,
    /// Current tile index.
    #[serde(default)]
    pub position: u32,
    #[serde(default, alias = "turnOrder")]
    pub turn_order: i64,
    /// Set while the player sits in jail.
    #[serde(default, alias = "skipTurn")]
    pub skip_turn: bool,
    /// False once bankrupt or gone.
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub reward: Option<i64>,
}

impl Player {
    pub fn new(user_id: UserId, nickname: impl Into<String>, turn_order: i64) -> Self {
        Self {
            user_id,
            nickname: nickname.into(),
            balance: 0,
            position: 0,
            turn_order,
            skip_turn: false,
            active: true,
            rank: None,
            reward: None,
        }
    }
}

/// A pending multiple-choice question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Quiz {
    /// Tile that triggered the quiz.
    pub position: u32,
    pub question: String,
    pub choice1: Option<String>,
    pub choice2: Option<String>,
    pub choice3: Option<String>,
    pub choice4: Option<String>,
    /// Zero-based index of the correct choice.
    #[serde(alias = "answerIdx")]
    pub answer_idx: u32,
    pub explanation: Option<String>,
}

impl Quiz {
    /// The choices that are present, in order.
    pub fn choices(&self) -> impl Iterator<Item = &str> {
        [&self.choice1, &self.choice2, &self.choice3, &self.choice4]
            .into_iter()
            .filter_map(|c| c.as_deref())
    }
}

/// A full game snapshot, as sent with `game_start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Game {
    #[serde(alias = "roomState")]
    pub room_state: RoomState,
    pub lands: Vec<Land>,
    pub players: Vec<Player>,
}

/// Accepts either a single value or an array of values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::One(item) => std::slice::from_ref(item),
            Self::Many(items) => items,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Event payloads
// ---------------------------------------------------------------------------

/// Room state and roster, both optional. Used by `roll` and `salary`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoundUpdate {
    #[serde(alias = "roomState")]
    pub room_state: Option<RoomState>,
    pub players: Option<Vec<Player>>,
}

/// Payload of `purchase`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PurchaseUpdate {
    #[serde(alias = "land", deserialize_with = "null_as_default")]
    pub lands: OneOrMany<LandPatch>,
    pub players: Option<Vec<Player>>,
}

/// Payload of `toll`: wholesale replacements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TollUpdate {
    pub lands: Option<Vec<Land>>,
    pub players: Option<Vec<Player>>,
}

/// A partial game snapshot. Used by `tax`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GamePatch {
    #[serde(alias = "roomState")]
    pub room_state: Option<RoomState>,
    pub lands: Option<Vec<LandPatch>>,
    pub players: Option<Vec<Player>>,
}

/// Payload of `quiz`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuizUpdate {
    pub quiz: Quiz,
    /// Identifies who answers. Despite the name, the value is stored as the
    /// quiz owner's user id.
    #[serde(default, alias = "turnOrder")]
    pub turn_order: Option<i64>,
}

/// Payload of `quiz_check`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuizCheckUpdate {
    #[serde(alias = "selectIdx")]
    pub select_idx: u32,
    #[serde(alias = "isCorrect")]
    pub is_correct: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lands: OneOrMany<LandPatch>,
    #[serde(default)]
    pub players: Option<Vec<Player>>,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// Payload of `bankruptcy`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BankruptcyUpdate {
    #[serde(alias = "roomState")]
    pub room_state: Option<RoomState>,
    #[serde(deserialize_with = "null_as_default")]
    pub lands: OneOrMany<LandPatch>,
    pub players: Option<Vec<Player>>,
}

/// Payload of `prison`, `exit` and `game_end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RosterUpdate {
    pub players: Option<Vec<Player>>,
}

/// Payload of `turn_end`. The room state is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TurnEndUpdate {
    #[serde(alias = "roomState")]
    pub room_state: RoomState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_land_patch_owner_absent_keeps() {
        let patch: LandPatch = serde_json::from_str(r#"{"land_id":3,"toll":40}"#).unwrap();
        assert_eq!(patch.owner_id, None);

        let mut land = Land::new(LandId(3));
        land.owner_id = Some(UserId(1));
        let merged = patch.apply(&land);
        assert_eq!(merged.owner_id, Some(UserId(1)));
        assert_eq!(merged.toll, 40);
    }

    #[test]
    fn test_land_patch_owner_null_clears() {
        let patch: LandPatch =
            serde_json::from_str(r#"{"land_id":3,"owner_id":null}"#).unwrap();
        assert_eq!(patch.owner_id, Some(None));

        let mut land = Land::new(LandId(3));
        land.owner_id = Some(UserId(1));
        assert_eq!(patch.apply(&land).owner_id, None);
    }

    #[test]
    fn test_land_patch_camel_case_owner_sets() {
        let patch: LandPatch = serde_json::from_str(r#"{"landId":3,"ownerId":9}"#).unwrap();
        assert_eq!(patch.land_id, LandId(3));
        assert_eq!(patch.owner_id, Some(Some(UserId(9))));
    }

    #[test]
    fn test_one_or_many_accepts_object_and_array() {
        let one: OneOrMany<LandPatch> = serde_json::from_str(r#"{"land_id":1}"#).unwrap();
        assert_eq!(one.as_slice().len(), 1);

        let many: OneOrMany<LandPatch> =
            serde_json::from_str(r#"[{"land_id":1},{"land_id":2}]"#).unwrap();
        assert_eq!(many.as_slice().len(), 2);
        assert!(OneOrMany::<LandPatch>::default().is_empty());
    }

    #[test]
    fn test_player_defaults_active_and_accepts_camel_case() {
        let player: Player =
            serde_json::from_str(r#"{"userId":5,"turnOrder":2,"skipTurn":true}"#).unwrap();
        assert_eq!(player.user_id, UserId(5));
        assert_eq!(player.turn_order, 2);
        assert!(player.skip_turn);
        assert!(player.active);
        assert_eq!(player.rank, None);
    }

    #[test]
    fn test_room_state_partial_defaults() {
        let state: RoomState = serde_json::from_str(r#"{"round":3,"pot":500}"#).unwrap();
        assert_eq!(state.round, 3);
        assert_eq!(state.pot, 500);
        assert_eq!(state.current_turn, 0);
        assert!(!state.double);
    }

    #[test]
    fn test_quiz_choices_skip_missing() {
        let quiz = Quiz {
            choice1: Some("a".into()),
            choice3: Some("c".into()),
            ..Quiz::default()
        };
        assert_eq!(quiz.choices().collect::<Vec<_>>(), vec!["a", "c"]);
    }

    #[test]
    fn test_turn_end_requires_room_state() {
        let result: Result<TurnEndUpdate, _> = serde_json::from_str("{}");
        assert!(result.is_err());
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId::from(42u64).to_string(), "42");
        assert_eq!(UserId(3).to_string(), "U-3");
        assert_eq!(LandId(8).to_string(), "L-8");
    }
}
