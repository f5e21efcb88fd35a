//! The session aggregate and its queries.

use std::collections::VecDeque;

use pongdang_protocol::{Land, LandId, Player, Quiz, RoomState, UserId};

// ---------------------------------------------------------------------------
// MessageLog
// ---------------------------------------------------------------------------

/// Bounded log of human-readable event descriptions.
///
/// Holds at most [`MessageLog::CAPACITY`] entries; pushing past that drops
/// the oldest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLog {
    entries: VecDeque<String>,
    /// Messages ever pushed, evicted ones included.
    total: u64,
}

impl MessageLog {
    pub const CAPACITY: usize = 50;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>) {
        if self.entries.len() == Self::CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(message.into());
        self.total += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }

    /// Number of messages ever pushed. Keeps counting after eviction.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Messages pushed after the log had seen `total` messages, oldest
    /// first. Only those still retained are returned.
    pub fn since(&self, total: u64) -> impl Iterator<Item = &str> {
        let fresh = self.total.saturating_sub(total);
        let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(self.entries.len());
        self.entries
            .iter()
            .skip(self.entries.len() - fresh)
            .map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}

impl Extend<String> for MessageLog {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        for message in iter {
            self.push(message);
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Outcome of the last graded quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizResult {
    pub is_correct: bool,
    /// The index the player submitted.
    pub correct_idx: u32,
    pub explanation: Option<String>,
}

/// Everything the client knows about the room it is in.
///
/// Lives for one room visit. A fresh `START_GAME` rebuilds the game part;
/// leaving the room drops the whole value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub room_state: RoomState,
    /// Tiles in arrival order, unique per `land_id`.
    pub lands: Vec<Land>,
    /// Unique per `user_id`. Players are never removed, only deactivated.
    pub players: Vec<Player>,
    pub messages: MessageLog,
    pub quiz: Option<Quiz>,
    pub quiz_result: Option<QuizResult>,
    /// Who is answering the pending quiz.
    pub quiz_owner_user_id: Option<UserId>,
    pub started: bool,
    /// Bumped by every `START_GAME`; zero until the first one.
    pub game: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self, user_id: UserId) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn land(&self, land_id: LandId) -> Option<&Land> {
        self.lands.iter().find(|l| l.land_id == land_id)
    }

    pub fn active_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.active)
    }

    /// The active player whose `turn_order` matches `current_turn`.
    pub fn current_player(&self) -> Option<&Player> {
        let turn = self.room_state.current_turn;
        self.active_players().find(|p| p.turn_order == turn)
    }

    pub fn is_turn_of(&self, user_id: UserId) -> bool {
        self.current_player().is_some_and(|p| p.user_id == user_id)
    }

    /// Whether `user_id` is the one answering the pending quiz.
    pub fn is_quiz_owner(&self, user_id: UserId) -> bool {
        self.quiz.is_some() && self.quiz_owner_user_id == Some(user_id)
    }

    /// Lands owned by `user_id`, in board order.
    pub fn lands_of(&self, user_id: UserId) -> impl Iterator<Item = &Land> {
        self.lands
            .iter()
            .filter(move |l| l.owner_id == Some(user_id))
    }

    /// Players ranked: assigned ranks first (ascending), then by balance,
    /// richest first. Ties keep roster order.
    pub fn standings(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| match (a.rank, b.rank) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b.balance.cmp(&a.balance),
        });
        ranked
    }
}
