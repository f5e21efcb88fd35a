//! The closed set of inbound game events.

use crate::types::{
    BankruptcyUpdate, Game, GamePatch, PurchaseUpdate, QuizCheckUpdate, QuizUpdate,
    RosterUpdate, RoundUpdate, TollUpdate, TurnEndUpdate,
};

/// Which event a frame's `type` field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartGame,
    Roll,
    Purchase,
    Toll,
    Tax,
    Salary,
    Quiz,
    QuizCheck,
    QuizClear,
    Prison,
    Bankruptcy,
    Exit,
    TurnEnd,
    GameEnd,
    ForceExit,
}

impl EventKind {
    /// Matches a `type` discriminator, case-insensitively and with the
    /// aliases the server has used over time. `-` and `_` are equivalent.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Some(match normalized.as_str() {
            "game_start" | "start_game" | "start" => Self::StartGame,
            "roll" | "dice" | "roll_dice" => Self::Roll,
            "purchase" | "buy" => Self::Purchase,
            "toll" => Self::Toll,
            "tax" => Self::Tax,
            "salary" => Self::Salary,
            "quiz" => Self::Quiz,
            "quiz_check" | "quiz_result" => Self::QuizCheck,
            "quiz_clear" => Self::QuizClear,
            "prison" | "jail" => Self::Prison,
            "bankruptcy" | "bankrupt" => Self::Bankruptcy,
            "exit" | "leave" => Self::Exit,
            "turn_end" | "turn" => Self::TurnEnd,
            "game_end" | "end" => Self::GameEnd,
            "force_exit" => Self::ForceExit,
            _ => return None,
        })
    }
}

/// A decoded game event. Each variant carries what its state transition
/// needs and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameEvent {
    StartGame(Game),
    Roll(RoundUpdate),
    Purchase(PurchaseUpdate),
    Toll(TollUpdate),
    Tax(GamePatch),
    Salary(RoundUpdate),
    Quiz(QuizUpdate),
    QuizCheck(QuizCheckUpdate),
    QuizClear,
    Prison(RosterUpdate),
    Bankruptcy(BankruptcyUpdate),
    Exit(RosterUpdate),
    TurnEnd(TurnEndUpdate),
    GameEnd(RosterUpdate),
    /// Anything that could not be decoded. `kind` is the raw `type` value
    /// when there was one.
    Unknown { kind: Option<String>, reason: String },
}

impl GameEvent {
    /// Upper-case event name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartGame(_) => "START_GAME",
            Self::Roll(_) => "ROLL",
            Self::Purchase(_) => "PURCHASE",
            Self::Toll(_) => "TOLL",
            Self::Tax(_) => "TAX",
            Self::Salary(_) => "SALARY",
            Self::Quiz(_) => "QUIZ",
            Self::QuizCheck(_) => "QUIZ_CHECK",
            Self::QuizClear => "QUIZ_CLEAR",
            Self::Prison(_) => "PRISON",
            Self::Bankruptcy(_) => "BANKRUPTCY",
            Self::Exit(_) => "EXIT",
            Self::TurnEnd(_) => "TURN_END",
            Self::GameEnd(_) => "GAME_END",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown { .. })
    }

    pub(crate) fn unknown(kind: Option<&str>, reason: impl Into<String>) -> Self {
        Self::Unknown {
            kind: kind.map(str::to_owned),
            reason: reason.into(),
        }
    }
}

/// A decoded event plus the human-readable messages that came with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub event: GameEvent,
    pub messages: Vec<String>,
}

impl Envelope {
    pub fn new(event: GameEvent) -> Self {
        Self {
            event,
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

impl From<GameEvent> for Envelope {
    fn from(event: GameEvent) -> Self {
        Self::new(event)
    }
}

/// The server told this client to leave the room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForceExit {
    pub reason: Option<String>,
    /// Where to go next. Callers fall back to their own route when absent.
    pub target_url: Option<String>,
}

/// What a single inbound frame turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Event(Envelope),
    ForceExit(ForceExit),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_parse_aliases() {
        assert_eq!(EventKind::parse("game_start"), Some(EventKind::StartGame));
        assert_eq!(EventKind::parse("START_GAME"), Some(EventKind::StartGame));
        assert_eq!(EventKind::parse("dice"), Some(EventKind::Roll));
        assert_eq!(EventKind::parse("quiz-check"), Some(EventKind::QuizCheck));
        assert_eq!(EventKind::parse("turn"), Some(EventKind::TurnEnd));
        assert_eq!(EventKind::parse(" end "), Some(EventKind::GameEnd));
        assert_eq!(EventKind::parse("force_exit"), Some(EventKind::ForceExit));
    }

    #[test]
    fn test_event_kind_parse_unknown_is_none() {
        assert_eq!(EventKind::parse("teleport"), None);
        assert_eq!(EventKind::parse(""), None);
    }

    #[test]
    fn test_envelope_with_message() {
        let env = Envelope::new(GameEvent::QuizClear).with_message("cleared");
        assert_eq!(env.event.name(), "QUIZ_CLEAR");
        assert_eq!(env.messages, vec!["cleared".to_string()]);
    }
}
