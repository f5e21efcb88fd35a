//! Wire protocol for the pong-marble game.
//!
//! - **Types** ([`Land`], [`Player`], [`RoomState`], [`Quiz`], payloads):
//!   what the server pushes.
//! - **Events** ([`GameEvent`], [`Envelope`], [`Inbound`]): the closed set
//!   a frame decodes into.
//! - **Decoder** ([`decode_str`], [`Decoder`], [`MessageExtractor`]): frame
//!   text to events, never failing.
//! - **Actions** ([`Action`], [`DiceRoll`]): what the client sends back.
//!
//! ```text
//! Transport (STOMP body) → Protocol (Inbound) → Session (reduce)
//! ```

mod action;
mod codec;
mod decoder;
mod error;
mod event;
mod types;

pub use action::{Action, DiceRoll};
pub use codec::{Codec, JsonCodec};
pub use decoder::{
    Decoder, Diagnostic, DiagnosticSink, MessageExtractor, MessageSource,
    RecordingDiagnostics, TracingDiagnostics, decode_str, decode_value,
};
pub use error::ProtocolError;
pub use event::{Envelope, EventKind, ForceExit, GameEvent, Inbound};
pub use types::{
    BankruptcyUpdate, Game, GamePatch, Land, LandId, LandPatch, OneOrMany, Player,
    PurchaseUpdate, Quiz, QuizCheckUpdate, QuizUpdate, RoomId, RoomState, RosterUpdate,
    RoundUpdate, TollUpdate, TurnEndUpdate, UserId,
};
