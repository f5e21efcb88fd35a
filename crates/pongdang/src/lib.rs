//! # Pongdang
//!
//! Session client for the pong-marble board game.
//!
//! The client keeps one STOMP-over-WebSocket session to the game server,
//! decodes the events pushed on the room topic, folds them into a
//! [`Session`](pongdang_session::Session) and publishes player actions back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pongdang::prelude::*;
//!
//! # async fn run() -> Result<(), PongdangError> {
//! pongdang::logging::init();
//! let client = MarbleClient::builder("ws://127.0.0.1:8080/ws")
//!     .room(RoomConfig::new("42"))
//!     .token(StaticToken("token".into()))
//!     .identity(StaticIdentity(7))
//!     .connect()?;
//!
//! let mut updates = client.watch_session();
//! while updates.changed().await.is_ok() {
//!     if client.is_my_turn() {
//!         client.roll_dice();
//!     }
//! }
//! client.close().await
//! # }
//! ```

mod client;
mod error;
pub mod logging;
pub mod motion;

pub use client::{MarbleClient, MarbleClientBuilder};
pub use error::PongdangError;

pub use pongdang_protocol as protocol;
pub use pongdang_room as room;
pub use pongdang_session as session;
pub use pongdang_tick as tick;
pub use pongdang_transport as transport;

pub mod prelude {
    pub use crate::motion::{PlayerMove, animate_changes, position_changes};
    pub use crate::{MarbleClient, MarbleClientBuilder, PongdangError};
    pub use pongdang_protocol::{
        Action, DiceRoll, GameEvent, Land, LandId, Player, Quiz, RoomId, RoomState, UserId,
    };
    pub use pongdang_room::{ActionPublisher, LogNavigator, Navigator, RoomClient, RoomConfig};
    pub use pongdang_session::{MessageLog, QuizResult, Session};
    pub use pongdang_tick::{MotionConfig, MotionGroup, MoveHandle};
    pub use pongdang_transport::{StaticIdentity, StaticToken, StompConfig};
}
