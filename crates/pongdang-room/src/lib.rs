//! Room layer for the pongdang session client.
//!
//! Joining a room subscribes to its topic and spawns an actor task that owns
//! the [`Session`](pongdang_session::Session). Actions go out through an
//! [`ActionPublisher`].
//!
//! # Key types
//!
//! - [`RoomClient`]: a joined room: session snapshots, watch channel, leave
//! - [`ActionPublisher`]: one method per player action
//! - [`RoomConfig`]: room id, game type, topic prefix, exit route
//! - [`Navigator`]: where the app goes on a forced exit

mod config;
mod error;
mod exit;
mod publisher;
mod room;

pub use config::RoomConfig;
pub use error::RoomError;
pub use exit::{ForceExitGuard, LogNavigator, Navigator};
pub use publisher::ActionPublisher;
pub use room::RoomClient;
