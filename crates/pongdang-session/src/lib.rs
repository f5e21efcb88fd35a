//! Client-side read-model of one game session.
//!
//! The server owns every rule. This crate only projects the events it
//! announces into a [`Session`] value:
//!
//! ```text
//! Envelope ──→ reduce(&Session, &Envelope) ──→ Session
//! ```
//!
//! [`reduce`] is pure: no I/O, no clocks, no interior mutability. The same
//! inputs always produce structurally equal outputs, which is what the room
//! actor relies on to apply frames one at a time.

mod reducer;
mod session;

pub use reducer::{reduce, reduce_all, update_players, upsert_lands};
pub use session::{MessageLog, QuizResult, Session};
