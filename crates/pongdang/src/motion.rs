//! Bridges session updates to the movement sequencer.

use pongdang_protocol::UserId;
use pongdang_session::Session;
use pongdang_tick::MotionGroup;

/// A player whose board position changed between two sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerMove {
    pub user_id: UserId,
    pub from: u32,
    pub to: u32,
}

/// Players present in both sessions whose position differs, in roster order.
pub fn position_changes(prev: &Session, next: &Session) -> Vec<PlayerMove> {
    next.players
        .iter()
        .filter_map(|player| {
            let before = prev.player(player.user_id)?;
            (before.position != player.position).then_some(PlayerMove {
                user_id: player.user_id,
                from: before.position,
                to: player.position,
            })
        })
        .collect()
}

/// Starts a walk in `group` for every position change.
///
/// Everything in flight is cancelled instead when `next` belongs to another
/// game: a new `START_GAME` (first or repeated), or a reset session with no
/// players.
pub fn animate_changes<S, L>(
    group: &mut MotionGroup<UserId>,
    prev: &Session,
    next: &Session,
    mut on_step: S,
    mut on_landed: L,
) -> Vec<PlayerMove>
where
    S: FnMut(UserId) -> Box<dyn FnMut(u32) + Send>,
    L: FnMut(UserId) -> Box<dyn FnOnce(u32) + Send>,
{
    if next.game != prev.game || next.started != prev.started || next.players.is_empty() {
        group.cancel_all();
        return Vec::new();
    }
    let moves = position_changes(prev, next);
    for mv in &moves {
        group.start(mv.user_id, mv.from, mv.to, on_step(mv.user_id), on_landed(mv.user_id));
    }
    moves
}
