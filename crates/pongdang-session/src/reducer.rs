//! The pure session reducer.
//!
//! Every case falls back to the previous value when the server leaves a
//! field out. Nothing here can fail: the worst an event can do is leave the
//! session unchanged.

use std::collections::{HashMap, HashSet};

use pongdang_protocol::{Envelope, GameEvent, Land, LandPatch, Player, UserId};
use tracing::{debug, error};

use crate::session::{QuizResult, Session};

/// Applies one event, returning the next session.
///
/// Unknown events return an unchanged copy and do not touch the message
/// log. Every other event appends its messages.
pub fn reduce(state: &Session, envelope: &Envelope) -> Session {
    if let GameEvent::Unknown { kind, reason } = &envelope.event {
        debug!(kind = kind.as_deref(), %reason, "unknown event left session unchanged");
        return state.clone();
    }

    let mut next = apply(state, &envelope.event);
    next.messages.extend(envelope.messages.iter().cloned());
    check_owners(&next);
    next
}

/// Folds a sequence of events over `state`.
pub fn reduce_all<'a>(
    state: &Session,
    envelopes: impl IntoIterator<Item = &'a Envelope>,
) -> Session {
    envelopes
        .into_iter()
        .fold(state.clone(), |acc, envelope| reduce(&acc, envelope))
}

fn apply(state: &Session, event: &GameEvent) -> Session {
    let mut next = state.clone();

    match event {
        GameEvent::StartGame(game) => {
            next.room_state = game.room_state.clone();
            next.lands = upsert_lands(&[], &patches(&game.lands));
            next.players = update_players(&[], Some(&game.players));
            next.quiz = None;
            next.quiz_result = None;
            next.quiz_owner_user_id = None;
            next.started = true;
            next.game = state.game.wrapping_add(1);
        }
        GameEvent::Roll(update) | GameEvent::Salary(update) => {
            if let Some(room_state) = &update.room_state {
                next.room_state = room_state.clone();
            }
            next.players = update_players(&state.players, update.players.as_ref());
        }
        GameEvent::Purchase(update) => {
            next.lands = upsert_lands(&state.lands, update.lands.as_slice());
            next.players = update_players(&state.players, update.players.as_ref());
        }
        GameEvent::Toll(update) => {
            if let Some(lands) = update.lands.as_ref().filter(|l| !l.is_empty()) {
                next.lands = upsert_lands(&[], &patches(lands));
            }
            next.players = update_players(&state.players, update.players.as_ref());
        }
        GameEvent::Tax(patch) => {
            if let Some(room_state) = &patch.room_state {
                next.room_state = room_state.clone();
            }
            if let Some(lands) = &patch.lands {
                next.lands = upsert_lands(&state.lands, lands);
            }
            next.players = update_players(&state.players, patch.players.as_ref());
        }
        GameEvent::Quiz(update) => {
            next.quiz = Some(update.quiz.clone());
            next.quiz_result = None;
            next.quiz_owner_user_id = update
                .turn_order
                .map(UserId)
                .or(state.quiz_owner_user_id);
        }
        GameEvent::QuizCheck(update) => {
            if state.quiz.is_none() {
                debug!("quiz result arrived with no quiz pending");
            }
            next.lands = upsert_lands(&state.lands, update.lands.as_slice());
            next.players = update_players(&state.players, update.players.as_ref());
            next.quiz_result = Some(QuizResult {
                is_correct: update.is_correct,
                correct_idx: update.select_idx,
                explanation: update
                    .explanation
                    .clone()
                    .or_else(|| state.quiz.as_ref().and_then(|q| q.explanation.clone())),
            });
        }
        GameEvent::QuizClear => {
            next.quiz = None;
            next.quiz_result = None;
            next.quiz_owner_user_id = None;
        }
        GameEvent::Prison(update) | GameEvent::Exit(update) | GameEvent::GameEnd(update) => {
            next.players = update_players(&state.players, update.players.as_ref());
        }
        GameEvent::Bankruptcy(update) => {
            if let Some(room_state) = &update.room_state {
                next.room_state = room_state.clone();
            }
            next.lands = upsert_lands(&state.lands, update.lands.as_slice());
            next.players = update_players(&state.players, update.players.as_ref());
        }
        GameEvent::TurnEnd(update) => {
            next.room_state = update.room_state.clone();
        }
        GameEvent::Unknown { .. } => {}
    }

    next
}

fn patches(lands: &[Land]) -> Vec<LandPatch> {
    lands.iter().cloned().map(LandPatch::from).collect()
}

/// Merges land patches into `previous` by `land_id`.
///
/// Known tiles keep every field the patch leaves out; unknown ids are
/// appended. Applying the same patches twice gives the same result as
/// applying them once.
pub fn upsert_lands(previous: &[Land], patches: &[LandPatch]) -> Vec<Land> {
    let mut lands = previous.to_vec();
    for patch in patches {
        match lands.iter_mut().find(|l| l.land_id == patch.land_id) {
            Some(land) => *land = patch.apply(land),
            None => lands.push(patch.to_land()),
        }
    }
    lands
}

/// Reconciles an incoming roster with the known players.
///
/// - `None` or an empty roster keeps `previous`.
/// - Known players take the incoming version; players missing from the
///   roster stay, marked inactive.
/// - New players are appended in roster order. A user id repeated in the
///   roster keeps its last entry.
/// - A result where two active players share a `turn_order` is rejected
///   and `previous` is kept.
pub fn update_players(previous: &[Player], incoming: Option<&Vec<Player>>) -> Vec<Player> {
    let Some(incoming) = incoming.filter(|roster| !roster.is_empty()) else {
        return previous.to_vec();
    };

    let latest = |user_id: UserId| incoming.iter().rev().find(|p| p.user_id == user_id);

    let mut players: Vec<Player> = previous
        .iter()
        .map(|known| match latest(known.user_id) {
            Some(update) => update.clone(),
            None => Player {
                active: false,
                ..known.clone()
            },
        })
        .collect();

    let mut seen: HashSet<UserId> = players.iter().map(|p| p.user_id).collect();
    for player in incoming {
        if seen.insert(player.user_id) {
            if let Some(update) = latest(player.user_id) {
                players.push(update.clone());
            }
        }
    }

    if let Some(conflict) = turn_conflict(&players) {
        error!(
            turn_order = conflict.turn_order,
            first = %conflict.first,
            second = %conflict.second,
            roster = incoming.len(),
            "roster has two active players on one turn, keeping previous"
        );
        return previous.to_vec();
    }
    players
}

/// Two active players sharing a turn.
#[derive(Debug, PartialEq, Eq)]
struct TurnConflict {
    turn_order: i64,
    first: UserId,
    second: UserId,
}

fn turn_conflict(players: &[Player]) -> Option<TurnConflict> {
    let mut seen: HashMap<i64, UserId> = HashMap::new();
    players.iter().filter(|p| p.active).find_map(|p| {
        seen.insert(p.turn_order, p.user_id).map(|first| TurnConflict {
            turn_order: p.turn_order,
            first,
            second: p.user_id,
        })
    })
}

fn check_owners(session: &Session) {
    if session.players.is_empty() {
        return;
    }
    for land in &session.lands {
        if let Some(owner) = land.owner_id {
            if session.player(owner).is_none() {
                debug!(land = %land.land_id, %owner, "land owned by unknown player");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pongdang_protocol::LandId;

    fn player(id: i64, turn_order: i64) -> Player {
        Player::new(UserId(id), format!("p{id}"), turn_order)
    }

    #[test]
    fn test_update_players_none_keeps_previous() {
        let previous = vec![player(1, 0)];
        assert_eq!(update_players(&previous, None), previous);
        assert_eq!(update_players(&previous, Some(&vec![])), previous);
    }

    #[test]
    fn test_update_players_missing_marked_inactive() {
        let previous = vec![player(1, 0), player(2, 1)];
        let roster = vec![player(2, 1)];
        let next = update_players(&previous, Some(&roster));
        assert_eq!(next.len(), 2);
        assert!(!next[0].active);
        assert!(next[1].active);
    }

    #[test]
    fn test_update_players_appends_new() {
        let previous = vec![player(1, 0)];
        let roster = vec![player(1, 0), player(3, 1)];
        let next = update_players(&previous, Some(&roster));
        assert_eq!(next.iter().map(|p| p.user_id.0).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_update_players_duplicate_user_last_wins() {
        let mut richer = player(1, 0);
        richer.balance = 50;
        let roster = vec![player(1, 0), richer];
        let next = update_players(&[], Some(&roster));
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].balance, 50);
    }

    #[test]
    fn test_update_players_turn_conflict_rejected() {
        let previous = vec![player(1, 0), player(2, 1)];
        let roster = vec![player(1, 0), player(2, 0)];
        assert_eq!(update_players(&previous, Some(&roster)), previous);
    }

    #[test]
    fn test_turn_conflict_names_both_players() {
        let roster = vec![player(1, 0), player(2, 1), player(3, 1)];
        assert_eq!(
            turn_conflict(&roster),
            Some(TurnConflict {
                turn_order: 1,
                first: UserId(2),
                second: UserId(3),
            })
        );
        assert_eq!(turn_conflict(&[player(1, 0), player(2, 1)]), None);
    }

    #[test]
    fn test_update_players_inactive_may_share_turn() {
        let mut out = player(2, 0);
        out.active = false;
        let roster = vec![player(1, 0), out];
        assert_eq!(update_players(&[], Some(&roster)).len(), 2);
    }

    #[test]
    fn test_upsert_lands_merges_and_appends() {
        let mut seoul = Land::new(LandId(1));
        seoul.name = "Seoul".into();
        let patch_existing = LandPatch {
            land_id: LandId(1),
            owner_id: Some(Some(UserId(9))),
            ..LandPatch::default()
        };
        let patch_new = LandPatch {
            land_id: LandId(5),
            price: Some(300),
            ..LandPatch::default()
        };
        let lands = upsert_lands(&[seoul], &[patch_existing, patch_new]);
        assert_eq!(lands.len(), 2);
        assert_eq!(lands[0].name, "Seoul");
        assert_eq!(lands[0].owner_id, Some(UserId(9)));
        assert_eq!(lands[1].land_id, LandId(5));
        assert_eq!(lands[1].price, 300);
    }
}
