//! Integration tests for frame decoding, using frames shaped like the ones
//! the game server pushes.

use std::sync::Arc;

use pongdang_protocol::{
    Decoder, DiagnosticSink, ForceExit, GameEvent, Inbound, LandId, RecordingDiagnostics,
    UserId, decode_str, decode_value,
};
use serde_json::json;

fn event(inbound: Inbound) -> (GameEvent, Vec<String>) {
    match inbound {
        Inbound::Event(env) => (env.event, env.messages),
        Inbound::ForceExit(exit) => panic!("unexpected force exit: {exit:?}"),
    }
}

// ===========================================================================
// Known events
// ===========================================================================

#[test]
fn test_decode_game_start_snapshot() {
    let frame = json!({
        "type": "game_start",
        "data": {
            "roomState": { "current_turn": 0, "round": 1, "max_round": 10, "pot": 0 },
            "lands": [
                { "land_id": 0, "name": "Start", "price": 0, "toll": 0, "owner_id": null, "color": "gray" },
                { "land_id": 1, "name": "Seoul", "price": 100, "toll": 20, "owner_id": null, "color": "red" }
            ],
            "players": [
                { "user_id": 1, "nickname": "a", "balance": 1000, "position": 0, "turn_order": 0 },
                { "user_id": 2, "nickname": "b", "balance": 1000, "position": 0, "turn_order": 1 }
            ]
        }
    });
    let (event, messages) = event(decode_value(&frame));
    let GameEvent::StartGame(game) = event else {
        panic!("expected START_GAME, got {event:?}");
    };
    assert_eq!(game.room_state.max_round, 10);
    assert_eq!(game.lands.len(), 2);
    assert_eq!(game.lands[1].name, "Seoul");
    assert_eq!(game.players[1].user_id, UserId(2));
    assert!(messages.is_empty());
}

#[test]
fn test_decode_dice_alias_is_roll() {
    let frame = json!({ "type": "DICE", "data": { "players": [] } });
    let (event, _) = event(decode_value(&frame));
    assert_eq!(event.name(), "ROLL");
}

#[test]
fn test_decode_purchase_single_land_object() {
    let frame = json!({
        "type": "purchase",
        "data": { "lands": { "land_id": 4, "owner_id": 1 } },
        "message": "a bought Busan"
    });
    let (event, messages) = event(decode_value(&frame));
    let GameEvent::Purchase(update) = event else {
        panic!("expected PURCHASE");
    };
    let patches = update.lands.as_slice();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].land_id, LandId(4));
    assert_eq!(patches[0].owner_id, Some(Some(UserId(1))));
    assert_eq!(update.players, None);
    assert_eq!(messages, vec!["a bought Busan"]);
}

#[test]
fn test_decode_quiz_reads_turn_order_camel_case() {
    let frame = json!({
        "type": "quiz",
        "data": {
            "quiz": { "position": 6, "question": "2+2?", "choice1": "3", "choice2": "4", "answer_idx": 1 },
            "turnOrder": 2
        }
    });
    let (event, _) = event(decode_value(&frame));
    let GameEvent::Quiz(update) = event else {
        panic!("expected QUIZ");
    };
    assert_eq!(update.turn_order, Some(2));
    assert_eq!(update.quiz.choices().count(), 2);
}

#[test]
fn test_decode_quiz_check_without_lands() {
    let frame = json!({
        "type": "quiz_check",
        "data": { "select_idx": 1, "is_correct": true, "lands": null, "players": [] }
    });
    let (event, _) = event(decode_value(&frame));
    let GameEvent::QuizCheck(update) = event else {
        panic!("expected QUIZ_CHECK");
    };
    assert!(update.is_correct);
    assert!(update.lands.is_empty());
    assert_eq!(update.players, Some(vec![]));
}

#[test]
fn test_decode_quiz_clear_without_data() {
    let (event, _) = event(decode_str(r#"{"type":"quiz_clear"}"#));
    assert_eq!(event, GameEvent::QuizClear);
}

#[test]
fn test_decode_payload_at_top_level_when_data_absent() {
    let frame = json!({ "type": "turn_end", "roomState": { "current_turn": 3, "round": 2 } });
    let (event, _) = event(decode_value(&frame));
    let GameEvent::TurnEnd(update) = event else {
        panic!("expected TURN_END");
    };
    assert_eq!(update.room_state.current_turn, 3);
}

#[test]
fn test_decode_bankruptcy_messages_array() {
    let frame = json!({
        "type": "bankruptcy",
        "data": {
            "roomState": { "round": 4 },
            "lands": [{ "land_id": 2, "owner_id": null }],
            "players": [],
            "messages": ["b went bankrupt", "b's lands were released"]
        }
    });
    let (event, messages) = event(decode_value(&frame));
    let GameEvent::Bankruptcy(update) = event else {
        panic!("expected BANKRUPTCY");
    };
    assert_eq!(update.lands.as_slice()[0].owner_id, Some(None));
    assert_eq!(messages.len(), 2);
}

// ===========================================================================
// Unknown and malformed frames
// ===========================================================================

#[test]
fn test_decode_invalid_json_is_unknown() {
    let (event, _) = event(decode_str("{not json"));
    assert!(matches!(event, GameEvent::Unknown { kind: None, .. }));
}

#[test]
fn test_decode_unrecognized_type_keeps_kind() {
    let (event, _) = event(decode_str(r#"{"type":"teleport","data":{}}"#));
    match event {
        GameEvent::Unknown { kind, .. } => assert_eq!(kind.as_deref(), Some("teleport")),
        other => panic!("expected UNKNOWN, got {other:?}"),
    }
}

#[test]
fn test_decode_missing_type_is_unknown() {
    let (event, _) = event(decode_str(r#"{"data":{}}"#));
    assert!(event.is_unknown());
}

#[test]
fn test_decode_non_object_is_unknown() {
    let (event, _) = event(decode_str("[1,2,3]"));
    assert!(event.is_unknown());
}

#[test]
fn test_decode_shape_mismatch_is_unknown() {
    // turn_end without a room state cannot be applied.
    let (ev, _) = event(decode_str(r#"{"type":"turn_end","data":{}}"#));
    assert!(ev.is_unknown());

    let (event, _) = event(decode_str(r#"{"type":"roll","data":{"players":"nope"}}"#));
    assert!(event.is_unknown());
}

// ===========================================================================
// Force exit
// ===========================================================================

#[test]
fn test_decode_force_exit_top_level() {
    let inbound = decode_str(r#"{"type":"force_exit","reason":"duplicate login","target_url":"/login"}"#);
    assert_eq!(
        inbound,
        Inbound::ForceExit(ForceExit {
            reason: Some("duplicate login".into()),
            target_url: Some("/login".into()),
        })
    );
}

#[test]
fn test_decode_force_exit_inside_prison_frame() {
    let inbound = decode_str(r#"{"type":"prison","data":{"type":"force_exit"}}"#);
    assert_eq!(inbound, Inbound::ForceExit(ForceExit::default()));
}

// ===========================================================================
// Decoder with diagnostics
// ===========================================================================

#[test]
fn test_decoder_reports_unknown_frames_only() {
    let sink = Arc::new(RecordingDiagnostics::new());
    let decoder = Decoder::new(sink.clone());

    decoder.decode(r#"{"type":"quiz_clear"}"#);
    decoder.decode("garbage");
    decoder.decode(r#"{"type":"warp"}"#);

    let entries = sink.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, None);
    assert_eq!(entries[0].raw, "garbage");
    assert_eq!(entries[1].kind.as_deref(), Some("warp"));
}

#[test]
fn test_recording_diagnostics_direct() {
    let sink = RecordingDiagnostics::new();
    assert!(sink.is_empty());
    sink.unknown_frame(Some("x"), "because", "{}");
    assert_eq!(sink.len(), 1);
}
