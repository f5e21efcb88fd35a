use std::time::Duration;

use pongdang::prelude::*;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Read from `PONGDANG_*` variables, with `.env` loaded first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    url: String,
    room: String,
    game_type: String,
    token: Option<String>,
    user_id: Option<i64>,
    step_interval: Duration,
    autoplay: bool,
}

impl Settings {
    fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let room = get("PONGDANG_ROOM").ok_or("PONGDANG_ROOM is required")?;
        let user_id = match get("PONGDANG_USER_ID") {
            Some(raw) => Some(
                raw.parse::<i64>()
                    .map_err(|_| format!("PONGDANG_USER_ID must be a number, got {raw:?}"))?,
            ),
            None => None,
        };
        let step_ms = match get("PONGDANG_STEP_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| format!("PONGDANG_STEP_MS must be a number, got {raw:?}"))?,
            None => 300,
        };
        Ok(Self {
            url: get("PONGDANG_URL").unwrap_or_else(|| "ws://127.0.0.1:8080/ws".to_string()),
            room,
            game_type: get("PONGDANG_GAME_TYPE").unwrap_or_else(|| "marble".to_string()),
            token: get("PONGDANG_TOKEN").filter(|t| !t.is_empty()),
            user_id,
            step_interval: Duration::from_millis(step_ms),
            autoplay: matches!(get("PONGDANG_AUTOPLAY").as_deref(), Some("1" | "true")),
        })
    }
}

// ---------------------------------------------------------------------------
// Watch loop
// ---------------------------------------------------------------------------

fn connect(settings: &Settings) -> Result<MarbleClient, PongdangError> {
    let mut builder = MarbleClient::builder(settings.url.clone())
        .room(RoomConfig::new(settings.room.clone()).with_game_type(settings.game_type.clone()));
    if let Some(token) = &settings.token {
        builder = builder.token(StaticToken(token.clone()));
    }
    if let Some(user_id) = settings.user_id {
        builder = builder.identity(StaticIdentity(user_id));
    }
    builder.connect()
}

/// Messages `next` gained over `prev`, oldest first.
fn new_messages<'a>(prev: &Session, next: &'a Session) -> Vec<&'a str> {
    next.messages.since(prev.messages.total()).collect()
}

fn log_change(prev: &Session, next: &Session) {
    for message in new_messages(prev, next) {
        info!(%message, "game");
    }
    if next.room_state.current_turn != prev.room_state.current_turn {
        let player = next.current_player().map(|p| p.nickname.as_str());
        info!(turn = next.room_state.current_turn, round = next.room_state.round, player, "turn changed");
    }
    if prev.quiz.is_none() {
        if let Some(quiz) = &next.quiz {
            info!(question = %quiz.question, owner = ?next.quiz_owner_user_id, "quiz");
        }
    }
}

async fn watch(client: MarbleClient, settings: &Settings) -> Result<(), PongdangError> {
    let mut updates = client.watch_session();
    let mut prev = updates.borrow().clone();
    let mut motion = MotionGroup::new(MotionConfig::with_interval(settings.step_interval));

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("room closed");
                    break;
                }
                let next = updates.borrow_and_update().clone();
                log_change(&prev, &next);
                animate_changes(
                    &mut motion,
                    &prev,
                    &next,
                    |user| -> Box<dyn FnMut(u32) + Send> {
                        Box::new(move |pos: u32| tracing::debug!(%user, pos, "step"))
                    },
                    |user| -> Box<dyn FnOnce(u32) + Send> {
                        Box::new(move |pos: u32| info!(%user, pos, "landed"))
                    },
                );
                if settings.autoplay && client.is_my_turn() && next.room_state != prev.room_state {
                    if let Some(roll) = client.roll_dice() {
                        info!(dice = ?roll.dice, "rolled");
                    }
                }
                if client.room().was_forced_out() {
                    break;
                }
                prev = next;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }

    motion.cancel_all();
    client.close().await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    pongdang::logging::init();

    let settings = Settings::from_env()?;
    info!(url = %settings.url, room = %settings.room, "watching room");

    let client = connect(&settings)?;
    watch(client, &settings).await?;
    Ok(())
}
