//! Room actor: a Tokio task that owns the session for one room visit.
//!
//! The STOMP subscription handler only forwards raw bodies into a channel.
//! The actor drains that channel in arrival order, decodes each body,
//! reduces it into the [`Session`] and publishes the result on a `watch`
//! channel. Nothing else mutates the session.

use std::sync::Arc;

use pongdang_protocol::{Decoder, DiagnosticSink, ForceExit, Inbound, RoomId, UserId};
use pongdang_session::{Session, reduce};
use pongdang_transport::{IdentityProvider, StompHandle, StompMessage, SubscriptionId};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace, warn};

use crate::exit::{ForceExitGuard, Navigator};
use crate::{ActionPublisher, RoomConfig, RoomError};

/// Commands sent to the room actor.
enum RoomCommand {
    Leave { reply: oneshot::Sender<()> },
}

/// A joined room.
///
/// Dropping the client leaves the room the same way [`leave`](Self::leave)
/// does, without waiting for the actor to finish.
#[derive(Debug)]
pub struct RoomClient {
    config: RoomConfig,
    session: watch::Receiver<Session>,
    commands: mpsc::UnboundedSender<RoomCommand>,
    publisher: ActionPublisher,
    guard: Arc<ForceExitGuard>,
}

impl RoomClient {
    /// Subscribes to the room topic and spawns the actor.
    ///
    /// Must be called from within a Tokio runtime. The subscription is
    /// registered with the STOMP client immediately and re-sent on every
    /// reconnect, so joining before the transport is up is fine.
    ///
    /// # Errors
    /// [`RoomError::InvalidConfig`] if the config has no room id.
    pub fn join(
        stomp: StompHandle,
        config: RoomConfig,
        navigator: Arc<dyn Navigator>,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, RoomError> {
        let config = config.validated()?;
        let topic = config.topic();

        let (frame_tx, frame_rx) = mpsc::unbounded_channel::<String>();
        let subscription = stomp.subscribe(topic.clone(), move |msg: StompMessage| {
            let _ = frame_tx.send(msg.body);
        });

        let (session_tx, session_rx) = watch::channel(Session::new());
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let guard = Arc::new(ForceExitGuard::new());

        let actor = RoomActor {
            room_id: config.room_id.clone(),
            exit_route: config.exit_route.clone(),
            stomp: stomp.clone(),
            subscription: Some(subscription),
            decoder: Decoder::new(diagnostics),
            session: session_tx,
            frames: frame_rx,
            commands: cmd_rx,
            navigator,
            guard: Arc::clone(&guard),
        };
        tokio::spawn(actor.run());

        info!(room_id = %config.room_id, %topic, "joined room");

        Ok(Self {
            publisher: ActionPublisher::new(stomp, &config),
            config,
            session: session_rx,
            commands: cmd_tx,
            guard,
        })
    }

    pub fn room_id(&self) -> &RoomId {
        &self.config.room_id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// A snapshot of the current session.
    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    /// A receiver notified after every event that changed the session.
    pub fn watch_session(&self) -> watch::Receiver<Session> {
        self.session.clone()
    }

    /// The publisher for this room's actions.
    pub fn actions(&self) -> &ActionPublisher {
        &self.publisher
    }

    /// Whether it is the turn of the user `identity` names.
    pub fn is_my_turn(&self, identity: &dyn IdentityProvider) -> bool {
        identity
            .user_id()
            .is_some_and(|id| self.session.borrow().is_turn_of(UserId(id)))
    }

    /// Whether the user `identity` names owns the pending quiz.
    pub fn is_my_quiz(&self, identity: &dyn IdentityProvider) -> bool {
        identity
            .user_id()
            .is_some_and(|id| self.session.borrow().is_quiz_owner(UserId(id)))
    }

    /// Whether the server forced this client out of the room.
    pub fn was_forced_out(&self) -> bool {
        self.guard.has_fired()
    }

    /// Unsubscribes from the room topic and stops the actor.
    ///
    /// # Errors
    /// [`RoomError::Closed`] if the room was already left.
    pub async fn leave(&self) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(RoomCommand::Leave { reply: reply_tx })
            .map_err(|_| RoomError::Closed(self.config.room_id.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Closed(self.config.room_id.clone()))
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor {
    room_id: RoomId,
    exit_route: String,
    stomp: StompHandle,
    subscription: Option<SubscriptionId>,
    decoder: Decoder,
    session: watch::Sender<Session>,
    frames: mpsc::UnboundedReceiver<String>,
    commands: mpsc::UnboundedReceiver<RoomCommand>,
    navigator: Arc<dyn Navigator>,
    guard: Arc<ForceExitGuard>,
}

impl RoomActor {
    async fn run(mut self) {
        debug!(room_id = %self.room_id, "room actor started");
        let mut frames_open = true;

        loop {
            tokio::select! {
                frame = self.frames.recv(), if frames_open => match frame {
                    Some(text) => self.handle_frame(&text),
                    None => {
                        debug!(room_id = %self.room_id, "room topic closed");
                        frames_open = false;
                    }
                },
                cmd = self.commands.recv() => {
                    self.teardown();
                    if let Some(RoomCommand::Leave { reply }) = cmd {
                        let _ = reply.send(());
                    }
                    break;
                }
            }
        }

        debug!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle_frame(&mut self, text: &str) {
        if self.guard.has_fired() {
            trace!(room_id = %self.room_id, "already forced out, frame dropped");
            return;
        }

        match self.decoder.decode(text) {
            Inbound::Event(envelope) => {
                let changed = self.session.send_if_modified(|session| {
                    let next = reduce(session, &envelope);
                    if next == *session {
                        return false;
                    }
                    *session = next;
                    true
                });
                trace!(
                    room_id = %self.room_id,
                    event = envelope.event.name(),
                    changed,
                    "event applied"
                );
            }
            Inbound::ForceExit(exit) => self.force_exit(exit),
        }
    }

    fn force_exit(&mut self, exit: ForceExit) {
        if !self.guard.fire() {
            debug!(room_id = %self.room_id, "repeated force exit ignored");
            return;
        }

        let route = exit
            .target_url
            .unwrap_or_else(|| self.exit_route.clone());
        warn!(
            room_id = %self.room_id,
            reason = exit.reason.as_deref(),
            %route,
            "forced out of room"
        );

        self.session.send_replace(Session::new());
        self.unsubscribe();
        self.navigator.navigate(&route);
    }

    fn teardown(&mut self) {
        self.unsubscribe();
        self.session.send_replace(Session::new());
        info!(room_id = %self.room_id, "left room");
    }

    fn unsubscribe(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.stomp.unsubscribe(id);
        }
    }
}
