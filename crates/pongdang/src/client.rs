//! `MarbleClient` builder: one WebSocket, one STOMP session, one room.
//!
//! This ties the layers together: transport → protocol → session → room.

use std::sync::Arc;

use pongdang_protocol::{DiagnosticSink, DiceRoll, Player, TracingDiagnostics, UserId};
use pongdang_room::{ActionPublisher, LogNavigator, Navigator, RoomClient, RoomConfig};
use pongdang_session::Session;
use pongdang_transport::{
    Anonymous, Connector, Credentials, IdentityProvider, StompClient, StompConfig, StompHandle,
    TokenProvider, WebSocketConnector,
};
use tokio::sync::watch;

use crate::PongdangError;

/// Builder for a [`MarbleClient`].
///
/// # Example
///
/// ```rust,ignore
/// let client = MarbleClient::builder("wss://game.example/ws")
///     .room(RoomConfig::new("42"))
///     .token(StaticToken(token))
///     .identity(StaticIdentity(user_id))
///     .connect()?;
/// ```
pub struct MarbleClientBuilder {
    url: String,
    room: Option<RoomConfig>,
    stomp: StompConfig,
    token: Arc<dyn TokenProvider>,
    identity: Arc<dyn IdentityProvider>,
    navigator: Arc<dyn Navigator>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl MarbleClientBuilder {
    /// Creates a builder for the given WebSocket endpoint.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            room: None,
            stomp: StompConfig::default(),
            token: Arc::new(Anonymous),
            identity: Arc::new(Anonymous),
            navigator: Arc::new(LogNavigator),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    /// The room to join. Required.
    pub fn room(mut self, config: RoomConfig) -> Self {
        self.room = Some(config);
        self
    }

    pub fn stomp_config(mut self, config: StompConfig) -> Self {
        self.stomp = config;
        self
    }

    pub fn token(mut self, token: impl TokenProvider) -> Self {
        self.token = Arc::new(token);
        self
    }

    pub fn identity(mut self, identity: impl IdentityProvider) -> Self {
        self.identity = Arc::new(identity);
        self
    }

    /// Where to go when the server forces this client out.
    /// Defaults to [`LogNavigator`].
    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    /// Receives frames that did not decode. Defaults to logging them.
    pub fn diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Dials the endpoint over WebSocket and joins the room.
    ///
    /// Returns as soon as the background tasks are running; the STOMP
    /// session comes up asynchronously.
    ///
    /// # Errors
    /// [`PongdangError::Config`] if the URL is not `ws://`/`wss://` or no
    /// room was set; [`PongdangError::Room`] for an invalid room config.
    pub fn connect(self) -> Result<MarbleClient, PongdangError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(PongdangError::Config(format!(
                "url must be ws:// or wss://, got {:?}",
                self.url
            )));
        }
        let connector = WebSocketConnector::new(self.url.clone(), Arc::clone(&self.token));
        self.connect_with(connector)
    }

    /// Joins the room over an arbitrary connector.
    ///
    /// # Errors
    /// [`PongdangError::Config`] if no room was set;
    /// [`PongdangError::Room`] for an invalid room config.
    pub fn connect_with<C: Connector>(self, connector: C) -> Result<MarbleClient, PongdangError> {
        let room_config = self
            .room
            .ok_or_else(|| PongdangError::Config("no room configured".into()))?;

        let credentials = Credentials::new(Arc::clone(&self.token), Arc::clone(&self.identity));
        let stomp = StompClient::start(connector, self.stomp, credentials);

        let room = match RoomClient::join(stomp.clone(), room_config, self.navigator, self.diagnostics) {
            Ok(room) => room,
            Err(e) => {
                let stomp = stomp.clone();
                tokio::spawn(async move { stomp.shutdown().await });
                return Err(e.into());
            }
        };

        tracing::info!(
            url = %self.url,
            room_id = %room.room_id(),
            user_id = self.identity.user_id(),
            "marble client started"
        );

        Ok(MarbleClient {
            stomp,
            room,
            identity: self.identity,
        })
    }
}

/// A connected session client for one room.
pub struct MarbleClient {
    stomp: StompHandle,
    room: RoomClient,
    identity: Arc<dyn IdentityProvider>,
}

impl MarbleClient {
    /// Creates a new builder.
    pub fn builder(url: impl Into<String>) -> MarbleClientBuilder {
        MarbleClientBuilder::new(url)
    }

    /// The signed-in user, if the identity provider knows one.
    pub fn user_id(&self) -> Option<UserId> {
        self.identity.user_id().map(UserId)
    }

    pub fn is_connected(&self) -> bool {
        self.stomp.is_connected()
    }

    pub fn room(&self) -> &RoomClient {
        &self.room
    }

    pub fn session(&self) -> Session {
        self.room.session()
    }

    pub fn watch_session(&self) -> watch::Receiver<Session> {
        self.room.watch_session()
    }

    pub fn actions(&self) -> &ActionPublisher {
        self.room.actions()
    }

    /// The signed-in user's player record.
    pub fn me(&self) -> Option<Player> {
        let user_id = self.user_id()?;
        self.room.session().player(user_id).cloned()
    }

    pub fn is_my_turn(&self) -> bool {
        self.room.is_my_turn(self.identity.as_ref())
    }

    pub fn is_my_quiz(&self) -> bool {
        self.room.is_my_quiz(self.identity.as_ref())
    }

    /// Throws two dice and sends the roll. Returns the throw if it was sent.
    pub fn roll_dice(&self) -> Option<DiceRoll> {
        let roll = DiceRoll::throw(&mut rand::rng());
        self.actions().roll(roll).then_some(roll)
    }

    /// Leaves the room and shuts the STOMP client down.
    ///
    /// The transport is shut down even when leaving fails.
    ///
    /// # Errors
    /// [`PongdangError::Room`] if the room was already closed.
    pub async fn close(self) -> Result<(), PongdangError> {
        let left = self.room.leave().await;
        self.stomp.shutdown().await;
        tracing::info!(room_id = %self.room.room_id(), "marble client closed");
        left.map_err(Into::into)
    }
}

impl std::fmt::Debug for MarbleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarbleClient")
            .field("room_id", self.room.room_id())
            .field("user_id", &self.user_id())
            .field("connected", &self.is_connected())
            .finish()
    }
}
