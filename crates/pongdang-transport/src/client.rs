//! Background STOMP client.
//!
//! [`StompClient::start`] spawns one task that owns the connection and
//! returns a cheap, cloneable [`StompHandle`]. The task:
//!
//! 1. dials through the [`Connector`],
//! 2. sends `CONNECT` (with `Authorization` and `login` when available) and
//!    waits for `CONNECTED`,
//! 3. re-sends `SUBSCRIBE` for every registered subscription,
//! 4. multiplexes outbound commands, inbound frames and heart-beats,
//! 5. on any drop waits `reconnect_delay` and starts over.
//!
//! ```text
//!   dial ──→ CONNECT ──→ CONNECTED ──→ resubscribe ──→ running
//!    ↑                                                   │
//!    └──────────── reconnect_delay ←──── dropped ←───────┘
//! ```
//!
//! Subscription handlers run on the client task, one message at a time, in
//! the order the server delivered them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval};
use tracing::{debug, info, warn};

use crate::frame::{Command, Frame};
use crate::{Connection, Connector, Credentials, TransportError};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Settings for the STOMP session and its reconnection policy.
#[derive(Debug, Clone)]
pub struct StompConfig {
    /// Value of the `host` header on `CONNECT`.
    pub host: String,
    /// How often we offer to send heart-beats. Zero disables them.
    pub heartbeat_outgoing: Duration,
    /// How often we ask the server to send heart-beats. Zero disables them.
    pub heartbeat_incoming: Duration,
    /// Fixed delay between a drop (or failed dial) and the next attempt.
    pub reconnect_delay: Duration,
    /// How long to wait for `CONNECTED` after sending `CONNECT`.
    pub connect_timeout: Duration,
}

impl Default for StompConfig {
    fn default() -> Self {
        Self {
            host: "/".to_string(),
            heartbeat_outgoing: Duration::from_secs(10),
            heartbeat_incoming: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl StompConfig {
    /// Lower bound for the delays, so a misconfigured client cannot spin.
    pub const MIN_DELAY: Duration = Duration::from_millis(10);

    /// Sets the reconnection delay.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets both heart-beat intervals.
    #[must_use]
    pub fn with_heartbeat(mut self, outgoing: Duration, incoming: Duration) -> Self {
        self.heartbeat_outgoing = outgoing;
        self.heartbeat_incoming = incoming;
        self
    }

    /// Clamps delays to [`Self::MIN_DELAY`].
    ///
    /// Called automatically by [`StompClient::start`].
    pub fn validated(mut self) -> Self {
        if self.reconnect_delay < Self::MIN_DELAY {
            warn!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "reconnect_delay below minimum, clamping"
            );
            self.reconnect_delay = Self::MIN_DELAY;
        }
        if self.connect_timeout < Self::MIN_DELAY {
            self.connect_timeout = Self::MIN_DELAY;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Identifies one subscription. Rendered on the wire as `sub-N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Returns the underlying counter value.
    pub fn into_inner(self) -> u64 {
        self.0
    }

    fn parse(raw: &str) -> Option<Self> {
        raw.strip_prefix("sub-")?.parse().ok().map(Self)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// A `MESSAGE` frame delivered to a subscription handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompMessage {
    pub subscription: SubscriptionId,
    pub destination: String,
    pub headers: Vec<(String, String)>,
    /// Raw body. Not validated in any way; decoding is the caller's job.
    pub body: String,
}

type MessageHandler = Box<dyn FnMut(StompMessage) + Send + 'static>;

struct Subscription {
    destination: String,
    handler: MessageHandler,
}

enum ClientCommand {
    Subscribe {
        id: SubscriptionId,
        destination: String,
        handler: MessageHandler,
    },
    Unsubscribe {
        id: SubscriptionId,
    },
    Publish {
        /// Connection generation the publish was accepted under.
        epoch: u64,
        destination: String,
        body: Option<String>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

struct Shared {
    connected: AtomicBool,
    epoch: AtomicU64,
    next_subscription: AtomicU64,
}

impl Shared {
    fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            next_subscription: AtomicU64::new(1),
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Entry point for starting the background client.
pub struct StompClient;

impl StompClient {
    /// Spawns the client task and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime. The task runs until
    /// [`StompHandle::shutdown`] is called or every handle is dropped.
    pub fn start<C: Connector>(
        connector: C,
        config: StompConfig,
        credentials: Credentials,
    ) -> StompHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new());

        let client_loop = ClientLoop {
            connector,
            config: config.validated(),
            credentials,
            commands: rx,
            shared: Arc::clone(&shared),
            subscriptions: BTreeMap::new(),
            sessions: 0,
        };
        tokio::spawn(client_loop.run());

        StompHandle {
            commands: tx,
            shared,
        }
    }
}

/// Handle to a running STOMP client. Cheap to clone.
#[derive(Clone)]
pub struct StompHandle {
    commands: mpsc::UnboundedSender<ClientCommand>,
    shared: Arc<Shared>,
}

impl StompHandle {
    /// Whether a STOMP session is currently established.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Registers a handler for `destination`.
    ///
    /// The subscription survives reconnects: it is re-sent after every
    /// `CONNECTED` until [`unsubscribe`](Self::unsubscribe) is called.
    pub fn subscribe<F>(&self, destination: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: FnMut(StompMessage) + Send + 'static,
    {
        let id = SubscriptionId(
            self.shared.next_subscription.fetch_add(1, Ordering::Relaxed),
        );
        let destination = destination.into();
        debug!(%id, %destination, "subscribing");
        let cmd = ClientCommand::Subscribe {
            id,
            destination,
            handler: Box::new(handler),
        };
        if self.commands.send(cmd).is_err() {
            warn!(%id, "stomp client stopped, subscription ignored");
        }
        id
    }

    /// Drops a subscription. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        debug!(%id, "unsubscribing");
        let _ = self.commands.send(ClientCommand::Unsubscribe { id });
    }

    /// Queues a `SEND` frame. Never blocks.
    ///
    /// # Errors
    /// - [`TransportError::NotConnected`] while no session is established
    /// - [`TransportError::Shutdown`] once the client task has stopped
    pub fn publish(
        &self,
        destination: &str,
        body: Option<String>,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let epoch = self.shared.epoch.load(Ordering::Acquire);
        self.commands
            .send(ClientCommand::Publish {
                epoch,
                destination: destination.to_string(),
                body,
            })
            .map_err(|_| TransportError::Shutdown)
    }

    /// Sends `DISCONNECT`, closes the connection and stops the task.
    pub async fn shutdown(&self) {
        let (reply, done) = oneshot::channel();
        if self.commands.send(ClientCommand::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
        self.shared.connected.store(false, Ordering::Release);
    }
}

impl fmt::Debug for StompHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StompHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Client loop
// ---------------------------------------------------------------------------

enum SessionEnd {
    Shutdown(Option<oneshot::Sender<()>>),
    Dropped(String),
}

struct ClientLoop<C: Connector> {
    connector: C,
    config: StompConfig,
    credentials: Credentials,
    commands: mpsc::UnboundedReceiver<ClientCommand>,
    shared: Arc<Shared>,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    /// Number of sessions that reached `CONNECTED`.
    sessions: u64,
}

impl<C: Connector> ClientLoop<C> {
    async fn run(mut self) {
        debug!("stomp client started");

        loop {
            let end = match self.connector.connect().await {
                Ok(conn) => {
                    let end = self.session(&conn).await;
                    self.shared.connected.store(false, Ordering::Release);
                    if matches!(end, SessionEnd::Shutdown(_)) {
                        let _ = conn.close().await;
                    }
                    end
                }
                Err(e) => SessionEnd::Dropped(e.to_string()),
            };

            match end {
                SessionEnd::Shutdown(reply) => {
                    if let Some(reply) = reply {
                        let _ = reply.send(());
                    }
                    break;
                }
                SessionEnd::Dropped(reason) => {
                    warn!(
                        %reason,
                        delay_ms = self.config.reconnect_delay.as_millis() as u64,
                        "stomp connection lost, retrying"
                    );
                    if !self.wait_before_reconnect().await {
                        break;
                    }
                }
            }
        }

        self.shared.connected.store(false, Ordering::Release);
        debug!("stomp client stopped");
    }

    /// Runs one connection from `CONNECT` until it ends.
    async fn session(&mut self, conn: &C::Connection) -> SessionEnd {
        let mut connect = Frame::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", self.config.host.clone())
            .with_header(
                "heart-beat",
                format!(
                    "{},{}",
                    self.config.heartbeat_outgoing.as_millis(),
                    self.config.heartbeat_incoming.as_millis()
                ),
            );
        if let Some(bearer) = self.credentials.bearer() {
            connect = connect.with_header("Authorization", bearer);
        }
        if let Some(user_id) = self.credentials.user_id() {
            connect = connect.with_header("login", user_id.to_string());
        }
        if let Err(e) = conn.send(connect.encode()).await {
            return SessionEnd::Dropped(e.to_string());
        }

        let connected =
            match time::timeout(self.config.connect_timeout, await_connected(conn)).await {
                Ok(Ok(frame)) => frame,
                Ok(Err(reason)) => return SessionEnd::Dropped(reason),
                Err(_) => {
                    return SessionEnd::Dropped("timed out waiting for CONNECTED".into());
                }
            };

        let (server_out, server_in) = parse_heartbeat(connected.header("heart-beat"));
        let send_every = negotiate(self.config.heartbeat_outgoing, server_in);
        let expect_every = negotiate(self.config.heartbeat_incoming, server_out);

        let epoch = self.shared.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.sessions += 1;

        let resubscribe: Vec<String> = self
            .subscriptions
            .iter()
            .map(|(id, sub)| subscribe_frame(*id, &sub.destination).encode())
            .collect();
        for frame in resubscribe {
            if let Err(e) = conn.send(frame).await {
                return SessionEnd::Dropped(e.to_string());
            }
        }

        self.shared.connected.store(true, Ordering::Release);
        if self.sessions > 1 {
            info!(
                conn = %conn.id(),
                subscriptions = self.subscriptions.len(),
                "stomp reconnected; events sent during the outage are not replayed"
            );
        } else {
            info!(conn = %conn.id(), "stomp connected");
        }

        let mut heartbeat = send_every.map(|p| time::interval_at(Instant::now() + p, p));
        let mut last_seen = Instant::now();

        loop {
            let watchdog = expect_every.map(|p| last_seen + p * 2);
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => {
                        if let Some(end) = self.handle_command(conn, cmd, epoch).await {
                            return end;
                        }
                    }
                    None => {
                        debug!("all stomp handles dropped");
                        return disconnect(conn, None).await;
                    }
                },
                incoming = conn.recv() => match incoming {
                    Ok(Some(text)) => {
                        last_seen = Instant::now();
                        if let Some(end) = self.handle_incoming(&text) {
                            return end;
                        }
                    }
                    Ok(None) => return SessionEnd::Dropped("closed by server".into()),
                    Err(e) => return SessionEnd::Dropped(e.to_string()),
                },
                _ = next_tick(&mut heartbeat) => {
                    if let Err(e) = conn.send("\n".to_string()).await {
                        return SessionEnd::Dropped(e.to_string());
                    }
                }
                _ = sleep_until(watchdog) => {
                    return SessionEnd::Dropped("server heart-beat missed".into());
                }
            }
        }
    }

    async fn handle_command(
        &mut self,
        conn: &C::Connection,
        cmd: ClientCommand,
        epoch: u64,
    ) -> Option<SessionEnd> {
        let outgoing = match cmd {
            ClientCommand::Subscribe {
                id,
                destination,
                handler,
            } => {
                let frame = subscribe_frame(id, &destination);
                self.subscriptions
                    .insert(id, Subscription { destination, handler });
                frame
            }
            ClientCommand::Unsubscribe { id } => {
                self.subscriptions.remove(&id)?;
                Frame::new(Command::Unsubscribe).with_header("id", id.to_string())
            }
            ClientCommand::Publish {
                epoch: accepted_under,
                destination,
                body,
            } => {
                if accepted_under != epoch {
                    debug!(%destination, "dropping publish queued for a previous connection");
                    return None;
                }
                self.send_frame(&destination, body)
            }
            ClientCommand::Shutdown { reply } => {
                return Some(disconnect(conn, Some(reply)).await);
            }
        };

        match conn.send(outgoing.encode()).await {
            Ok(()) => None,
            Err(e) => Some(SessionEnd::Dropped(e.to_string())),
        }
    }

    fn send_frame(&self, destination: &str, body: Option<String>) -> Frame {
        let mut frame = Frame::new(Command::Send).with_header("destination", destination);
        if let Some(bearer) = self.credentials.bearer() {
            frame = frame.with_header("Authorization", bearer);
        }
        if let Some(body) = body {
            frame = frame
                .with_header("content-type", "application/json")
                .with_header("content-length", body.len().to_string())
                .with_body(body);
        }
        frame
    }

    fn handle_incoming(&mut self, text: &str) -> Option<SessionEnd> {
        let frames = match Frame::decode_all(text) {
            Ok(frames) => frames,
            Err(e) => {
                warn!(error = %e, "dropping malformed stomp frame");
                return None;
            }
        };

        for frame in frames {
            match frame.command {
                Command::Message => self.dispatch(frame),
                Command::Error => {
                    let reason = frame
                        .header("message")
                        .unwrap_or(frame.body.as_str())
                        .to_string();
                    return Some(SessionEnd::Dropped(format!("server error: {reason}")));
                }
                Command::Receipt => {
                    debug!(receipt = ?frame.header("receipt-id"), "receipt");
                }
                other => debug!(command = %other, "ignoring unexpected frame"),
            }
        }
        None
    }

    fn dispatch(&mut self, frame: Frame) {
        let by_id = frame
            .header("subscription")
            .and_then(SubscriptionId::parse)
            .filter(|id| self.subscriptions.contains_key(id));
        let target = by_id.or_else(|| {
            let destination = frame.header("destination")?;
            self.subscriptions
                .iter()
                .find(|(_, sub)| sub.destination == destination)
                .map(|(id, _)| *id)
        });
        let Some(id) = target else {
            debug!(
                destination = ?frame.header("destination"),
                "message for unknown subscription dropped"
            );
            return;
        };
        let destination = frame.header("destination").map(str::to_owned);

        let Frame { headers, body, .. } = frame;
        if let Some(sub) = self.subscriptions.get_mut(&id) {
            let message = StompMessage {
                subscription: id,
                destination: destination.unwrap_or_else(|| sub.destination.clone()),
                headers,
                body,
            };
            (sub.handler)(message);
        }
    }

    /// Sleeps for the reconnect delay while still servicing commands.
    ///
    /// Returns `false` if the client should stop instead of redialing.
    async fn wait_before_reconnect(&mut self) -> bool {
        let delay = time::sleep(self.config.reconnect_delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                _ = &mut delay => return true,
                cmd = self.commands.recv() => match cmd {
                    None => return false,
                    Some(ClientCommand::Shutdown { reply }) => {
                        let _ = reply.send(());
                        return false;
                    }
                    Some(ClientCommand::Subscribe { id, destination, handler }) => {
                        self.subscriptions.insert(id, Subscription { destination, handler });
                    }
                    Some(ClientCommand::Unsubscribe { id }) => {
                        self.subscriptions.remove(&id);
                    }
                    Some(ClientCommand::Publish { destination, .. }) => {
                        warn!(%destination, "dropping publish while disconnected");
                    }
                },
            }
        }
    }
}

/// Reads until `CONNECTED`, failing on `ERROR` or close.
async fn await_connected<T: Connection>(conn: &T) -> Result<Frame, String> {
    loop {
        let text = match conn.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => return Err("closed before CONNECTED".into()),
            Err(e) => return Err(e.to_string()),
        };
        let frames = Frame::decode_all(&text).map_err(|e| e.to_string())?;
        for frame in frames {
            match frame.command {
                Command::Connected => return Ok(frame),
                Command::Error => {
                    let reason = frame.header("message").unwrap_or(frame.body.as_str());
                    return Err(format!("server rejected CONNECT: {reason}"));
                }
                _ => {}
            }
        }
    }
}

async fn disconnect<T: Connection>(
    conn: &T,
    reply: Option<oneshot::Sender<()>>,
) -> SessionEnd {
    let _ = conn.send(Frame::new(Command::Disconnect).encode()).await;
    SessionEnd::Shutdown(reply)
}

fn subscribe_frame(id: SubscriptionId, destination: &str) -> Frame {
    Frame::new(Command::Subscribe)
        .with_header("id", id.to_string())
        .with_header("destination", destination)
        .with_header("ack", "auto")
}

/// Parses a `heart-beat: x,y` header into durations. Missing or garbled
/// values read as zero (disabled).
fn parse_heartbeat(raw: Option<&str>) -> (Duration, Duration) {
    let mut parts = raw
        .unwrap_or("0,0")
        .split(',')
        .map(|p| p.trim().parse::<u64>().unwrap_or(0));
    let x = parts.next().unwrap_or(0);
    let y = parts.next().unwrap_or(0);
    (Duration::from_millis(x), Duration::from_millis(y))
}

fn negotiate(ours: Duration, theirs: Duration) -> Option<Duration> {
    if ours.is_zero() || theirs.is_zero() {
        None
    } else {
        Some(ours.max(theirs))
    }
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_id_display_and_parse() {
        let id = SubscriptionId(4);
        assert_eq!(id.to_string(), "sub-4");
        assert_eq!(SubscriptionId::parse("sub-4"), Some(id));
        assert_eq!(SubscriptionId::parse("4"), None);
        assert_eq!(SubscriptionId::parse("sub-x"), None);
    }

    #[test]
    fn test_parse_heartbeat_values() {
        assert_eq!(
            parse_heartbeat(Some("1000,2000")),
            (Duration::from_millis(1000), Duration::from_millis(2000))
        );
        assert_eq!(parse_heartbeat(None), (Duration::ZERO, Duration::ZERO));
        assert_eq!(
            parse_heartbeat(Some("garbage")),
            (Duration::ZERO, Duration::ZERO)
        );
    }

    #[test]
    fn test_negotiate_takes_larger_interval() {
        let a = Duration::from_secs(10);
        let b = Duration::from_secs(4);
        assert_eq!(negotiate(a, b), Some(a));
        assert_eq!(negotiate(b, a), Some(a));
    }

    #[test]
    fn test_negotiate_zero_disables() {
        assert_eq!(negotiate(Duration::ZERO, Duration::from_secs(1)), None);
        assert_eq!(negotiate(Duration::from_secs(1), Duration::ZERO), None);
    }

    #[test]
    fn test_config_validated_clamps_reconnect_delay() {
        let config = StompConfig::default()
            .with_reconnect_delay(Duration::ZERO)
            .validated();
        assert_eq!(config.reconnect_delay, StompConfig::MIN_DELAY);
    }

    #[test]
    fn test_subscribe_frame_headers() {
        let frame = subscribe_frame(SubscriptionId(2), "/topic/game/9");
        assert_eq!(frame.command, Command::Subscribe);
        assert_eq!(frame.header("id"), Some("sub-2"));
        assert_eq!(frame.header("destination"), Some("/topic/game/9"));
    }
}
