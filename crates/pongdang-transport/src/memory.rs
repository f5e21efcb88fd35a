//! In-process transport.
//!
//! [`memory_transport`] returns a [`MemoryConnector`] for the client side and
//! a receiver that yields one [`MemoryPeer`] (the "server" end) per dialed
//! connection. Tests use it to script a STOMP broker without a socket; the
//! connector can be told to refuse dials to exercise reconnection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, Connector, TransportError};

static NEXT_MEMORY_ID: AtomicU64 = AtomicU64::new(1);

/// Creates a connector and the stream of server-side peers it produces.
pub fn memory_transport() -> (MemoryConnector, mpsc::UnboundedReceiver<MemoryPeer>) {
    let (peer_tx, peer_rx) = mpsc::unbounded_channel();
    let connector = MemoryConnector {
        peer_tx,
        refuse: Arc::new(AtomicBool::new(false)),
    };
    (connector, peer_rx)
}

/// Client-side connector for the in-process transport.
#[derive(Clone)]
pub struct MemoryConnector {
    peer_tx: mpsc::UnboundedSender<MemoryPeer>,
    refuse: Arc<AtomicBool>,
}

impl MemoryConnector {
    /// Makes subsequent dials fail (`true`) or succeed (`false`).
    pub fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::Release);
    }
}

impl Connector for MemoryConnector {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, TransportError> {
        if self.refuse.load(Ordering::Acquire) {
            return Err(TransportError::ConnectFailed("refused".into()));
        }
        let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();
        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new(NEXT_MEMORY_ID.fetch_add(1, Ordering::Relaxed));

        self.peer_tx
            .send(MemoryPeer {
                id,
                tx: to_client_tx,
                rx: to_peer_rx,
            })
            .map_err(|_| TransportError::ConnectFailed("no listener".into()))?;

        Ok(MemoryConnection {
            id,
            tx: Mutex::new(Some(to_peer_tx)),
            rx: Mutex::new(to_client_rx),
        })
    }
}

/// Client end of an in-process connection.
pub struct MemoryConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::UnboundedSender<String>>>,
    rx: Mutex<mpsc::UnboundedReceiver<String>>,
}

impl Connection for MemoryConnection {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        let guard = self.tx.lock().await;
        let tx = guard
            .as_ref()
            .ok_or_else(|| TransportError::ConnectionClosed("closed locally".into()))?;
        tx.send(text)
            .map_err(|_| TransportError::ConnectionClosed("peer dropped".into()))
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.tx.lock().await.take();
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Server end of an in-process connection. Dropping it closes the
/// connection from the client's point of view.
pub struct MemoryPeer {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<String>,
    rx: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// The id of the matching client connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Sends text to the client. Returns `false` once the client is gone.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.tx.send(text.into()).is_ok()
    }

    /// Receives the next text the client sent, or `None` once it closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_round_trip() {
        let (connector, mut peers) = memory_transport();
        let conn = connector.connect().await.unwrap();
        let mut peer = peers.recv().await.unwrap();
        assert_eq!(peer.id(), conn.id());

        conn.send("ping".into()).await.unwrap();
        assert_eq!(peer.recv().await.as_deref(), Some("ping"));

        assert!(peer.send("pong"));
        assert_eq!(conn.recv().await.unwrap().as_deref(), Some("pong"));
    }

    #[tokio::test]
    async fn test_memory_peer_drop_closes_client() {
        let (connector, mut peers) = memory_transport();
        let conn = connector.connect().await.unwrap();
        drop(peers.recv().await.unwrap());
        assert_eq!(conn.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_refuse_fails_dial() {
        let (connector, _peers) = memory_transport();
        connector.set_refuse(true);
        assert!(matches!(
            connector.connect().await,
            Err(TransportError::ConnectFailed(_))
        ));
    }
}
