//! WebSocket connector using `tokio-tungstenite`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;

use crate::{Connection, ConnectionId, Connector, TokenProvider, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Dials `ws://` or `wss://` endpoints.
///
/// The bearer token is attached to the HTTP upgrade request as well as to
/// the STOMP frames, since some gateways authenticate the upgrade itself.
#[derive(Clone)]
pub struct WebSocketConnector {
    url: String,
    token: Arc<dyn TokenProvider>,
}

impl WebSocketConnector {
    /// Creates a connector for the given endpoint.
    pub fn new(url: impl Into<String>, token: impl TokenProvider) -> Self {
        Self {
            url: url.into(),
            token: Arc::new(token),
        }
    }

    /// The endpoint this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;

    async fn connect(&self) -> Result<WebSocketConnection, TransportError> {
        let mut request = self
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        if let Some(token) = self.token.token().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, url = %self.url, "WebSocket connected");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The read and write halves are locked independently so an outbound
/// publish never waits behind a pending read.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    async fn send(&self, text: String) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        loop {
            let msg = self.stream.lock().await.next().await;
            match msg {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_str().to_owned()));
                }
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(String::from_utf8_lossy(&data).into_owned()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            }
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.sink.lock().await.close().await.map_err(|e| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                e,
            ))
        })
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
