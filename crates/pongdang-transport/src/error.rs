/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Dialing the server failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A STOMP frame could not be parsed.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// The STOMP session is not established, so nothing can be published.
    #[error("not connected")]
    NotConnected,

    /// The client was shut down.
    #[error("transport shut down")]
    Shutdown,
}
