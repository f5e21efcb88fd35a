//! Integration tests for the WebSocket connector against a real socket.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use pongdang_transport::{Anonymous, Connection, Connector, StaticToken, WebSocketConnector};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

    /// Binds an ephemeral port and returns the listener with its `ws://` url.
    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("bound address");
        (listener, format!("ws://{addr}"))
    }

    #[tokio::test]
    async fn test_websocket_upgrade_carries_bearer_token() {
        let (listener, url) = listen().await;
        let (auth_tx, auth_rx) = oneshot::channel();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("should accept");
            let callback = |req: &Request, resp: Response| {
                let auth = req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                let _ = auth_tx.send(auth);
                Ok(resp)
            };
            tokio_tungstenite::accept_hdr_async(stream, callback)
                .await
                .expect("handshake")
        });

        let connector = WebSocketConnector::new(url, StaticToken("abc".into()));
        let _conn = connector.connect().await.expect("should connect");
        let _ws = server.await.expect("server task");

        assert_eq!(auth_rx.await.unwrap().as_deref(), Some("Bearer abc"));
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive_text() {
        let (listener, url) = listen().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("should accept");
            let mut ws = tokio_tungstenite::accept_async(stream).await.expect("handshake");

            let incoming = ws.next().await.unwrap().unwrap();
            assert_eq!(incoming.to_text().unwrap(), "from client");

            ws.send(Message::Text("from server".into())).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let connector = WebSocketConnector::new(url, Anonymous);
        let conn = connector.connect().await.expect("should connect");
        assert!(conn.id().into_inner() > 0);

        conn.send("from client".into()).await.expect("send");
        assert_eq!(
            conn.recv().await.expect("recv").as_deref(),
            Some("from server")
        );
        assert_eq!(conn.recv().await.expect("recv after close"), None);

        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_websocket_connect_to_closed_port_fails() {
        let (listener, url) = listen().await;
        drop(listener);

        let connector = WebSocketConnector::new(url, Anonymous);
        assert!(connector.connect().await.is_err());
    }
}
