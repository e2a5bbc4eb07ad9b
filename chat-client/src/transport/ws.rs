//! WebSocket transport on `tokio-tungstenite`.
//!
//! The stream is split so a receive loop and senders never contend for the
//! same lock.

use super::{Transport, TransportError};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket connection to a relay.
#[derive(Debug, Default)]
pub struct WsTransport {
    writer: Mutex<Option<SplitSink<WsStream, Message>>>,
    reader: Mutex<Option<SplitStream<WsStream>>>,
    connected: AtomicBool,
}

impl WsTransport {
    /// Create a disconnected transport.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, url: &str) -> Result<(), TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        let (sink, stream) = stream.split();

        *self.writer.lock().await = Some(sink);
        *self.reader.lock().await = Some(stream);
        self.connected.store(true, Ordering::SeqCst);
        debug!(url, "WebSocket connected");
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        let sink = writer.as_mut().ok_or(TransportError::NotConnected)?;
        sink.send(Message::Text(text.to_string()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn recv(&self) -> Result<String, TransportError> {
        let mut reader = self.reader.lock().await;
        let stream = reader.as_mut().ok_or(TransportError::NotConnected)?;

        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => return Ok(text),
                    Err(_) => debug!("Skipping non-UTF-8 binary frame"),
                },
                // Pings are answered by tungstenite itself.
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(TransportError::ConnectionClosed);
                }
                Some(Err(e)) => {
                    self.connected.store(false, Ordering::SeqCst);
                    return Err(TransportError::ReceiveFailed(e.to_string()));
                }
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut sink) = self.writer.lock().await.take() {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    /// One-connection server: echoes text, answers `bin` with a binary
    /// frame and `bye` with a close.
    async fn echo_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                let reply = match msg {
                    Message::Text(text) if text == "bye" => {
                        let _ = ws.close(None).await;
                        break;
                    }
                    Message::Text(text) if text == "bin" => {
                        Message::Binary(b"from binary".to_vec())
                    }
                    Message::Text(text) => Message::Text(text),
                    _ => continue,
                };
                if ws.send(reply).await.is_err() {
                    break;
                }
            }
        });
        addr
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let transport = WsTransport::new();
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send("x").await,
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn connect_to_nothing_fails() {
        let transport = WsTransport::new();
        // Port 9 (discard) is closed on test machines.
        let result = transport.connect("ws://127.0.0.1:9").await;
        assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn send_and_recv_over_socket() {
        let addr = echo_server().await;
        let transport = WsTransport::new();
        transport.connect(&format!("ws://{addr}")).await.unwrap();
        assert!(transport.is_connected());

        transport.send(r#"{"type":"sync"}"#).await.unwrap();
        assert_eq!(transport.recv().await.unwrap(), r#"{"type":"sync"}"#);

        transport.send("bin").await.unwrap();
        assert_eq!(transport.recv().await.unwrap(), "from binary");
    }

    #[tokio::test]
    async fn server_close_ends_recv() {
        let addr = echo_server().await;
        let transport = WsTransport::new();
        transport.connect(&format!("ws://{addr}")).await.unwrap();

        transport.send("bye").await.unwrap();

        assert!(matches!(
            transport.recv().await,
            Err(TransportError::ConnectionClosed)
        ));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn close_stops_sending() {
        let addr = echo_server().await;
        let transport = WsTransport::new();
        transport.connect(&format!("ws://{addr}")).await.unwrap();

        transport.close().await.unwrap();

        assert!(!transport.is_connected());
        assert!(matches!(
            transport.send("x").await,
            Err(TransportError::NotConnected)
        ));
    }
}
