//! WebSocket connection loop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::Extension;

use crate::server::ChatRelay;
use crate::session::Session;

/// Upgrade handler mounted at `/`.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(relay): Extension<Arc<ChatRelay>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, relay))
}

async fn handle_connection(mut socket: WebSocket, relay: Arc<ChatRelay>) {
    let (mut session, mut outbound) = Session::new(relay);
    let conn = session.conn_id();
    tracing::info!(conn, "WebSocket connected");

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else { break };
                let text = match frame.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(conn, error = %e, "Failed to encode outbound frame");
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => session.handle_text(&text).await,
                    Some(Ok(Message::Binary(data))) => session.handle_binary(&data).await,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(conn, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    session.close().await;
    tracing::info!(conn, "WebSocket closed");
}
