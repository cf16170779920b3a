//! Manages the browser WebSocket connection lifecycle for a relay session.

use super::{gateway::Gateway, protocol::ServerMessage};
use crate::state::AppState;
use anyhow::Result;
use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, remote, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Each browser connection gets its own [`Gateway`] and therefore its own
/// upstream session. The upstream session is always shut down when the
/// browser goes away.
#[instrument(name = "ws_session", skip_all, fields(connection_id, %remote))]
async fn handle_socket(socket: WebSocket, remote: SocketAddr, state: Arc<AppState>) {
    let connection_id: u32 = rand::random();
    tracing::Span::current().record("connection_id", connection_id);
    info!("Client connected");

    let (mut socket_tx, mut socket_rx) = socket.split();
    let mut gateway = Gateway::new(Arc::clone(&state.live_config), Arc::clone(&state.connector));

    if let Err(e) = relay_loop(&mut gateway, &mut socket_tx, &mut socket_rx).await {
        error!("Relay loop exited with an error: {:?}", e);
    }

    gateway.end().await;
    info!("Client disconnected");
}

/// Pumps client frames into the gateway and upstream events back to the client.
async fn relay_loop(
    gateway: &mut Gateway,
    socket_tx: &mut SplitSink<WebSocket, Message>,
    socket_rx: &mut SplitStream<WebSocket>,
) -> Result<()> {
    loop {
        tokio::select! {
            msg = socket_rx.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = gateway.handle_text(text.as_str()).await {
                        send_msg(socket_tx, reply).await?;
                    }
                }
                Some(Ok(Message::Binary(bytes))) => {
                    warn!(size = bytes.len(), "Ignoring binary frame from client");
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "Client sent close frame");
                    break;
                }
                // Ping and pong frames are answered by axum.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Client socket error: {}", e);
                    break;
                }
                None => break,
            },
            Some(event) = gateway.next_event() => {
                let msg = gateway.on_event(event);
                send_msg(socket_tx, msg).await?;
            }
        }
    }
    Ok(())
}

/// A helper to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}
