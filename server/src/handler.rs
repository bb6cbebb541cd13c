//! WebSocket connection handler.
//!
//! Upgrades HTTP connections to WebSockets and bridges each socket to the
//! realtime manager: inbound frames feed `handle_message`, protocol
//! ping/pong feeds the heartbeat, and a per-connection outbound queue is
//! pumped to the socket by its own writer task so socket writes never happen
//! under a manager lock.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use relaycast_core::transport::DEFAULT_OUTBOUND_CAPACITY;
use relaycast_core::ChannelTransport;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Connection query parameters.
///
/// Identity is assumed to be verified by an upstream layer before the
/// upgrade reaches this handler; `user` is the authenticated principal.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// The connecting user's id.
    pub user: String,
}

/// WebSocket upgrade handler for `GET /ws?user=<id>`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state, query.user))
}

/// Drives one WebSocket connection until it closes.
async fn handle_connection(socket: WebSocket, state: AppState, user_id: String) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (transport, mut outbound) = ChannelTransport::pair(DEFAULT_OUTBOUND_CAPACITY);

    let connection_id = state
        .manager
        .add_client(user_id.clone(), Arc::new(transport))
        .await;
    info!(%connection_id, %user_id, "websocket connection opened");

    // Writer task: drains the outbound queue into the socket.
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if ws_sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        let msg = match result {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%connection_id, error = %e, "websocket error");
                break;
            }
        };

        // Any inbound frame is a liveness signal, whatever its type.
        state.manager.heartbeat(connection_id).await;

        match msg {
            Message::Text(text) => {
                state.manager.handle_message(connection_id, &text).await;
            }
            Message::Ping(_) | Message::Pong(_) => {
                debug!(%connection_id, "protocol liveness signal");
            }
            Message::Close(_) => {
                debug!(%connection_id, "close requested");
                break;
            }
            // Wire format is UTF-8 JSON text; binary frames are ignored.
            _ => {}
        }
    }

    state.manager.remove_client(connection_id).await;
    sender_task.abort();
    info!(%connection_id, "websocket connection closed");
}
