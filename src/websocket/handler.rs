//! WebSocket Handler
//!
//! Handles WebSocket upgrade requests and manages the connection lifecycle.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::api::AppState;

use super::messages::{ClientMessage, ServerMessage};

/// WebSocket upgrade handler
///
/// Entry point for feed connections; upgrades the HTTP connection and
/// starts message handling.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle an established WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Outbound queue for this connection
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    let connection_id = match state.registry.register(tx).await {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected WebSocket connection");
            let refusal = ServerMessage::Error {
                message: e.to_string(),
            };
            if let Ok(text) = serde_json::to_string(&refusal) {
                let _ = sender.send(Message::Text(text)).await;
            }
            return;
        }
    };

    let connected = ServerMessage::Connected {
        connection_id: connection_id.clone(),
    };
    let handshake_ok = match serde_json::to_string(&connected) {
        Ok(text) => sender.send(Message::Text(text)).await.is_ok(),
        Err(_) => false,
    };
    if !handshake_ok {
        tracing::debug!(connection_id = %connection_id, "Handshake send failed");
        state.registry.unregister(&connection_id).await;
        return;
    }

    let conn_id_for_send = connection_id.clone();
    let registry_for_send = Arc::clone(&state.registry);

    // Forward queued messages to the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(text) => {
                    if sender.send(Message::Text(text)).await.is_err() {
                        tracing::debug!(
                            connection_id = %conn_id_for_send,
                            "WebSocket send failed, closing connection"
                        );
                        break;
                    }
                    // A completed write is the liveness signal; a client
                    // that stalls mid-write stops being touched here and
                    // ages out of the registry.
                    registry_for_send.touch(&conn_id_for_send).await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                }
            }
        }
    });

    let state_for_recv = Arc::clone(&state);
    let conn_id_for_recv = connection_id.clone();

    // Handle inbound messages
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(msg) => {
                    if !handle_ws_message(&state_for_recv, &conn_id_for_recv, msg).await {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %conn_id_for_recv,
                        error = %e,
                        "WebSocket receive error"
                    );
                    break;
                }
            }
        }
    });

    // Either task ending means the connection is done
    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    state.registry.unregister(&connection_id).await;
}

/// Handle a received WebSocket frame.
///
/// Returns false if the connection should be closed.
async fn handle_ws_message(state: &Arc<AppState>, connection_id: &str, message: Message) -> bool {
    match message {
        Message::Text(text) => {
            state.registry.touch(connection_id).await;
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    handle_client_message(state, connection_id, client_msg).await;
                }
                Err(e) => {
                    // Malformed messages are logged and dropped; the
                    // connection stays open.
                    tracing::debug!(
                        connection_id = %connection_id,
                        error = %e,
                        "Invalid client message"
                    );
                    let error_msg = ServerMessage::Error {
                        message: format!("Invalid message format: {}", e),
                    };
                    let _ = state.registry.send_to(connection_id, error_msg).await;
                }
            }
            true
        }
        Message::Binary(_) => {
            let error_msg = ServerMessage::Error {
                message: "Binary messages not supported".to_string(),
            };
            let _ = state.registry.send_to(connection_id, error_msg).await;
            true
        }
        Message::Ping(_) => true,
        Message::Pong(_) => {
            state.registry.touch(connection_id).await;
            true
        }
        Message::Close(_) => {
            tracing::debug!(connection_id = %connection_id, "Client requested close");
            false
        }
    }
}

/// Handle a parsed client message
async fn handle_client_message(
    state: &Arc<AppState>,
    connection_id: &str,
    message: ClientMessage,
) {
    match message {
        ClientMessage::RequestInitialData => {
            let (pollution, locations) = state.broadcaster.initial_data().await;
            let _ = state.registry.send_to(connection_id, pollution).await;
            let _ = state.registry.send_to(connection_id, locations).await;
        }
        ClientMessage::RequestLocationData { location_id } => {
            let reply = state.broadcaster.location_data(&location_id).await;
            let _ = state
                .registry
                .set_filter(connection_id, Some(location_id))
                .await;
            let _ = state.registry.send_to(connection_id, reply).await;
        }
        ClientMessage::RequestHistoricalData {
            start_date,
            end_date,
        } => {
            let reply = state.broadcaster.historical(start_date, end_date).await;
            let _ = state.registry.send_to(connection_id, reply).await;
        }
        ClientMessage::Subscribe { location_id } => {
            if let Err(e) = state.registry.set_filter(connection_id, location_id).await {
                tracing::debug!(connection_id = %connection_id, error = %e, "Subscribe failed");
            }
        }
        ClientMessage::ChatMessage { message } => {
            // The assistant call can be slow; answer off the receive path
            // so streamed updates keep flowing.
            let state = Arc::clone(state);
            let connection_id = connection_id.to_string();
            tokio::spawn(async move {
                let reply = state.assistant.ask(&message).await;
                let _ = state
                    .registry
                    .send_to(
                        &connection_id,
                        ServerMessage::ChatResponse { message: reply },
                    )
                    .await;
            });
        }
        ClientMessage::Ping => {
            let _ = state
                .registry
                .send_to(connection_id, ServerMessage::Pong)
                .await;
        }
        ClientMessage::Unknown => {
            tracing::trace!(connection_id = %connection_id, "Ignored unknown message type");
        }
    }
}
