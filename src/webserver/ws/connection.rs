/// WebSocket connection handler
///
/// Owns one socket from upgrade to close: greets the client, forwards
/// fan-out frames from the hub, applies subscribe/unsubscribe commands,
/// and keeps the link healthy with ping/pong. On exit every trace of the
/// connection is removed from the hub, the rooms and the registry.
use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    arguments::{is_debug_registry_enabled, is_debug_ws_enabled},
    config,
    core::TopicKind,
    global,
    logger::{self, LogTag},
};

use super::super::state::AppState;
use super::{
    health::{ConnectionHealth, HealthConfig},
    message::{ClientMessage, ServerMessage},
};

/// Handle an authenticated WebSocket connection
pub async fn handle_connection(socket: WebSocket, state: Arc<AppState>, wallet: String) {
    // Register connection with hub
    let (conn_id, mut hub_rx) = state.hub.register_connection().await;

    // Split socket
    let (mut ws_tx, mut ws_rx) = socket.split();

    // Initialize health tracker
    let health_config = config::with_config(|cfg| {
        HealthConfig::from_config(
            cfg.server.heartbeat_interval_secs,
            cfg.server.idle_timeout_secs,
            cfg.server.pong_timeout_secs,
        )
    });
    let mut health = ConnectionHealth::new(health_config);

    // Rooms this connection has been joined into
    let mut joined_rooms: HashSet<String> = HashSet::new();

    logger::info(
        LogTag::Ws,
        &format!("Connection {} opened (wallet {})", conn_id, wallet),
    );

    // Greeting carries the id the client correlates frames with
    let hello = ServerMessage::Connected {
        connection_id: conn_id.clone(),
        timestamp: global::now_ms(),
    };
    if send_control_message(&mut ws_tx, hello).await.is_err() {
        state.hub.unregister_connection(&conn_id).await;
        return;
    }

    // Main message loop
    loop {
        tokio::select! {
            biased;

            // Frames from the fan-out engines
            Some(frame) = hub_rx.recv() => {
                if let Err(e) = forward_to_client(&mut ws_tx, frame).await {
                    logger::warning(
                        LogTag::Ws,
                        &format!("Connection {}: failed to send frame: {}", conn_id, e),
                    );
                    break;
                }
            }

            // Messages from client (control commands)
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        health.record_activity();

                        if let Some(reply) =
                            handle_client_message(&text, &state, &conn_id, &mut joined_rooms).await
                        {
                            if let Err(e) = send_control_message(&mut ws_tx, reply).await {
                                logger::warning(
                                    LogTag::Ws,
                                    &format!("Connection {}: failed to reply: {}", conn_id, e),
                                );
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        health.record_activity();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        logger::debug(
                            LogTag::Ws,
                            &format!("Connection {}: client closed", conn_id),
                        );
                        break;
                    }
                    Some(Err(e)) => {
                        logger::warning(
                            LogTag::Ws,
                            &format!("Connection {}: websocket error: {}", conn_id, e),
                        );
                        break;
                    }
                    _ => {}
                }
            }

            // Health checks
            _ = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
                if health.is_idle() {
                    logger::warning(
                        LogTag::Ws,
                        &format!(
                            "Connection {}: idle timeout ({}s)",
                            conn_id,
                            health.seconds_since_activity()
                        ),
                    );
                    break;
                }

                if health.is_pong_overdue() {
                    logger::warning(
                        LogTag::Ws,
                        &format!("Connection {}: pong timeout", conn_id),
                    );
                    break;
                }

                if health.needs_ping() {
                    if ws_tx.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                    health.record_ping();
                }
            }
        }
    }

    // Cleanup: rooms first, then registry, then hub
    if let Some(rooms) = &state.rooms {
        for room_key in &joined_rooms {
            if let Err(e) = rooms.leave(room_key, &conn_id).await {
                logger::debug(
                    LogTag::Ws,
                    &format!("Connection {}: leave {} failed: {}", conn_id, room_key, e),
                );
            }
        }
    }
    if let Err(e) = state.store.remove_all_for_connection(&conn_id).await {
        logger::warning(
            LogTag::Ws,
            &format!("Connection {}: failed to clear subscriptions: {}", conn_id, e),
        );
    }
    state.hub.unregister_connection(&conn_id).await;

    logger::info(LogTag::Ws, &format!("Connection {} closed", conn_id));
}

/// Forward a fan-out frame to the client
async fn forward_to_client(
    ws_tx: &mut futures::stream::SplitSink<WebSocket, Message>,
    frame: ServerMessage,
) -> Result<(), axum::Error> {
    match frame.to_json() {
        Ok(json) => ws_tx.send(Message::Text(json)).await,
        Err(e) => {
            logger::error(LogTag::Ws, &format!("Failed to serialize frame: {}", e));
            Ok(()) // Don't break connection on serialization error
        }
    }
}

/// Send a control frame to the client
async fn send_control_message(
    ws_tx: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<(), String> {
    let json = msg.to_json().map_err(|e| format!("Serialization error: {}", e))?;
    ws_tx
        .send(Message::Text(json))
        .await
        .map_err(|e| format!("Send error: {}", e))?;
    Ok(())
}

/// Apply a client control message, returning the reply frame if any
async fn handle_client_message(
    text: &str,
    state: &AppState,
    conn_id: &str,
    joined_rooms: &mut HashSet<String>,
) -> Option<ServerMessage> {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            if is_debug_ws_enabled() {
                logger::debug(
                    LogTag::Ws,
                    &format!("Connection {}: invalid client message: {}", conn_id, e),
                );
            }
            return Some(ServerMessage::Error {
                message: format!("Invalid message: {}", e),
                code: Some("invalid_message".to_string()),
            });
        }
    };

    match client_msg {
        ClientMessage::SubscribePrice { token } => {
            Some(subscribe_topic(state, conn_id, joined_rooms, TopicKind::Price, &token).await)
        }
        ClientMessage::SubscribeBalance { wallet } => {
            Some(subscribe_topic(state, conn_id, joined_rooms, TopicKind::Balance, &wallet).await)
        }
        ClientMessage::UnsubscribePrice { token } => {
            unsubscribe_topic(state, conn_id, joined_rooms, TopicKind::Price, &token).await;
            None
        }
        ClientMessage::UnsubscribeBalance { wallet } => {
            unsubscribe_topic(state, conn_id, joined_rooms, TopicKind::Balance, &wallet).await;
            None
        }
        ClientMessage::Ping => Some(ServerMessage::Pong),
    }
}

/// Record a subscription and join the topic's room when one exists
async fn subscribe_topic(
    state: &AppState,
    conn_id: &str,
    joined_rooms: &mut HashSet<String>,
    kind: TopicKind,
    topic_key: &str,
) -> ServerMessage {
    let ttl_secs = config::with_config(|cfg| cfg.registry.subscription_ttl_secs) as i64;

    let row = match state.store.upsert_subscription(conn_id, kind, topic_key, ttl_secs).await {
        Ok(row) => row,
        Err(e) => {
            logger::warning(
                LogTag::Registry,
                &format!(
                    "Connection {}: subscribe {}:{} failed: {}",
                    conn_id, kind, topic_key, e
                ),
            );
            return ServerMessage::Error {
                message: "Subscription failed".to_string(),
                code: Some("subscription_failed".to_string()),
            };
        }
    };

    if let Some(rooms) = &state.rooms {
        if let Some(sender) = state.hub.sender_for(conn_id).await {
            let room_key = kind.room_key(topic_key);
            match rooms.join(&room_key, conn_id, sender).await {
                Ok(()) => {
                    joined_rooms.insert(room_key);
                }
                // Registry row stays; the queue fallback still reaches us
                Err(e) => logger::warning(
                    LogTag::Ws,
                    &format!("Connection {}: room join failed: {}", conn_id, e),
                ),
            }
        }
    }

    if is_debug_registry_enabled() {
        logger::debug(
            LogTag::Registry,
            &format!("Connection {} subscribed to {}:{}", conn_id, kind, topic_key),
        );
    }

    ServerMessage::SubscriptionConfirmed {
        kind,
        topic_key: topic_key.to_string(),
        expires_at: row.expires_at,
    }
}

/// Drop a subscription; unknown topics are ignored
async fn unsubscribe_topic(
    state: &AppState,
    conn_id: &str,
    joined_rooms: &mut HashSet<String>,
    kind: TopicKind,
    topic_key: &str,
) {
    if let Err(e) = state.store.remove_subscription(conn_id, kind, topic_key).await {
        logger::warning(
            LogTag::Registry,
            &format!(
                "Connection {}: unsubscribe {}:{} failed: {}",
                conn_id, kind, topic_key, e
            ),
        );
    }

    let room_key = kind.room_key(topic_key);
    if joined_rooms.remove(&room_key) {
        if let Some(rooms) = &state.rooms {
            if let Err(e) = rooms.leave(&room_key, conn_id).await {
                logger::debug(
                    LogTag::Ws,
                    &format!("Connection {}: leave {} failed: {}", conn_id, room_key, e),
                );
            }
        }
    }

    if is_debug_registry_enabled() {
        logger::debug(
            LogTag::Registry,
            &format!("Connection {} unsubscribed from {}:{}", conn_id, kind, topic_key),
        );
    }
}
