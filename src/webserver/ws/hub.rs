/// Central WebSocket hub
///
/// Owns the connection-id → sender map. Each connection's socket task is
/// the only writer to its sink; everything else (queue workers, room
/// actors, route handlers) pushes frames through the per-connection
/// channel registered here.
use super::message::ServerMessage;
use crate::arguments::is_debug_ws_enabled;
use crate::core::{ConnectionId, DeliveryError};
use crate::logger::{self, LogTag};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

/// Per-connection sender (bounded channel)
pub type ConnectionSender = mpsc::Sender<ServerMessage>;

pub struct WsHub {
    /// Active connections (connection_id → sender)
    connections: RwLock<HashMap<ConnectionId, ConnectionSender>>,

    /// Per-client buffer size (from config)
    buffer_size: usize,
}

impl WsHub {
    pub fn new(buffer_size: usize) -> Arc<Self> {
        Arc::new(Self {
            connections: RwLock::new(HashMap::new()),
            buffer_size,
        })
    }

    /// Register a new connection and hand back its frame receiver
    pub async fn register_connection(&self) -> (ConnectionId, mpsc::Receiver<ServerMessage>) {
        let conn_id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(self.buffer_size);

        let active = {
            let mut connections = self.connections.write().await;
            connections.insert(conn_id.clone(), tx);
            connections.len()
        };

        if is_debug_ws_enabled() {
            logger::debug(
                LogTag::Ws,
                &format!("Connection {} registered (active={})", conn_id, active),
            );
        }

        (conn_id, rx)
    }

    /// Drop a connection's sender; in-flight sends to it start failing
    pub async fn unregister_connection(&self, conn_id: &str) {
        let active = {
            let mut connections = self.connections.write().await;
            connections.remove(conn_id);
            connections.len()
        };

        if is_debug_ws_enabled() {
            logger::debug(
                LogTag::Ws,
                &format!("Connection {} unregistered (active={})", conn_id, active),
            );
        }
    }

    /// Clone of a connection's sender, for handing to a room actor
    pub async fn sender_for(&self, conn_id: &str) -> Option<ConnectionSender> {
        self.connections.read().await.get(conn_id).cloned()
    }

    /// Non-blocking targeted send
    pub async fn try_send_to(
        &self,
        conn_id: &str,
        message: ServerMessage,
    ) -> Result<(), DeliveryError> {
        let sender = {
            let connections = self.connections.read().await;
            connections.get(conn_id).cloned()
        };
        let Some(sender) = sender else {
            return Err(DeliveryError::Gone);
        };

        match sender.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(DeliveryError::BufferFull),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(DeliveryError::Gone),
        }
    }

    /// Targeted send bounded by a timeout
    ///
    /// A connection that cannot accept a frame within the window is
    /// treated the same as a dead one.
    pub async fn send_to_with_timeout(
        &self,
        conn_id: &str,
        message: ServerMessage,
        timeout: Duration,
    ) -> Result<(), DeliveryError> {
        let sender = {
            let connections = self.connections.read().await;
            connections.get(conn_id).cloned()
        };
        let Some(sender) = sender else {
            return Err(DeliveryError::Gone);
        };

        match sender.send_timeout(message, timeout).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => Err(DeliveryError::Timeout),
            Err(mpsc::error::SendTimeoutError::Closed(_)) => Err(DeliveryError::Gone),
        }
    }

    /// Active connection count
    pub async fn active_connections(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pong() -> ServerMessage {
        ServerMessage::Pong
    }

    #[tokio::test]
    async fn test_registration_and_unregistration() {
        let hub = WsHub::new(10);

        let (id1, _rx1) = hub.register_connection().await;
        let (id2, _rx2) = hub.register_connection().await;
        assert_ne!(id1, id2);
        assert_eq!(hub.active_connections().await, 2);

        hub.unregister_connection(&id1).await;
        assert_eq!(hub.active_connections().await, 1);
        assert!(hub.sender_for(&id1).await.is_none());
        assert!(hub.sender_for(&id2).await.is_some());
    }

    #[tokio::test]
    async fn test_targeted_send_reaches_only_target() {
        let hub = WsHub::new(10);
        let (id1, mut rx1) = hub.register_connection().await;
        let (_id2, mut rx2) = hub.register_connection().await;

        hub.try_send_to(&id1, pong()).await.unwrap();

        assert_eq!(rx1.recv().await.unwrap(), ServerMessage::Pong);
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_unknown_connection_is_gone() {
        let hub = WsHub::new(10);
        assert_eq!(hub.try_send_to("missing", pong()).await, Err(DeliveryError::Gone));
    }

    #[tokio::test]
    async fn test_send_to_dropped_receiver_is_gone() {
        let hub = WsHub::new(10);
        let (id, rx) = hub.register_connection().await;
        drop(rx);

        assert_eq!(hub.try_send_to(&id, pong()).await, Err(DeliveryError::Gone));
    }

    #[tokio::test]
    async fn test_full_buffer_is_transient_for_try_send() {
        let hub = WsHub::new(1);
        let (id, _rx) = hub.register_connection().await;

        hub.try_send_to(&id, pong()).await.unwrap();
        assert_eq!(hub.try_send_to(&id, pong()).await, Err(DeliveryError::BufferFull));
    }

    #[tokio::test]
    async fn test_full_buffer_times_out_for_bounded_send() {
        let hub = WsHub::new(1);
        let (id, _rx) = hub.register_connection().await;

        hub.try_send_to(&id, pong()).await.unwrap();
        let result = hub
            .send_to_with_timeout(&id, pong(), Duration::from_millis(20))
            .await;
        assert_eq!(result, Err(DeliveryError::Timeout));
    }
}
