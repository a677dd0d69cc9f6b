/// WebSocket message schema
///
/// Client messages are action-tagged commands; server messages are
/// type-tagged frames. Field names on the wire are camelCase. The update
/// frame types (PRICE_UPDATE, BALANCE_UPDATE) are uppercase for parity
/// with the web clients that consume them.
use crate::core::TopicKind;
use serde::{Deserialize, Serialize};

// ============================================================================
// CLIENT MESSAGES (Client → Server)
// ============================================================================

/// Client control messages
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Subscribe to a token's price stream
    SubscribePrice { token: String },

    /// Subscribe to a wallet's balance stream
    SubscribeBalance { wallet: String },

    /// Drop a price subscription
    UnsubscribePrice { token: String },

    /// Drop a balance subscription
    UnsubscribeBalance { wallet: String },

    /// Liveness probe
    Ping,
}

// ============================================================================
// SERVER MESSAGES (Server → Client)
// ============================================================================

/// Server frames
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Admission acknowledgment, first frame on every connection
    #[serde(rename = "connected", rename_all = "camelCase")]
    Connected { connection_id: String, timestamp: i64 },

    #[serde(rename = "PRICE_UPDATE", rename_all = "camelCase")]
    PriceUpdate {
        token: String,
        price: f64,
        timestamp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        slot: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tx_signature: Option<String>,
    },

    #[serde(rename = "BALANCE_UPDATE", rename_all = "camelCase")]
    BalanceUpdate {
        wallet: String,
        token: String,
        balance: f64,
        timestamp: i64,
    },

    #[serde(rename = "SUBSCRIPTION_CONFIRMED", rename_all = "camelCase")]
    SubscriptionConfirmed {
        kind: TopicKind,
        topic_key: String,
        expires_at: i64,
    },

    #[serde(rename = "ERROR")]
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Reply to a client ping
    #[serde(rename = "pong")]
    Pong,
}

impl ServerMessage {
    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
