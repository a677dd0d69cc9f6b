use crate::global;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Per-socket identifier assigned at upgrade time (UUID v4 string)
pub type ConnectionId = String;

/// The two subscription families the gateway fans out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKind {
    Price,
    Balance,
}

impl TopicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicKind::Price => "price",
            TopicKind::Balance => "balance",
        }
    }

    pub fn from_str(s: &str) -> Option<TopicKind> {
        match s {
            "price" => Some(TopicKind::Price),
            "balance" => Some(TopicKind::Balance),
            _ => None,
        }
    }

    /// Room addressing key, e.g. "price:So11111111111111111111111111111111111111112"
    pub fn room_key(&self, topic_key: &str) -> String {
        format!("{}:{}", self.as_str(), topic_key)
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One update entering the fan-out pipeline
///
/// `topic_key` is the token mint for price topics and the wallet address
/// for balance topics. `payload` stays an opaque JSON object until
/// delivery time, when it is rendered into the outbound frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastMessage {
    pub kind: TopicKind,
    pub topic_key: String,
    pub payload: Value,
    pub timestamp: i64,
}

impl BroadcastMessage {
    pub fn new(kind: TopicKind, topic_key: &str, payload: Value) -> Self {
        Self {
            kind,
            topic_key: topic_key.to_string(),
            payload,
            timestamp: global::now_ms(),
        }
    }

    pub fn room_key(&self) -> String {
        self.kind.room_key(&self.topic_key)
    }
}
