/// Registry-driven delivery
///
/// Shared by the queue workers: resolve the topic's subscribers, render
/// the outbound frame once, push it to every live connection with bounded
/// parallelism, settle all outcomes, then prune the permanently dead.
use crate::arguments::is_debug_fanout_enabled;
use crate::core::{BroadcastMessage, StoreError, TopicKind};
use crate::global;
use crate::logger::{self, LogTag};
use crate::store::GatewayStore;
use crate::webserver::ws::hub::WsHub;
use crate::webserver::ws::message::ServerMessage;
use futures::future::join_all;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Price tick payload as supplied by publishers
#[derive(Debug, Deserialize)]
struct PricePayload {
    price: f64,
    timestamp: Option<i64>,
    slot: Option<u64>,
    #[serde(alias = "txSignature")]
    tx_signature: Option<String>,
}

/// Balance change payload as supplied by publishers
#[derive(Debug, Deserialize)]
struct BalancePayload {
    token: String,
    balance: f64,
    timestamp: Option<i64>,
}

/// Outcome counts for one fan-out pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Registry rows resolved for the topic
    pub attempted: usize,
    /// Frames that reached a connection's queue
    pub delivered: usize,
    /// Permanently dead recipients whose rows were removed
    pub pruned: usize,
    /// Expired rows and transient failures, left for the next pass
    pub skipped: usize,
}

/// Render the outbound frame for a message
///
/// The topic key supplies the token (price topics) or wallet (balance
/// topics); the payload supplies the rest. A payload that does not fit
/// its kind is logged and dropped rather than bounced around the queue.
pub fn render_update(message: &BroadcastMessage) -> Option<ServerMessage> {
    match message.kind {
        TopicKind::Price => match serde_json::from_value::<PricePayload>(message.payload.clone()) {
            Ok(p) => Some(ServerMessage::PriceUpdate {
                token: message.topic_key.clone(),
                price: p.price,
                timestamp: p.timestamp.unwrap_or(message.timestamp),
                slot: p.slot,
                tx_signature: p.tx_signature,
            }),
            Err(e) => {
                logger::warning(
                    LogTag::Fanout,
                    &format!("Undeliverable price payload for {}: {}", message.topic_key, e),
                );
                None
            }
        },
        TopicKind::Balance => {
            match serde_json::from_value::<BalancePayload>(message.payload.clone()) {
                Ok(p) => Some(ServerMessage::BalanceUpdate {
                    wallet: message.topic_key.clone(),
                    token: p.token,
                    balance: p.balance,
                    timestamp: p.timestamp.unwrap_or(message.timestamp),
                }),
                Err(e) => {
                    logger::warning(
                        LogTag::Fanout,
                        &format!(
                            "Undeliverable balance payload for {}: {}",
                            message.topic_key, e
                        ),
                    );
                    None
                }
            }
        }
    }
}

/// Deliver one message to every current subscriber of its topic
///
/// Expired rows are filtered here, at delivery time, never at read time.
/// One broken recipient cannot abort the pass: every outcome is awaited
/// and the report aggregates them.
pub async fn fan_out_from_registry(
    store: &GatewayStore,
    hub: &WsHub,
    message: &BroadcastMessage,
    parallelism: usize,
    send_timeout: Duration,
) -> Result<DeliveryReport, StoreError> {
    let mut report = DeliveryReport::default();

    let Some(frame) = render_update(message) else {
        return Ok(report);
    };

    let rows = store.resolve_subscribers(message.kind, &message.topic_key).await?;
    report.attempted = rows.len();
    if rows.is_empty() {
        return Ok(report);
    }

    let now = global::now_ms();
    let (live, expired): (Vec<_>, Vec<_>) = rows.into_iter().partition(|r| !r.is_expired(now));
    report.skipped += expired.len();

    let semaphore = Arc::new(Semaphore::new(parallelism.max(1)));
    let outcomes = join_all(live.iter().map(|row| {
        let semaphore = semaphore.clone();
        let frame = frame.clone();
        async move {
            let _permit = semaphore.acquire().await;
            hub.send_to_with_timeout(&row.connection_id, frame, send_timeout).await
        }
    }))
    .await;

    for (row, outcome) in live.iter().zip(outcomes) {
        match outcome {
            Ok(()) => report.delivered += 1,
            Err(e) if e.is_permanent() => {
                report.pruned += 1;
                if let Err(store_err) = store.remove_all_for_connection(&row.connection_id).await {
                    logger::warning(
                        LogTag::Fanout,
                        &format!(
                            "Failed to prune dead connection {}: {}",
                            row.connection_id, store_err
                        ),
                    );
                } else if is_debug_fanout_enabled() {
                    logger::debug(
                        LogTag::Fanout,
                        &format!("Pruned dead connection {} ({})", row.connection_id, e),
                    );
                }
            }
            Err(e) => {
                report.skipped += 1;
                if is_debug_fanout_enabled() {
                    logger::debug(
                        LogTag::Fanout,
                        &format!("Skipped {} this pass ({})", row.connection_id, e),
                    );
                }
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn price_message(topic_key: &str, payload: serde_json::Value) -> BroadcastMessage {
        BroadcastMessage::new(TopicKind::Price, topic_key, payload)
    }

    #[test]
    fn test_render_price_update_with_timestamp_fallback() {
        let msg = price_message("MintA", json!({"price": 1.23}));
        let frame = render_update(&msg).unwrap();
        assert_eq!(
            frame,
            ServerMessage::PriceUpdate {
                token: "MintA".to_string(),
                price: 1.23,
                timestamp: msg.timestamp,
                slot: None,
                tx_signature: None,
            }
        );

        // Publisher-supplied fields win over defaults
        let msg = price_message(
            "MintA",
            json!({"price": 2.0, "timestamp": 1000, "slot": 7, "txSignature": "sig"}),
        );
        let frame = render_update(&msg).unwrap();
        assert_eq!(
            frame,
            ServerMessage::PriceUpdate {
                token: "MintA".to_string(),
                price: 2.0,
                timestamp: 1000,
                slot: Some(7),
                tx_signature: Some("sig".to_string()),
            }
        );
    }

    #[test]
    fn test_render_balance_update() {
        let msg = BroadcastMessage::new(
            TopicKind::Balance,
            "WalletA",
            json!({"token": "MintA", "balance": 42.5, "timestamp": 2000}),
        );
        assert_eq!(
            render_update(&msg).unwrap(),
            ServerMessage::BalanceUpdate {
                wallet: "WalletA".to_string(),
                token: "MintA".to_string(),
                balance: 42.5,
                timestamp: 2000,
            }
        );
    }

    #[test]
    fn test_render_rejects_mismatched_payload() {
        assert!(render_update(&price_message("MintA", json!({"prize": 1.0}))).is_none());
        let msg = BroadcastMessage::new(TopicKind::Balance, "WalletA", json!({"balance": 1.0}));
        assert!(render_update(&msg).is_none());
    }

    #[tokio::test]
    async fn test_fan_out_reaches_all_subscribers_and_nobody_else() {
        let dir = tempfile::tempdir().unwrap();
        let store = GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap();
        let hub = WsHub::new(16);

        let (c1, mut rx1) = hub.register_connection().await;
        let (c2, mut rx2) = hub.register_connection().await;
        let (_c3, mut rx3) = hub.register_connection().await;

        store.upsert_subscription(&c1, TopicKind::Price, "TOK", 3600).await.unwrap();
        store.upsert_subscription(&c2, TopicKind::Price, "TOK", 3600).await.unwrap();

        let msg = price_message("TOK", json!({"price": 1.23, "timestamp": 1000}));
        let report = fan_out_from_registry(&store, &hub, &msg, 16, Duration::from_millis(500))
            .await
            .unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.pruned, 0);

        for rx in [&mut rx1, &mut rx2] {
            let frame = rx.recv().await.unwrap();
            assert!(matches!(
                frame,
                ServerMessage::PriceUpdate { price, timestamp: 1000, .. } if price == 1.23
            ));
            // Exactly one frame each
            assert!(rx.try_recv().is_err());
        }
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_subscriber_is_pruned_and_rest_still_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let store = GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap();
        let hub = WsHub::new(16);

        let (c1, mut rx1) = hub.register_connection().await;
        let (c2, rx2) = hub.register_connection().await;
        drop(rx2);

        store.upsert_subscription(&c1, TopicKind::Price, "TOK", 3600).await.unwrap();
        store.upsert_subscription(&c2, TopicKind::Price, "TOK", 3600).await.unwrap();

        let msg = price_message("TOK", json!({"price": 9.0}));
        let report = fan_out_from_registry(&store, &hub, &msg, 16, Duration::from_millis(500))
            .await
            .unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.pruned, 1);
        assert!(rx1.recv().await.is_some());

        // Registry no longer lists the dead connection
        let remaining = store.resolve_subscribers(TopicKind::Price, "TOK").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].connection_id, c1);
    }

    #[tokio::test]
    async fn test_expired_rows_are_skipped_not_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let store = GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap();
        let hub = WsHub::new(16);

        let (c1, mut rx1) = hub.register_connection().await;
        store.upsert_subscription(&c1, TopicKind::Price, "TOK", -5).await.unwrap();

        let msg = price_message("TOK", json!({"price": 1.0}));
        let report = fan_out_from_registry(&store, &hub, &msg, 16, Duration::from_millis(500))
            .await
            .unwrap();

        assert_eq!(report.attempted, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.skipped, 1);
        assert!(rx1.try_recv().is_err());
        // Expired rows are the sweeper's job, not delivery's
        assert_eq!(store.resolve_subscribers(TopicKind::Price, "TOK").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_undeliverable_payload_is_dropped_quietly() {
        let dir = tempfile::tempdir().unwrap();
        let store = GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap();
        let hub = WsHub::new(16);

        let msg = price_message("TOK", json!("not an object"));
        let report = fan_out_from_registry(&store, &hub, &msg, 16, Duration::from_millis(500))
            .await
            .unwrap();
        assert_eq!(report, DeliveryReport::default());
    }
}
