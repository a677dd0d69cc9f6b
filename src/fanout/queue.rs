/// Queue engine (durable outbox + worker pool)
///
/// Publishing is enqueue-and-forget. Workers drain the outbox, fan each
/// message out through the registry, and ack on completion. A worker
/// dying mid-message leaves the row invisible until its visibility
/// timeout lapses, at which point another worker redelivers the whole
/// batch: at-least-once, with duplicates possible after a crash.
use super::delivery;
use super::Broadcaster;
use crate::arguments::is_debug_queue_enabled;
use crate::config::FanoutConfig;
use crate::core::{BroadcastMessage, GateResult};
use crate::logger::{self, LogTag};
use crate::store::{GatewayStore, OutboxItem};
use crate::webserver::ws::hub::WsHub;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Wakes parked workers the moment something is enqueued
static OUTBOX_WAKE: Lazy<Arc<Notify>> = Lazy::new(|| Arc::new(Notify::new()));

pub struct QueueBroadcaster {
    store: Arc<GatewayStore>,
}

impl QueueBroadcaster {
    pub fn new(store: Arc<GatewayStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Broadcaster for QueueBroadcaster {
    async fn publish(&self, message: BroadcastMessage) -> GateResult<()> {
        let id = self.store.enqueue_outbox(&message).await?;
        if is_debug_queue_enabled() {
            logger::debug(
                LogTag::Queue,
                &format!(
                    "Enqueued {} update for {} (entry {})",
                    message.kind, message.topic_key, id
                ),
            );
        }
        OUTBOX_WAKE.notify_one();
        Ok(())
    }

    fn engine_name(&self) -> &'static str {
        "queue"
    }
}

/// Worker tuning derived from config
#[derive(Debug, Clone)]
pub struct WorkerParams {
    pub visibility_timeout_ms: i64,
    pub max_receive_count: i64,
    pub delivery_parallelism: usize,
    pub send_timeout: Duration,
    pub poll_interval: Duration,
}

impl WorkerParams {
    pub fn from_config(config: &FanoutConfig) -> Self {
        Self {
            visibility_timeout_ms: (config.visibility_timeout_secs * 1000) as i64,
            max_receive_count: config.max_receive_count,
            delivery_parallelism: config.delivery_parallelism,
            send_timeout: Duration::from_millis(config.send_timeout_ms),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }
}

/// Start the worker pool
pub fn spawn_workers(
    worker_count: usize,
    store: Arc<GatewayStore>,
    hub: Arc<WsHub>,
    params: WorkerParams,
    shutdown: Arc<Notify>,
) -> Vec<JoinHandle<()>> {
    (0..worker_count.max(1))
        .map(|worker_id| {
            let store = store.clone();
            let hub = hub.clone();
            let params = params.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                worker_loop(worker_id, store, hub, params, shutdown).await;
            })
        })
        .collect()
}

async fn worker_loop(
    worker_id: usize,
    store: Arc<GatewayStore>,
    hub: Arc<WsHub>,
    params: WorkerParams,
    shutdown: Arc<Notify>,
) {
    logger::info(LogTag::Queue, &format!("Outbox worker {} started", worker_id));

    loop {
        // Drain everything currently visible
        loop {
            match store.claim_next_from_outbox(params.visibility_timeout_ms).await {
                Ok(Some(item)) => {
                    process_item(&store, &hub, item, &params).await;
                }
                Ok(None) => break,
                Err(e) => {
                    if e.is_recoverable() {
                        logger::warning(
                            LogTag::Queue,
                            &format!("Worker {}: claim failed, retrying: {}", worker_id, e),
                        );
                        tokio::time::sleep(Duration::from_millis(500)).await;
                    } else {
                        logger::error(
                            LogTag::Queue,
                            &format!("Worker {}: claim failed: {}", worker_id, e),
                        );
                    }
                    break;
                }
            }
        }

        tokio::select! {
            _ = shutdown.notified() => {
                logger::info(LogTag::Queue, &format!("Outbox worker {} stopped", worker_id));
                return;
            }
            _ = OUTBOX_WAKE.notified() => {}
            _ = tokio::time::sleep(params.poll_interval) => {}
        }
    }
}

/// Deliver one claimed entry and settle it
///
/// The entry is acked after a completed pass even when some recipients
/// failed; per-recipient retry is not part of the contract. Only a
/// store-level fan-out failure leaves the entry for redelivery, and the
/// receive-count cap keeps a poison entry from cycling forever.
pub(crate) async fn process_item(
    store: &GatewayStore,
    hub: &WsHub,
    item: OutboxItem,
    params: &WorkerParams,
) {
    if item.receive_count > params.max_receive_count {
        logger::warning(
            LogTag::Queue,
            &format!(
                "Dropping outbox entry {} for {} after {} deliveries",
                item.id, item.message.topic_key, item.receive_count
            ),
        );
        ack(store, item.id).await;
        return;
    }

    match delivery::fan_out_from_registry(
        store,
        hub,
        &item.message,
        params.delivery_parallelism,
        params.send_timeout,
    )
    .await
    {
        Ok(report) => {
            if is_debug_queue_enabled() {
                logger::debug(
                    LogTag::Queue,
                    &format!(
                        "Entry {} fanned out to {} (delivered={}, pruned={}, skipped={})",
                        item.id,
                        item.message.topic_key,
                        report.delivered,
                        report.pruned,
                        report.skipped
                    ),
                );
            }
            ack(store, item.id).await;
        }
        Err(e) => {
            logger::warning(
                LogTag::Queue,
                &format!("Entry {} fan-out failed, leaving for redelivery: {}", item.id, e),
            );
        }
    }
}

async fn ack(store: &GatewayStore, id: i64) {
    if let Err(e) = store.ack_outbox(id).await {
        logger::warning(LogTag::Queue, &format!("Failed to ack outbox entry {}: {}", id, e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TopicKind;
    use crate::webserver::ws::message::ServerMessage;
    use serde_json::json;

    fn test_params() -> WorkerParams {
        WorkerParams {
            visibility_timeout_ms: 30_000,
            max_receive_count: 3,
            delivery_parallelism: 8,
            send_timeout: Duration::from_millis(500),
            poll_interval: Duration::from_millis(50),
        }
    }

    async fn open_test_store(dir: &tempfile::TempDir) -> Arc<GatewayStore> {
        Arc::new(GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap())
    }

    #[tokio::test]
    async fn test_publish_then_worker_delivers_and_acks() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;
        let hub = WsHub::new(16);

        let (conn_id, mut rx) = hub.register_connection().await;
        store.upsert_subscription(&conn_id, TopicKind::Price, "TOK", 3600).await.unwrap();

        let shutdown = Arc::new(Notify::new());
        let handles = spawn_workers(2, store.clone(), hub.clone(), test_params(), shutdown.clone());

        let broadcaster = QueueBroadcaster::new(store.clone());
        broadcaster
            .publish(BroadcastMessage::new(TopicKind::Price, "TOK", json!({"price": 1.23})))
            .await
            .unwrap();

        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(frame, ServerMessage::PriceUpdate { price, .. } if price == 1.23));

        // Delivered entries get acked off the queue
        let mut depth = store.outbox_depth().await.unwrap();
        for _ in 0..50 {
            if depth == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            depth = store.outbox_depth().await.unwrap();
        }
        assert_eq!(depth, 0);

        shutdown.notify_waiters();
        for handle in handles {
            let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
        }
    }

    #[tokio::test]
    async fn test_poison_entry_is_dropped_after_max_receives() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;
        let hub = WsHub::new(16);
        let params = test_params();

        let msg = BroadcastMessage::new(TopicKind::Price, "TOK", json!({"price": 1.0}));
        store.enqueue_outbox(&msg).await.unwrap();

        // Burn through the allowed deliveries with instant-expiry claims
        for expected in 1..=params.max_receive_count {
            let item = store.claim_next_from_outbox(0).await.unwrap().unwrap();
            assert_eq!(item.receive_count, expected);
        }

        let over_limit = store.claim_next_from_outbox(0).await.unwrap().unwrap();
        assert_eq!(over_limit.receive_count, params.max_receive_count + 1);
        process_item(&store, &hub, over_limit, &params).await;

        assert_eq!(store.outbox_depth().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_completed_pass_acks_even_with_failed_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;
        let hub = WsHub::new(16);
        let params = test_params();

        // Subscriber whose socket is already gone
        let (conn_id, rx) = hub.register_connection().await;
        drop(rx);
        store.upsert_subscription(&conn_id, TopicKind::Price, "TOK", 3600).await.unwrap();

        let msg = BroadcastMessage::new(TopicKind::Price, "TOK", json!({"price": 1.0}));
        store.enqueue_outbox(&msg).await.unwrap();

        let item = store.claim_next_from_outbox(30_000).await.unwrap().unwrap();
        process_item(&store, &hub, item, &params).await;

        assert_eq!(store.outbox_depth().await.unwrap(), 0);
        assert!(store.resolve_subscribers(TopicKind::Price, "TOK").await.unwrap().is_empty());
    }
}
