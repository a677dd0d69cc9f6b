/// Fan-out engines
///
/// One delivery contract, two engines. The queue engine decouples
/// publishers from delivery through a durable outbox drained by a worker
/// pool. The rooms engine routes each publish to a per-topic actor that
/// owns the live-socket set for that topic. Engine choice is a config
/// decision; when the rooms engine is selected it is wrapped in a
/// fallback decorator so a failed room dispatch degrades to the queue
/// instead of dropping the message.
pub mod delivery;
pub mod fallback;
pub mod queue;
pub mod rooms;

pub use delivery::DeliveryReport;
pub use fallback::FallbackBroadcaster;
pub use queue::QueueBroadcaster;
pub use rooms::{RoomManager, RoomStats};

use crate::config::FanoutConfig;
use crate::core::{BroadcastMessage, GateResult};
use crate::logger::{self, LogTag};
use crate::store::GatewayStore;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// The fan-out contract both engines implement
///
/// Publishing hands a message to the engine; delivery to every live
/// subscriber of the topic is best-effort and at-least-once. Dead
/// subscribers get pruned as a side effect.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn publish(&self, message: BroadcastMessage) -> GateResult<()>;

    /// Engine label for status reporting
    fn engine_name(&self) -> &'static str;
}

/// Build the configured engine
///
/// Returns the room manager alongside the broadcaster when the rooms
/// engine is active, so connection handlers can join sockets into rooms.
pub fn build_broadcaster(
    config: &FanoutConfig,
    store: Arc<GatewayStore>,
) -> (Arc<dyn Broadcaster>, Option<Arc<RoomManager>>) {
    let queue = Arc::new(QueueBroadcaster::new(store.clone()));

    match config.engine.as_str() {
        "rooms" => {
            let rooms = RoomManager::new(
                store,
                Duration::from_millis(config.dispatch_timeout_ms),
            );
            let primary = rooms::RoomBroadcaster::new(rooms.clone());
            let broadcaster = FallbackBroadcaster::new(Arc::new(primary), queue);
            (Arc::new(broadcaster), Some(rooms))
        }
        "queue" => (queue, None),
        other => {
            logger::warning(
                LogTag::Fanout,
                &format!("Unknown fanout engine '{}', using queue", other),
            );
            (queue, None)
        }
    }
}
