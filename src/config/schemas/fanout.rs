use crate::config_struct;

config_struct! {
    /// Fan-out engine configuration
    pub struct FanoutConfig {
        /// Active engine: "queue" (durable outbox + workers) or "rooms"
        /// (per-topic actors with queue fallback)
        engine: String = "queue".to_string(),

        /// Outbox worker tasks draining the queue
        worker_count: usize = 4,

        /// Max concurrent socket sends per fan-out pass
        delivery_parallelism: usize = 16,

        /// Claims before a queue message is dropped as poison
        max_receive_count: i64 = 3,

        /// How long a claimed message stays invisible before redelivery
        visibility_timeout_secs: u64 = 30,

        /// Worker wake-up interval when no enqueue notification arrives
        poll_interval_secs: u64 = 5,

        /// Per-recipient send budget; exceeding it counts as a dead socket
        send_timeout_ms: u64 = 2000,

        /// Budget for handing a publish to a room actor before falling back
        dispatch_timeout_ms: u64 = 1000,
    }
}
