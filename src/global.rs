/// Global runtime helpers shared across the gateway
///
/// The millisecond clock lives here because every TTL field in the store
/// (nonces, subscriptions, outbox visibility) is stored and compared in
/// the same unit.
use chrono::Utc;

/// Current unix time in milliseconds
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
