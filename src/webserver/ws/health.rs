/// Per-connection liveness tracking
///
/// The socket task ticks this once a second: idle clients are dropped,
/// quiet-but-alive ones get a protocol ping, and a ping left unanswered
/// past the pong window counts as dead.
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// How long a connection may stay quiet before the server pings it
    pub heartbeat_interval: Duration,

    /// No client activity at all for this long closes the connection
    pub idle_timeout: Duration,

    /// Grace window for answering a server ping
    pub pong_timeout: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(90),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

impl HealthConfig {
    pub fn from_config(heartbeat_secs: u64, idle_timeout_secs: u64, pong_timeout_secs: u64) -> Self {
        Self {
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            idle_timeout: Duration::from_secs(idle_timeout_secs),
            pong_timeout: Duration::from_secs(pong_timeout_secs),
        }
    }
}

#[derive(Debug)]
pub struct ConnectionHealth {
    /// Last client activity (any inbound frame)
    last_activity: Instant,

    /// Outstanding server ping, if any
    last_ping: Option<Instant>,

    config: HealthConfig,
}

impl ConnectionHealth {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            last_activity: Instant::now(),
            last_ping: None,
            config,
        }
    }

    /// Any inbound frame counts as activity and settles a pending ping
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
        self.last_ping = None;
    }

    pub fn record_ping(&mut self) {
        self.last_ping = Some(Instant::now());
    }

    pub fn is_idle(&self) -> bool {
        self.last_activity.elapsed() > self.config.idle_timeout
    }

    pub fn is_pong_overdue(&self) -> bool {
        self.last_ping
            .map(|sent| sent.elapsed() > self.config.pong_timeout)
            .unwrap_or(false)
    }

    /// Quiet long enough to warrant a ping, with none outstanding
    pub fn needs_ping(&self) -> bool {
        self.last_activity.elapsed() > self.config.heartbeat_interval && self.last_ping.is_none()
    }

    pub fn seconds_since_activity(&self) -> u64 {
        self.last_activity.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn tight_config() -> HealthConfig {
        HealthConfig {
            heartbeat_interval: Duration::from_millis(40),
            idle_timeout: Duration::from_millis(120),
            pong_timeout: Duration::from_millis(30),
        }
    }

    #[test]
    fn test_idle_detection() {
        let mut health = ConnectionHealth::new(tight_config());
        assert!(!health.is_idle());

        sleep(Duration::from_millis(150));
        assert!(health.is_idle());

        health.record_activity();
        assert!(!health.is_idle());
    }

    #[test]
    fn test_ping_pong_cycle() {
        let mut health = ConnectionHealth::new(tight_config());
        assert!(!health.needs_ping());

        sleep(Duration::from_millis(60));
        assert!(health.needs_ping());

        health.record_ping();
        assert!(!health.needs_ping());
        assert!(!health.is_pong_overdue());

        sleep(Duration::from_millis(50));
        assert!(health.is_pong_overdue());

        // A late reply still clears the pending ping
        health.record_activity();
        assert!(!health.is_pong_overdue());
    }
}
