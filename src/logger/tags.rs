/// Subsystem tags for log attribution
///
/// Each tag maps to a --debug-<key> CLI flag through `to_debug_key`, so a
/// single flag turns on Debug-level output for exactly one subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTag {
    /// Process lifecycle, services, signals
    System,
    /// Configuration loading and saving
    Config,
    /// HTTP server and REST routes
    Webserver,
    /// WebSocket connection handling
    Ws,
    /// Nonce issuance and admission gates
    Auth,
    /// Subscription registry operations
    Registry,
    /// Fan-out delivery
    Fanout,
    /// Per-topic room actors
    Rooms,
    /// Outbox queue and workers
    Queue,
    /// Expiry sweeper
    Sweeper,
    /// SQLite store
    Store,
    /// Test-only output
    Test,
    /// Escape hatch for one-off call sites
    Other(String),
}

impl LogTag {
    /// Uppercase tag string used in log lines
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Webserver => "WEBSERVER".to_string(),
            LogTag::Ws => "WS".to_string(),
            LogTag::Auth => "AUTH".to_string(),
            LogTag::Registry => "REGISTRY".to_string(),
            LogTag::Fanout => "FANOUT".to_string(),
            LogTag::Rooms => "ROOMS".to_string(),
            LogTag::Queue => "QUEUE".to_string(),
            LogTag::Sweeper => "SWEEPER".to_string(),
            LogTag::Store => "STORE".to_string(),
            LogTag::Test => "TEST".to_string(),
            LogTag::Other(s) => s.to_uppercase(),
        }
    }

    /// Key used for --debug-<key> and --verbose-<key> flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::Other(s) => s.to_lowercase(),
            other => other.to_plain_string().to_lowercase(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
