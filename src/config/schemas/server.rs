use crate::config_struct;

config_struct! {
    /// HTTP/WebSocket server configuration
    pub struct ServerConfig {
        /// Bind address
        host: String = "127.0.0.1".to_string(),

        /// Listen port
        port: u16 = 8080,

        /// Allow cross-origin requests (dashboards on other ports)
        cors_enabled: bool = true,

        /// Per-connection outbound message buffer (messages)
        ws_buffer_size: usize = 256,

        /// Seconds of silence before the server pings a socket
        heartbeat_interval_secs: u64 = 30,

        /// Seconds of total inactivity before a socket is closed
        idle_timeout_secs: u64 = 90,

        /// Seconds to wait for a pong before the socket is considered dead
        pong_timeout_secs: u64 = 10,
    }
}
