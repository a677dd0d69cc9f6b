// Config schema submodule - one file per configuration section

use crate::config_struct;

mod auth;
mod fanout;
mod logging;
mod registry;
mod server;
mod sweeper;

pub use auth::*;
pub use fanout::*;
pub use logging::*;
pub use registry::*;
pub use server::*;
pub use sweeper::*;

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        /// HTTP/WebSocket server configuration
        server: ServerConfig = ServerConfig::default(),

        /// Nonce issuance and admission configuration
        auth: AuthConfig = AuthConfig::default(),

        /// Subscription registry configuration
        registry: RegistryConfig = RegistryConfig::default(),

        /// Fan-out engine configuration
        fanout: FanoutConfig = FanoutConfig::default(),

        /// Expiry sweeper configuration
        sweeper: SweeperConfig = SweeperConfig::default(),

        /// Log output configuration
        logging: LoggingConfig = LoggingConfig::default(),
    }
}
