use crate::config_struct;

config_struct! {
    /// Log output configuration
    pub struct LoggingConfig {
        /// Minimum level: error, warning, info, debug, verbose.
        /// CLI --verbose/--quiet flags override this value.
        min_level: String = "info".to_string(),

        /// Mirror log lines into logs/streamgate.log
        file_enabled: bool = true,
    }
}
