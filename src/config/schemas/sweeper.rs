use crate::config_struct;

config_struct! {
    /// Expiry sweeper configuration
    pub struct SweeperConfig {
        /// Run the sweeper service
        enabled: bool = true,

        /// Seconds between sweep passes
        interval_secs: u64 = 300,

        /// Expired rows fetched per batch while paginating a table
        batch_size: usize = 500,
    }
}
