use crate::config_struct;

config_struct! {
    /// Subscription registry configuration
    pub struct RegistryConfig {
        /// Subscription row lifetime; refreshed on every re-subscribe
        subscription_ttl_secs: u64 = 3600,
    }
}
