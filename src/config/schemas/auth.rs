use crate::config_struct;

config_struct! {
    /// Nonce issuance and admission configuration
    pub struct AuthConfig {
        /// Nonce lifetime. One nonce per wallet, overwritten on re-issue.
        nonce_ttl_secs: u64 = 600,

        /// Length of the generated alphanumeric nonce value
        nonce_length: usize = 32,
    }
}
