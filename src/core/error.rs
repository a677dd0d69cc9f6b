use thiserror::Error;

/// Why a connection attempt was rejected
///
/// These map one-to-one onto the reason codes returned to clients, so
/// variants are wire-stable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Nonce is invalid or expired")] InvalidOrExpiredNonce,

    #[error("Signature verification failed")] InvalidSignature,

    #[error("Malformed wallet address: {0}")] MalformedWallet(String),
}

impl AuthError {
    /// Stable machine-readable code for HTTP responses and ERROR frames
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidOrExpiredNonce => "invalid_or_expired_nonce",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::MalformedWallet(_) => "malformed_wallet",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store not initialized")] NotInitialized,

    #[error("Connection pool error: {0}")] Pool(String),

    #[error("Database error: {0}")] Database(#[from] rusqlite::Error),

    #[error("Corrupt row: {0}")] Corrupt(String),
}

impl StoreError {
    /// Pool exhaustion and busy timeouts clear up on their own; schema or
    /// row-level failures do not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StoreError::Pool(_))
    }
}

/// Outcome of pushing one message to one connection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Connection is gone")] Gone,

    #[error("Connection send buffer is full")] BufferFull,

    #[error("Send timed out")] Timeout,

    #[error("Room dispatch failed: {0}")] Dispatch(String),
}

impl DeliveryError {
    /// Permanent failures prune the subscriber; transient ones skip the
    /// message and leave the subscription alone. A send that cannot
    /// complete within its timeout counts as a dead connection.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DeliveryError::Gone | DeliveryError::Timeout)
    }
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")] Auth(#[from] AuthError),

    #[error("Store error: {0}")] Store(#[from] StoreError),

    #[error("Fanout error: {0}")] Fanout(String),

    #[error("Serialization error: {0}")] Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")] Io(#[from] std::io::Error),
}

pub type GateResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_codes_are_stable() {
        assert_eq!(AuthError::InvalidOrExpiredNonce.code(), "invalid_or_expired_nonce");
        assert_eq!(AuthError::InvalidSignature.code(), "invalid_signature");
        assert_eq!(AuthError::MalformedWallet("x".into()).code(), "malformed_wallet");
    }

    #[test]
    fn test_store_error_recoverability() {
        assert!(StoreError::Pool("timed out waiting for connection".into()).is_recoverable());
        assert!(!StoreError::NotInitialized.is_recoverable());
        assert!(!StoreError::Corrupt("bad kind".into()).is_recoverable());
    }

    #[test]
    fn test_delivery_error_permanence() {
        assert!(DeliveryError::Gone.is_permanent());
        assert!(DeliveryError::Timeout.is_permanent());
        assert!(!DeliveryError::BufferFull.is_permanent());
        assert!(!DeliveryError::Dispatch("mailbox closed".into()).is_permanent());
    }

    #[test]
    fn test_gateway_error_wraps_domain_errors() {
        let err: GatewayError = AuthError::InvalidSignature.into();
        assert_eq!(err.to_string(), "Authentication failed: Signature verification failed");

        let err: GatewayError = StoreError::NotInitialized.into();
        assert_eq!(err.to_string(), "Store error: Store not initialized");
    }
}
