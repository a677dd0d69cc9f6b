/// One-time login challenge issuance
use super::verify;
use crate::core::GateResult;
use crate::logger::{self, LogTag};
use crate::store::GatewayStore;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

/// Challenge handed to a client, to be signed and presented at connect
#[derive(Debug, Clone, Serialize)]
pub struct NonceGrant {
    pub nonce: String,
    pub expires_at: i64,
}

/// Cryptographically random alphanumeric challenge string
pub fn generate_nonce(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Issue a fresh nonce for a wallet
///
/// Reissuing is allowed at any frequency; the previous nonce for the
/// wallet is invalidated by the overwrite.
pub async fn issue_nonce(
    store: &GatewayStore,
    wallet: &str,
    ttl_secs: i64,
    nonce_length: usize,
) -> GateResult<NonceGrant> {
    verify::validate_wallet(wallet)?;

    let nonce = generate_nonce(nonce_length);
    let record = store.put_nonce(wallet, &nonce, ttl_secs).await?;

    logger::debug(
        LogTag::Auth,
        &format!("Issued nonce for wallet {} (expires {})", wallet, record.expires_at),
    );

    Ok(NonceGrant {
        nonce: record.nonce,
        expires_at: record.expires_at,
    })
}
