/// Connection authentication
///
/// Clients prove wallet ownership by signing a previously issued nonce.
/// The gates run in a fixed order: nonce lookup and comparison first,
/// signature verification second, nonce consumption last. Signature
/// checks never run against a nonce that is missing, mismatched, or
/// expired.
pub mod nonce;
pub mod verify;

pub use nonce::{generate_nonce, issue_nonce, NonceGrant};
pub use verify::{validate_wallet, verify_nonce_signature};

use crate::core::{AuthError, StoreError};
use crate::global;
use crate::logger::{self, LogTag};
use crate::store::GatewayStore;

/// Outcome of a connection attempt
///
/// A rejection is an orderly verdict, not a failure of the authenticator;
/// store trouble is the only thing surfaced as Err.
#[derive(Debug, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(AuthError),
}

/// Run the admission gates for a connect attempt
pub async fn authenticate(
    store: &GatewayStore,
    wallet: &str,
    nonce: &str,
    signature: &str,
) -> Result<Admission, StoreError> {
    let Some(record) = store.get_nonce(wallet).await? else {
        logger::debug(LogTag::Auth, &format!("No nonce on file for wallet {}", wallet));
        return Ok(Admission::Rejected(AuthError::InvalidOrExpiredNonce));
    };

    if record.nonce != nonce {
        logger::debug(LogTag::Auth, &format!("Nonce mismatch for wallet {}", wallet));
        return Ok(Admission::Rejected(AuthError::InvalidOrExpiredNonce));
    }

    if record.expires_at <= global::now_ms() {
        logger::debug(LogTag::Auth, &format!("Nonce expired for wallet {}", wallet));
        return Ok(Admission::Rejected(AuthError::InvalidOrExpiredNonce));
    }

    if let Err(reason) = verify::verify_nonce_signature(wallet, nonce, signature) {
        logger::debug(
            LogTag::Auth,
            &format!("Signature verification failed for wallet {}", wallet),
        );
        return Ok(Admission::Rejected(reason));
    }

    // Consume the nonce. A failure here does not bounce an authenticated
    // client; the sweeper reaps the leftover row.
    match store.delete_nonce_if_matches(wallet, nonce).await {
        Ok(true) => {}
        Ok(false) => {
            logger::debug(LogTag::Auth, &format!("Nonce for {} was already consumed", wallet));
        }
        Err(e) => {
            logger::warning(
                LogTag::Auth,
                &format!("Failed to consume nonce for {}: {}", wallet, e),
            );
        }
    }

    logger::info(LogTag::Auth, &format!("Admitted connection for wallet {}", wallet));
    Ok(Admission::Admitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    fn test_wallet() -> (SigningKey, String) {
        let signing_key = SigningKey::generate(&mut OsRng);
        let wallet = bs58::encode(signing_key.verifying_key().to_bytes()).into_string();
        (signing_key, wallet)
    }

    fn sign_b58(key: &SigningKey, message: &str) -> String {
        bs58::encode(key.sign(message.as_bytes()).to_bytes()).into_string()
    }

    async fn open_test_store(dir: &tempfile::TempDir) -> GatewayStore {
        GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_signed_nonce_admits_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;
        let (key, wallet) = test_wallet();

        let grant = issue_nonce(&store, &wallet, 600, 32).await.unwrap();
        let signature = sign_b58(&key, &grant.nonce);

        let first = authenticate(&store, &wallet, &grant.nonce, &signature).await.unwrap();
        assert_eq!(first, Admission::Admitted);

        // Nonce was consumed: replaying the same triple is refused
        let second = authenticate(&store, &wallet, &grant.nonce, &signature).await.unwrap();
        assert_eq!(second, Admission::Rejected(AuthError::InvalidOrExpiredNonce));
    }

    #[tokio::test]
    async fn test_foreign_key_signature_is_rejected_and_nonce_survives() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;
        let (key, wallet) = test_wallet();
        let (other_key, _) = test_wallet();

        let grant = issue_nonce(&store, &wallet, 600, 32).await.unwrap();

        let forged = sign_b58(&other_key, &grant.nonce);
        let verdict = authenticate(&store, &wallet, &grant.nonce, &forged).await.unwrap();
        assert_eq!(verdict, Admission::Rejected(AuthError::InvalidSignature));

        // Consumption happens only after a successful verify
        let signature = sign_b58(&key, &grant.nonce);
        let verdict = authenticate(&store, &wallet, &grant.nonce, &signature).await.unwrap();
        assert_eq!(verdict, Admission::Admitted);
    }

    #[tokio::test]
    async fn test_expired_nonce_is_rejected_even_with_valid_signature() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;
        let (key, wallet) = test_wallet();

        store.put_nonce(&wallet, "stale-nonce", -10).await.unwrap();
        let signature = sign_b58(&key, "stale-nonce");

        let verdict = authenticate(&store, &wallet, "stale-nonce", &signature).await.unwrap();
        assert_eq!(verdict, Admission::Rejected(AuthError::InvalidOrExpiredNonce));
    }

    #[tokio::test]
    async fn test_mismatched_nonce_value_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;
        let (key, wallet) = test_wallet();

        issue_nonce(&store, &wallet, 600, 32).await.unwrap();

        // Correctly signed, but over a value the store never issued
        let signature = sign_b58(&key, "imaginary-nonce");
        let verdict = authenticate(&store, &wallet, "imaginary-nonce", &signature).await.unwrap();
        assert_eq!(verdict, Admission::Rejected(AuthError::InvalidOrExpiredNonce));
    }

    #[tokio::test]
    async fn test_unknown_wallet_is_rejected_without_crypto() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        let verdict = authenticate(&store, "ghost-wallet", "nonce", "signature").await.unwrap();
        assert_eq!(verdict, Admission::Rejected(AuthError::InvalidOrExpiredNonce));
    }
}
