/// Wallet and signature validation
///
/// Wallets are base58-encoded ed25519 public keys. Signatures are detached
/// ed25519 over the raw UTF-8 bytes of the nonce, base58-encoded.
use crate::core::AuthError;
use ed25519_dalek::{Signature, VerifyingKey};

/// Decode a wallet address into its 32 public-key bytes
pub fn validate_wallet(wallet: &str) -> Result<[u8; 32], AuthError> {
    let bytes = bs58::decode(wallet)
        .into_vec()
        .map_err(|_| AuthError::MalformedWallet(wallet.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| AuthError::MalformedWallet(wallet.to_string()))
}

/// Check a detached signature over the nonce bytes
///
/// Every decode failure collapses into InvalidSignature: at this point the
/// caller has already matched a stored nonce, so the only question left is
/// whether the signer holds the wallet's key.
pub fn verify_nonce_signature(wallet: &str, nonce: &str, signature: &str) -> Result<(), AuthError> {
    let key_bytes = validate_wallet(wallet).map_err(|_| AuthError::InvalidSignature)?;
    let verifying_key =
        VerifyingKey::from_bytes(&key_bytes).map_err(|_| AuthError::InvalidSignature)?;

    let sig_bytes: [u8; 64] = bs58::decode(signature)
        .into_vec()
        .map_err(|_| AuthError::InvalidSignature)?
        .try_into()
        .map_err(|_| AuthError::InvalidSignature)?;
    let sig = Signature::from_bytes(&sig_bytes);

    verifying_key
        .verify_strict(nonce.as_bytes(), &sig)
        .map_err(|_| AuthError::InvalidSignature)
}
