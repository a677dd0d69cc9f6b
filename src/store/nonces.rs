/// Login nonce storage
///
/// One row per wallet: reissuing overwrites, so only the latest nonce is
/// ever valid. Consumption is a conditional delete on the exact stored
/// value, which makes single-use atomic across concurrent attempts.
use super::db::GatewayStore;
use crate::core::StoreError;
use crate::global;
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonceRecord {
    pub wallet: String,
    pub nonce: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl GatewayStore {
    /// Store a fresh nonce for a wallet, replacing any previous one
    pub async fn put_nonce(
        &self,
        wallet: &str,
        nonce: &str,
        ttl_secs: i64,
    ) -> Result<NonceRecord, StoreError> {
        let conn = self.get_write_connection()?;
        let now = global::now_ms();
        let expires_at = now + ttl_secs * 1000;

        conn.execute(
            "INSERT INTO auth_nonces (wallet, nonce, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(wallet) DO UPDATE SET
                nonce = excluded.nonce,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at",
            params![wallet, nonce, now, expires_at],
        )?;

        Ok(NonceRecord {
            wallet: wallet.to_string(),
            nonce: nonce.to_string(),
            created_at: now,
            expires_at,
        })
    }

    /// Current nonce row for a wallet, expired or not
    pub async fn get_nonce(&self, wallet: &str) -> Result<Option<NonceRecord>, StoreError> {
        let conn = self.get_read_connection()?;

        let record = conn
            .query_row(
                "SELECT wallet, nonce, created_at, expires_at
                 FROM auth_nonces WHERE wallet = ?1",
                params![wallet],
                |row| {
                    Ok(NonceRecord {
                        wallet: row.get(0)?,
                        nonce: row.get(1)?,
                        created_at: row.get(2)?,
                        expires_at: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    /// Consume a nonce: delete only if the stored value still matches
    ///
    /// Returns false when the row is gone or holds a different value,
    /// meaning another attempt already consumed it or it was reissued.
    pub async fn delete_nonce_if_matches(
        &self,
        wallet: &str,
        nonce: &str,
    ) -> Result<bool, StoreError> {
        let conn = self.get_write_connection()?;
        let deleted = conn.execute(
            "DELETE FROM auth_nonces WHERE wallet = ?1 AND nonce = ?2",
            params![wallet, nonce],
        )?;
        Ok(deleted > 0)
    }

    /// Wallets whose nonce expired at or before `now`, one sweep page
    pub async fn list_expired_nonce_wallets(
        &self,
        now: i64,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.get_read_connection()?;
        let mut stmt = conn.prepare(
            "SELECT wallet FROM auth_nonces WHERE expires_at <= ?1
             ORDER BY expires_at LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![now, limit as i64], |row| row.get::<_, String>(0))?;

        let mut wallets = Vec::new();
        for row in rows {
            wallets.push(row?);
        }
        Ok(wallets)
    }

    /// Delete a nonce row only while it is still expired
    ///
    /// The expiry recheck keeps the sweeper from deleting a nonce that was
    /// reissued between listing and deletion.
    pub async fn delete_nonce_if_expired(&self, wallet: &str, now: i64) -> Result<bool, StoreError> {
        let conn = self.get_write_connection()?;
        let deleted = conn.execute(
            "DELETE FROM auth_nonces WHERE wallet = ?1 AND expires_at <= ?2",
            params![wallet, now],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_test_store(dir: &tempfile::TempDir) -> GatewayStore {
        GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_put_and_get_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        let put = store.put_nonce("wallet-a", "nonce-1", 600).await.unwrap();
        assert_eq!(put.expires_at, put.created_at + 600_000);

        let got = store.get_nonce("wallet-a").await.unwrap().unwrap();
        assert_eq!(got, put);
        assert!(store.get_nonce("wallet-b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reissue_overwrites_previous_nonce() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.put_nonce("wallet-a", "nonce-1", 600).await.unwrap();
        store.put_nonce("wallet-a", "nonce-2", 600).await.unwrap();

        let got = store.get_nonce("wallet-a").await.unwrap().unwrap();
        assert_eq!(got.nonce, "nonce-2");

        // The replaced value no longer consumes anything
        assert!(!store.delete_nonce_if_matches("wallet-a", "nonce-1").await.unwrap());
        assert!(store.delete_nonce_if_matches("wallet-a", "nonce-2").await.unwrap());
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.put_nonce("wallet-a", "nonce-1", 600).await.unwrap();
        assert!(store.delete_nonce_if_matches("wallet-a", "nonce-1").await.unwrap());
        assert!(!store.delete_nonce_if_matches("wallet-a", "nonce-1").await.unwrap());
        assert!(store.get_nonce("wallet-a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_listing_and_conditional_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.put_nonce("stale", "n", -10).await.unwrap();
        store.put_nonce("fresh", "n", 600).await.unwrap();

        let now = crate::global::now_ms();
        let expired = store.list_expired_nonce_wallets(now, 100).await.unwrap();
        assert_eq!(expired, vec!["stale".to_string()]);

        assert!(store.delete_nonce_if_expired("stale", now).await.unwrap());
        // Fresh row is not expired, conditional delete leaves it alone
        assert!(!store.delete_nonce_if_expired("fresh", now).await.unwrap());
        assert!(store.get_nonce("fresh").await.unwrap().is_some());
    }
}
