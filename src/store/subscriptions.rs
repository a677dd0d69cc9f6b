/// Subscription registry storage
///
/// Rows are keyed by (connection_id, kind, topic_key). Upserts refresh the
/// TTL without touching created_at. Reads never filter on expiry; stale
/// rows are skipped at delivery time and reaped by the sweeper.
use super::db::GatewayStore;
use crate::core::{StoreError, TopicKind};
use crate::global;
use rusqlite::params;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRow {
    pub connection_id: String,
    pub kind: TopicKind,
    pub topic_key: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl SubscriptionRow {
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

impl GatewayStore {
    /// Register or refresh a subscription
    ///
    /// Repeat subscribes bump expires_at and keep the original created_at.
    pub async fn upsert_subscription(
        &self,
        connection_id: &str,
        kind: TopicKind,
        topic_key: &str,
        ttl_secs: i64,
    ) -> Result<SubscriptionRow, StoreError> {
        let conn = self.get_write_connection()?;
        let now = global::now_ms();
        let expires_at = now + ttl_secs * 1000;

        conn.execute(
            "INSERT INTO subscriptions (connection_id, kind, topic_key, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(connection_id, kind, topic_key) DO UPDATE SET
                expires_at = excluded.expires_at",
            params![connection_id, kind.as_str(), topic_key, now, expires_at],
        )?;

        let created_at: i64 = conn.query_row(
            "SELECT created_at FROM subscriptions
             WHERE connection_id = ?1 AND kind = ?2 AND topic_key = ?3",
            params![connection_id, kind.as_str(), topic_key],
            |row| row.get(0),
        )?;

        Ok(SubscriptionRow {
            connection_id: connection_id.to_string(),
            kind,
            topic_key: topic_key.to_string(),
            created_at,
            expires_at,
        })
    }

    /// Drop one subscription; absent rows are not an error
    pub async fn remove_subscription(
        &self,
        connection_id: &str,
        kind: TopicKind,
        topic_key: &str,
    ) -> Result<(), StoreError> {
        let conn = self.get_write_connection()?;
        conn.execute(
            "DELETE FROM subscriptions
             WHERE connection_id = ?1 AND kind = ?2 AND topic_key = ?3",
            params![connection_id, kind.as_str(), topic_key],
        )?;
        Ok(())
    }

    /// Drop everything a connection subscribed to (disconnect cleanup)
    pub async fn remove_all_for_connection(
        &self,
        connection_id: &str,
    ) -> Result<usize, StoreError> {
        let conn = self.get_write_connection()?;
        let removed = conn.execute(
            "DELETE FROM subscriptions WHERE connection_id = ?1",
            params![connection_id],
        )?;
        Ok(removed)
    }

    /// All rows registered for a topic, including expired ones
    pub async fn resolve_subscribers(
        &self,
        kind: TopicKind,
        topic_key: &str,
    ) -> Result<Vec<SubscriptionRow>, StoreError> {
        let conn = self.get_read_connection()?;
        let mut stmt = conn.prepare(
            "SELECT connection_id, kind, topic_key, created_at, expires_at
             FROM subscriptions WHERE kind = ?1 AND topic_key = ?2",
        )?;

        let rows = stmt.query_map(params![kind.as_str(), topic_key], |row| {
            let kind_str: String = row.get(1)?;
            Ok(SubscriptionRow {
                connection_id: row.get(0)?,
                kind: TopicKind::from_str(&kind_str).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(
                        1,
                        "kind".to_string(),
                        rusqlite::types::Type::Text,
                    )
                })?,
                topic_key: row.get(2)?,
                created_at: row.get(3)?,
                expires_at: row.get(4)?,
            })
        })?;

        let mut subscribers = Vec::new();
        for row in rows {
            subscribers.push(row?);
        }
        Ok(subscribers)
    }

    /// Live subscription count for status reporting
    pub async fn count_active_subscriptions(&self, now: i64) -> Result<i64, StoreError> {
        let conn = self.get_read_connection()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM subscriptions WHERE expires_at > ?1",
            params![now],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Primary keys of expired subscriptions, one sweep page
    pub async fn list_expired_subscription_keys(
        &self,
        now: i64,
        limit: usize,
    ) -> Result<Vec<(String, String, String)>, StoreError> {
        let conn = self.get_read_connection()?;
        let mut stmt = conn.prepare(
            "SELECT connection_id, kind, topic_key FROM subscriptions
             WHERE expires_at <= ?1 ORDER BY expires_at LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![now, limit as i64], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        Ok(keys)
    }

    /// Delete a subscription row only while it is still expired
    pub async fn delete_subscription_if_expired(
        &self,
        connection_id: &str,
        kind: &str,
        topic_key: &str,
        now: i64,
    ) -> Result<bool, StoreError> {
        let conn = self.get_write_connection()?;
        let deleted = conn.execute(
            "DELETE FROM subscriptions
             WHERE connection_id = ?1 AND kind = ?2 AND topic_key = ?3 AND expires_at <= ?4",
            params![connection_id, kind, topic_key, now],
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
    async fn test_upsert_refresh_keeps_created_at() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        let first = store
            .upsert_subscription("conn-1", TopicKind::Price, "MintA", 60)
            .await
            .unwrap();
        let second = store
            .upsert_subscription("conn-1", TopicKind::Price, "MintA", 3600)
            .await
            .unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert!(second.expires_at > first.expires_at);

        // Still a single row
        let rows = store.resolve_subscribers(TopicKind::Price, "MintA").await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_matches_exact_topic_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.upsert_subscription("conn-1", TopicKind::Price, "MintA", 3600).await.unwrap();
        store.upsert_subscription("conn-2", TopicKind::Price, "MintA", 3600).await.unwrap();
        store.upsert_subscription("conn-3", TopicKind::Price, "MintB", 3600).await.unwrap();
        store.upsert_subscription("conn-4", TopicKind::Balance, "MintA", 3600).await.unwrap();

        let rows = store.resolve_subscribers(TopicKind::Price, "MintA").await.unwrap();
        let mut ids: Vec<&str> = rows.iter().map(|r| r.connection_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["conn-1", "conn-2"]);
    }

    #[tokio::test]
    async fn test_resolve_returns_expired_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.upsert_subscription("conn-1", TopicKind::Balance, "WalletA", -5).await.unwrap();

        let rows = store.resolve_subscribers(TopicKind::Balance, "WalletA").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_expired(global::now_ms()));
    }

    #[tokio::test]
    async fn test_remove_is_tolerant_of_absent_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.remove_subscription("ghost", TopicKind::Price, "MintA").await.unwrap();
        assert_eq!(store.remove_all_for_connection("ghost").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_remove_all_clears_only_that_connection() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.upsert_subscription("conn-1", TopicKind::Price, "MintA", 3600).await.unwrap();
        store.upsert_subscription("conn-1", TopicKind::Balance, "WalletA", 3600).await.unwrap();
        store.upsert_subscription("conn-2", TopicKind::Price, "MintA", 3600).await.unwrap();

        assert_eq!(store.remove_all_for_connection("conn-1").await.unwrap(), 2);

        let rows = store.resolve_subscribers(TopicKind::Price, "MintA").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].connection_id, "conn-2");
    }

    #[tokio::test]
    async fn test_expired_sweep_page_and_conditional_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.upsert_subscription("conn-1", TopicKind::Price, "MintA", -5).await.unwrap();
        store.upsert_subscription("conn-2", TopicKind::Price, "MintB", 3600).await.unwrap();

        let now = global::now_ms();
        let keys = store.list_expired_subscription_keys(now, 100).await.unwrap();
        assert_eq!(keys, vec![(
            "conn-1".to_string(),
            "price".to_string(),
            "MintA".to_string(),
        )]);

        let (conn_id, kind, topic_key) = &keys[0];
        assert!(store
            .delete_subscription_if_expired(conn_id, kind, topic_key, now)
            .await
            .unwrap());
        // Fresh row stays
        assert!(!store
            .delete_subscription_if_expired("conn-2", "price", "MintB", now)
            .await
            .unwrap());

        assert_eq!(store.count_active_subscriptions(now).await.unwrap(), 1);
    }
}
