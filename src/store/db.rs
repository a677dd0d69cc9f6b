/// Gateway persistence layer
///
/// SQLite database holding auth nonces, topic subscriptions, and the
/// fan-out outbox. Fresh schema (no migrations), split read/write pools.
use crate::core::StoreError;
use crate::logger::{self, LogTag};
use crate::paths;
use once_cell::sync::OnceCell;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Connection pool configuration
const WRITE_POOL_MAX_SIZE: u32 = 2;
const READ_POOL_MAX_SIZE: u32 = 10;
const POOL_MIN_IDLE: u32 = 1;
const CONNECTION_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// DATABASE STRUCTURE
// =============================================================================

/// Gateway database with split connection pools
pub struct GatewayStore {
    write_pool: Pool<SqliteConnectionManager>,
    read_pool: Pool<SqliteConnectionManager>,
    database_path: String,
}

impl GatewayStore {
    /// Open (or create) the database at the given path
    pub async fn open(database_path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = database_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Pool(format!("Failed to create data directory: {}", e))
                })?;
            }
        }

        let database_path_str = database_path.to_string_lossy().to_string();

        // Same file for both pools
        let write_manager = SqliteConnectionManager::file(database_path);
        let read_manager = SqliteConnectionManager::file(database_path);

        let write_pool = Pool::builder()
            .max_size(WRITE_POOL_MAX_SIZE)
            .min_idle(Some(POOL_MIN_IDLE))
            .connection_timeout(std::time::Duration::from_millis(CONNECTION_TIMEOUT_MS))
            .build(write_manager)
            .map_err(|e| StoreError::Pool(format!("Failed to create write pool: {}", e)))?;

        let read_pool = Pool::builder()
            .max_size(READ_POOL_MAX_SIZE)
            .min_idle(Some(POOL_MIN_IDLE))
            .connection_timeout(std::time::Duration::from_millis(CONNECTION_TIMEOUT_MS))
            .build(read_manager)
            .map_err(|e| StoreError::Pool(format!("Failed to create read pool: {}", e)))?;

        let store = GatewayStore {
            write_pool,
            read_pool,
            database_path: database_path_str.clone(),
        };

        store.initialize_schema()?;

        logger::info(
            LogTag::Store,
            &format!("Gateway database initialized at {}", database_path_str),
        );

        Ok(store)
    }

    /// Create all tables and indexes
    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.get_write_connection()?;

        // Single-use login nonces, one per wallet
        conn.execute(
            "CREATE TABLE IF NOT EXISTS auth_nonces (
                wallet          TEXT    PRIMARY KEY,
                nonce           TEXT    NOT NULL,
                created_at      INTEGER NOT NULL,
                expires_at      INTEGER NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nonces_expires_at
             ON auth_nonces(expires_at)",
            [],
        )?;

        // Topic subscriptions, keyed by connection + topic
        conn.execute(
            "CREATE TABLE IF NOT EXISTS subscriptions (
                connection_id   TEXT    NOT NULL,
                kind            TEXT    NOT NULL,
                topic_key       TEXT    NOT NULL,
                created_at      INTEGER NOT NULL,
                expires_at      INTEGER NOT NULL,
                PRIMARY KEY (connection_id, kind, topic_key)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_topic
             ON subscriptions(kind, topic_key)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_subscriptions_expires_at
             ON subscriptions(expires_at)",
            [],
        )?;

        // Durable fan-out queue with visibility-timeout redelivery
        conn.execute(
            "CREATE TABLE IF NOT EXISTS outbox (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                kind            TEXT    NOT NULL,
                topic_key       TEXT    NOT NULL,
                payload         TEXT    NOT NULL,
                enqueued_at     INTEGER NOT NULL,
                visible_at      INTEGER NOT NULL,
                receive_count   INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_outbox_visible_at
             ON outbox(visible_at, id)",
            [],
        )?;

        Ok(())
    }

    /// Get write connection from pool
    pub(crate) fn get_write_connection(
        &self,
    ) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        let conn = self
            .write_pool
            .get()
            .map_err(|e| StoreError::Pool(format!("Failed to get write connection: {}", e)))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", 10000)?;
        conn.pragma_update(None, "temp_store", "memory")?;
        conn.busy_timeout(std::time::Duration::from_millis(CONNECTION_TIMEOUT_MS))?;
        Ok(conn)
    }

    /// Get read connection from pool
    pub(crate) fn get_read_connection(
        &self,
    ) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        let conn = self
            .read_pool
            .get()
            .map_err(|e| StoreError::Pool(format!("Failed to get read connection: {}", e)))?;
        conn.pragma_update(None, "query_only", "1")?;
        conn.pragma_update(None, "cache_size", 20000)?;
        // 256MB mmap if supported
        let _ = conn.pragma_update(None, "mmap_size", 268435456i64);
        conn.busy_timeout(std::time::Duration::from_millis(CONNECTION_TIMEOUT_MS))?;
        Ok(conn)
    }

    pub fn database_path(&self) -> &str {
        &self.database_path
    }
}

// =============================================================================
// GLOBAL ACCESS
// =============================================================================

static GATEWAY_STORE: OnceCell<Arc<GatewayStore>> = OnceCell::new();

/// Open the database at the standard path and install it globally
///
/// Idempotent: a second call is a no-op so service restarts are safe.
pub async fn init_store() -> Result<(), StoreError> {
    if GATEWAY_STORE.get().is_some() {
        return Ok(());
    }

    let path = paths::get_gateway_db_path();
    let store = GatewayStore::open(&path).await?;
    let _ = GATEWAY_STORE.set(Arc::new(store));
    Ok(())
}

/// Handle to the global store
pub fn get_store() -> Result<Arc<GatewayStore>, StoreError> {
    GATEWAY_STORE.get().cloned().ok_or(StoreError::NotInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("gateway.db");
        let store = GatewayStore::open(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(store.database_path(), path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_schema_is_idempotent_across_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.db");

        {
            let store = GatewayStore::open(&path).await.unwrap();
            let conn = store.get_write_connection().unwrap();
            conn.execute(
                "INSERT INTO auth_nonces (wallet, nonce, created_at, expires_at)
                 VALUES ('w', 'n', 1, 2)",
                [],
            )
            .unwrap();
        }

        // Reopen over the same file: tables survive, creation does not clobber
        let store = GatewayStore::open(&path).await.unwrap();
        let conn = store.get_read_connection().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM auth_nonces", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_read_connection_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap();
        let conn = store.get_read_connection().unwrap();
        let result = conn.execute(
            "INSERT INTO auth_nonces (wallet, nonce, created_at, expires_at)
             VALUES ('w', 'n', 1, 2)",
            [],
        );
        assert!(result.is_err());
    }
}
