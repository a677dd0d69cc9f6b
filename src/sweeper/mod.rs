/// Expiry sweeper
///
/// Periodic garbage collection for rows that carry their own expiry:
/// stale auth nonces and lapsed subscriptions. Each pass pages through
/// the expired rows and deletes them one by one with an expiry recheck,
/// so a row refreshed between listing and deletion survives. The live
/// paths never depend on the sweeper; it only reclaims storage.
use crate::config;
use crate::global;
use crate::logger::{self, LogTag};
use crate::store::GatewayStore;
use crate::webserver::state::get_global_app_state;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

static TOTAL_NONCES_REMOVED: AtomicU64 = AtomicU64::new(0);
static TOTAL_SUBSCRIPTIONS_REMOVED: AtomicU64 = AtomicU64::new(0);

/// Rows removed, either by one cycle or since process start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepTotals {
    pub nonces_removed: u64,
    pub subscriptions_removed: u64,
}

/// Removal counters since process start
pub fn sweep_totals() -> SweepTotals {
    SweepTotals {
        nonces_removed: TOTAL_NONCES_REMOVED.load(Ordering::Relaxed),
        subscriptions_removed: TOTAL_SUBSCRIPTIONS_REMOVED.load(Ordering::Relaxed),
    }
}

/// Run sweep passes until shutdown is signalled
pub async fn run_sweeper_loop(store: Arc<GatewayStore>, shutdown: Arc<Notify>) {
    logger::info(LogTag::Sweeper, "Expiry sweeper started");

    loop {
        let (interval_secs, batch_size) =
            config::with_config(|cfg| (cfg.sweeper.interval_secs, cfg.sweeper.batch_size));

        tokio::select! {
            _ = shutdown.notified() => {
                logger::info(LogTag::Sweeper, "Expiry sweeper stopping");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(interval_secs)) => {}
        }

        match run_sweep_cycle(&store, batch_size).await {
            Ok(report) if report.nonces_removed + report.subscriptions_removed > 0 => {
                logger::info(
                    LogTag::Sweeper,
                    &format!(
                        "Sweep removed {} nonces, {} subscriptions",
                        report.nonces_removed, report.subscriptions_removed
                    ),
                );
            }
            Ok(_) => logger::debug(LogTag::Sweeper, "Sweep found nothing to remove"),
            Err(e) => logger::warning(LogTag::Sweeper, &format!("Sweep cycle failed: {}", e)),
        }

        // Room map entries for dormant actors are reclaimed on the same
        // cadence
        if let Some(state) = get_global_app_state() {
            if let Some(rooms) = &state.rooms {
                let pruned = rooms.prune_closed().await;
                if pruned > 0 {
                    logger::debug(
                        LogTag::Sweeper,
                        &format!("Pruned {} dormant room entries", pruned),
                    );
                }
            }
        }
    }
}

/// One full pass over both expiring tables
pub async fn run_sweep_cycle(
    store: &GatewayStore,
    batch_size: usize,
) -> Result<SweepTotals, crate::core::StoreError> {
    let now = global::now_ms();
    let batch_size = batch_size.max(1);

    let nonces_removed = sweep_nonces(store, now, batch_size).await?;
    let subscriptions_removed = sweep_subscriptions(store, now, batch_size).await?;

    TOTAL_NONCES_REMOVED.fetch_add(nonces_removed, Ordering::Relaxed);
    TOTAL_SUBSCRIPTIONS_REMOVED.fetch_add(subscriptions_removed, Ordering::Relaxed);

    Ok(SweepTotals { nonces_removed, subscriptions_removed })
}

async fn sweep_nonces(
    store: &GatewayStore,
    now: i64,
    batch_size: usize,
) -> Result<u64, crate::core::StoreError> {
    let mut removed = 0u64;

    loop {
        let wallets = store.list_expired_nonce_wallets(now, batch_size).await?;
        let short_page = wallets.len() < batch_size;

        let mut removed_in_page = 0u64;
        for wallet in &wallets {
            match store.delete_nonce_if_expired(wallet, now).await {
                Ok(true) => removed_in_page += 1,
                // Reissued since listing; leave it alone
                Ok(false) => {}
                Err(e) => logger::warning(
                    LogTag::Sweeper,
                    &format!("Failed to sweep nonce for wallet {}: {}", wallet, e),
                ),
            }
        }
        removed += removed_in_page;

        if short_page {
            break;
        }
        if removed_in_page == 0 {
            logger::warning(LogTag::Sweeper, "Nonce sweep made no progress, stopping pass");
            break;
        }
    }

    Ok(removed)
}

async fn sweep_subscriptions(
    store: &GatewayStore,
    now: i64,
    batch_size: usize,
) -> Result<u64, crate::core::StoreError> {
    let mut removed = 0u64;

    loop {
        let keys = store.list_expired_subscription_keys(now, batch_size).await?;
        let short_page = keys.len() < batch_size;

        let mut removed_in_page = 0u64;
        for (conn_id, kind, topic_key) in &keys {
            match store.delete_subscription_if_expired(conn_id, kind, topic_key, now).await {
                Ok(true) => removed_in_page += 1,
                // Refreshed since listing; leave it alone
                Ok(false) => {}
                Err(e) => logger::warning(
                    LogTag::Sweeper,
                    &format!(
                        "Failed to sweep subscription {}:{} for {}: {}",
                        kind, topic_key, conn_id, e
                    ),
                ),
            }
        }
        removed += removed_in_page;

        if short_page {
            break;
        }
        if removed_in_page == 0 {
            logger::warning(
                LogTag::Sweeper,
                "Subscription sweep made no progress, stopping pass",
            );
            break;
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TopicKind;

    async fn open_test_store(dir: &tempfile::TempDir) -> GatewayStore {
        GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap()
    }

    #[tokio::test]
    async fn test_sweep_removes_expired_rows_and_spares_fresh_ones() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.put_nonce("stale1", "n1", -1).await.unwrap();
        store.put_nonce("stale2", "n2", -1).await.unwrap();
        store.put_nonce("fresh", "n3", 600).await.unwrap();

        store.upsert_subscription("c1", TopicKind::Price, "TOK", -1).await.unwrap();
        store.upsert_subscription("c2", TopicKind::Balance, "WALLET1", -1).await.unwrap();
        store.upsert_subscription("c3", TopicKind::Price, "TOK", 3600).await.unwrap();

        let report = run_sweep_cycle(&store, 500).await.unwrap();
        assert_eq!(report.nonces_removed, 2);
        assert_eq!(report.subscriptions_removed, 2);

        assert!(store.get_nonce("stale1").await.unwrap().is_none());
        assert!(store.get_nonce("stale2").await.unwrap().is_none());
        assert!(store.get_nonce("fresh").await.unwrap().is_some());

        let remaining = store.resolve_subscribers(TopicKind::Price, "TOK").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].connection_id, "c3");

        // A second pass has nothing left to do
        let report = run_sweep_cycle(&store, 500).await.unwrap();
        assert_eq!(report, SweepTotals::default());
    }

    #[tokio::test]
    async fn test_sweep_pages_through_batches() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        for i in 0..5 {
            store.put_nonce(&format!("wallet{}", i), "n", -1).await.unwrap();
        }

        let report = run_sweep_cycle(&store, 2).await.unwrap();
        assert_eq!(report.nonces_removed, 5);
        assert!(store.list_expired_nonce_wallets(global::now_ms(), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_totals_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_test_store(&dir).await;

        store.put_nonce("w1", "n", -1).await.unwrap();

        let before = sweep_totals();
        run_sweep_cycle(&store, 500).await.unwrap();
        let after = sweep_totals();

        assert!(after.nonces_removed >= before.nonces_removed + 1);
    }
}
