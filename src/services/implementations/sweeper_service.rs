use crate::config::Config;
use crate::services::Service;
use crate::store;
use crate::sweeper;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Runs the expiry sweeper loop that removes stale nonces and
/// subscriptions on an interval.
pub struct SweeperService;

#[async_trait]
impl Service for SweeperService {
    fn name(&self) -> &'static str {
        "sweeper"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["store"]
    }

    fn is_enabled(&self, config: &Config) -> bool {
        config.sweeper.enabled
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let store = store::get_store()
            .map_err(|e| format!("Store must be initialized before the sweeper: {}", e))?;

        let handle = tokio::spawn(async move {
            sweeper::run_sweeper_loop(store, shutdown).await;
        });

        Ok(vec![handle])
    }
}
