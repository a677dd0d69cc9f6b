use crate::logger::{self, LogTag};
use crate::services::Service;
use crate::store;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Opens the gateway database and installs the global store handle.
///
/// Every other service declares a dependency on this one so the
/// connection pools exist before any query runs.
pub struct StoreService;

#[async_trait]
impl Service for StoreService {
    fn name(&self) -> &'static str {
        "store"
    }

    fn priority(&self) -> i32 {
        5
    }

    async fn initialize(&mut self) -> Result<(), String> {
        store::init_store()
            .await
            .map_err(|e| format!("Failed to initialize gateway store: {}", e))?;

        let store = store::get_store().map_err(|e| e.to_string())?;
        logger::debug(
            LogTag::Store,
            &format!("Gateway store ready at {}", store.database_path()),
        );
        Ok(())
    }

    async fn start(&mut self, _shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        // No background tasks; the store is pooled connections only.
        Ok(vec![])
    }
}
