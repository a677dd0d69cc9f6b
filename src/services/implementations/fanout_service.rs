use crate::config;
use crate::fanout::queue::{spawn_workers, WorkerParams};
use crate::logger::{self, LogTag};
use crate::services::Service;
use crate::store;
use crate::webserver::state::get_global_app_state;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Runs the outbox worker pool.
///
/// The workers drain the durable queue regardless of which engine is
/// active: under the rooms engine the queue is the fallback path, so
/// rows can appear in the outbox either way.
pub struct FanoutService;

#[async_trait]
impl Service for FanoutService {
    fn name(&self) -> &'static str {
        "fanout"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn dependencies(&self) -> Vec<&'static str> {
        // The hub lives in the app state assembled by the webserver.
        vec!["store", "webserver"]
    }

    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let store = store::get_store()
            .map_err(|e| format!("Store must be initialized before fan-out: {}", e))?;
        let state =
            get_global_app_state().ok_or("App state missing - webserver did not initialize")?;

        let (worker_count, params) = config::with_config(|cfg| {
            (cfg.fanout.worker_count, WorkerParams::from_config(&cfg.fanout))
        });

        let handles = spawn_workers(worker_count, store, state.hub.clone(), params, shutdown);

        logger::info(
            LogTag::Fanout,
            &format!("Started {} outbox workers", handles.len()),
        );

        Ok(handles)
    }
}
