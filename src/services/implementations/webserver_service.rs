use crate::config;
use crate::fanout;
use crate::logger::{self, LogTag};
use crate::services::Service;
use crate::store;
use crate::webserver::state::{set_global_app_state, AppState};
use crate::webserver::ws::WsHub;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Runs the HTTP/WebSocket server.
///
/// `initialize` assembles the shared wiring (hub, fan-out engine, app
/// state) so later services can reach it through the global state;
/// `start` probes the bind address and then serves in the background.
pub struct WebserverService {
    state: Option<Arc<AppState>>,
}

impl WebserverService {
    pub fn new() -> Self {
        Self { state: None }
    }
}

impl Default for WebserverService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Service for WebserverService {
    fn name(&self) -> &'static str {
        "webserver"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec!["store"]
    }

    async fn initialize(&mut self) -> Result<(), String> {
        let store = store::get_store()
            .map_err(|e| format!("Store must be initialized before the webserver: {}", e))?;

        let (hub, broadcaster, rooms) = config::with_config(|cfg| {
            let hub = WsHub::new(cfg.server.ws_buffer_size);
            let (broadcaster, rooms) = fanout::build_broadcaster(&cfg.fanout, store.clone());
            (hub, broadcaster, rooms)
        });

        logger::info(
            LogTag::Webserver,
            &format!("Fan-out engine: {}", broadcaster.engine_name()),
        );

        let state = Arc::new(AppState::new(store, hub, broadcaster, rooms));
        set_global_app_state(state.clone());
        self.state = Some(state);
        Ok(())
    }

    async fn start(&mut self, _shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
        let state = self
            .state
            .take()
            .ok_or("Webserver state missing - initialize() did not run")?;

        // Probe the bind address first so a taken port fails startup
        // instead of dying silently inside the spawned task.
        let (host, port) = config::with_config(|cfg| (cfg.server.host.clone(), cfg.server.port));
        let probe = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
            .await
            .map_err(|e| format!("Webserver cannot bind {}:{}: {}", host, port, e))?;
        drop(probe);

        let handle = tokio::spawn(async move {
            if let Err(e) = crate::webserver::start_server(state).await {
                logger::error(LogTag::Webserver, &format!("Webserver failed: {}", e));
            }
        });

        // Give the listener a moment before dependents come up.
        tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

        logger::info(
            LogTag::Webserver,
            &format!("Webserver ready at http://{}:{}", host, port),
        );

        Ok(vec![handle])
    }

    async fn stop(&mut self) -> Result<(), String> {
        crate::webserver::shutdown();
        Ok(())
    }
}
