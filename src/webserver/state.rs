/// Shared application state for the webserver
///
/// Holds the connection hub, the active fan-out engine and (when the
/// rooms engine is selected) the room manager, so route handlers and the
/// connection loop reach them through one handle.
use crate::fanout::{Broadcaster, RoomManager};
use crate::store::GatewayStore;
use crate::webserver::ws::hub::WsHub;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// Persistent gateway store
    pub store: Arc<GatewayStore>,

    /// Central registry of live sockets
    pub hub: Arc<WsHub>,

    /// Active fan-out engine
    pub broadcaster: Arc<dyn Broadcaster>,

    /// Room manager, present only when the rooms engine is active
    pub rooms: Option<Arc<RoomManager>>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        store: Arc<GatewayStore>,
        hub: Arc<WsHub>,
        broadcaster: Arc<dyn Broadcaster>,
        rooms: Option<Arc<RoomManager>>,
    ) -> Self {
        Self {
            store,
            hub,
            broadcaster,
            rooms,
            startup_time: chrono::Utc::now(),
        }
    }

    /// Server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}

// Global state accessor (set once during startup, read by the sweeper)
static GLOBAL_APP_STATE: once_cell::sync::OnceCell<Arc<AppState>> =
    once_cell::sync::OnceCell::new();

pub fn set_global_app_state(state: Arc<AppState>) {
    GLOBAL_APP_STATE.set(state).ok();
}

pub fn get_global_app_state() -> Option<Arc<AppState>> {
    GLOBAL_APP_STATE.get().cloned()
}
