use axum::{extract::State, response::Response, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    global,
    logger::{self, LogTag},
    sweeper::{self, SweepTotals},
    webserver::{state::AppState, utils::success_response},
};

/// Simple health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

/// Live gauge snapshot for dashboards
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub uptime_seconds: u64,
    pub engine: String,
    pub active_connections: usize,
    pub active_subscriptions: i64,
    pub outbox_depth: i64,
    pub active_rooms: usize,
    pub sweep: SweepTotals,
}

/// Create status routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(system_status))
}

/// GET /api/health
async fn health_check() -> Response {
    let response = HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    success_response(response)
}

/// GET /api/status
async fn system_status(State(state): State<Arc<AppState>>) -> Response {
    let now = global::now_ms();

    let outbox_depth = match state.store.outbox_depth().await {
        Ok(depth) => depth,
        Err(e) => {
            logger::warning(LogTag::Webserver, &format!("Status: outbox depth failed: {}", e));
            0
        }
    };
    let active_subscriptions = match state.store.count_active_subscriptions(now).await {
        Ok(count) => count,
        Err(e) => {
            logger::warning(
                LogTag::Webserver,
                &format!("Status: subscription count failed: {}", e),
            );
            0
        }
    };
    let active_rooms = match &state.rooms {
        Some(rooms) => rooms.active_rooms().await,
        None => 0,
    };

    let snapshot = StatusSnapshot {
        uptime_seconds: state.uptime_seconds(),
        engine: state.broadcaster.engine_name().to_string(),
        active_connections: state.hub.active_connections().await,
        active_subscriptions,
        outbox_depth,
        active_rooms,
        sweep: sweeper::sweep_totals(),
    };

    success_response(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::core::TopicKind;
    use crate::fanout::build_broadcaster;
    use crate::store::GatewayStore;
    use crate::webserver::ws::hub::WsHub;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_status_reports_live_gauges() {
        let _ = config::load_config();
        let dir = tempfile::tempdir().unwrap();
        let store =
            Arc::new(GatewayStore::open(&dir.path().join("gateway.db")).await.unwrap());
        let (broadcaster, rooms) =
            build_broadcaster(&config::FanoutConfig::default(), store.clone());
        let state = Arc::new(AppState::new(store.clone(), WsHub::new(16), broadcaster, rooms));

        store.upsert_subscription("c1", TopicKind::Price, "TOK", 3600).await.unwrap();
        let (_conn_id, _rx) = state.hub.register_connection().await;

        let resp = system_status(State(state)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["engine"], "queue");
        assert_eq!(body["active_connections"], 1);
        assert_eq!(body["active_subscriptions"], 1);
        assert_eq!(body["outbox_depth"], 0);
        assert!(body["sweep"]["nonces_removed"].is_u64());
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let resp = health_check().await;
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
    }
}
