/// Internal publish endpoint
///
/// Entry point for upstream producers (price pollers, balance watchers).
/// The request is handed to the configured engine; 202 means accepted
/// for delivery, not delivered.
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::{
    core::{BroadcastMessage, GatewayError, TopicKind},
    logger::{self, LogTag},
    webserver::{state::AppState, utils::error_response},
};

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub kind: TopicKind,
    pub topic_key: String,
    pub payload: serde_json::Value,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/publish", post(publish_handler))
}

/// POST /api/publish
async fn publish_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishRequest>,
) -> Response {
    let message = BroadcastMessage::new(req.kind, &req.topic_key, req.payload);

    match state.broadcaster.publish(message).await {
        Ok(()) => (StatusCode::ACCEPTED, Json(json!({ "accepted": true }))).into_response(),
        Err(GatewayError::Store(e)) => {
            logger::warning(LogTag::Fanout, &format!("Publish rejected: {}", e));
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Store unavailable",
                Some("store_unavailable"),
            )
        }
        Err(e) => {
            logger::warning(LogTag::Fanout, &format!("Publish failed: {}", e));
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), None)
        }
    }
}
