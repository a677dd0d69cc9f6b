/// Nonce issuance endpoint
///
/// First half of the connect handshake: the client asks for a nonce
/// here, signs it, then presents wallet + nonce + signature on the /ws
/// upgrade.
use axum::{extract::State, http::StatusCode, response::Response, routing::post, Json, Router};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    auth,
    config,
    core::GatewayError,
    logger::{self, LogTag},
    webserver::{
        state::AppState,
        utils::{error_response, success_response},
    },
};

#[derive(Debug, Deserialize)]
pub struct NonceRequest {
    pub wallet: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/nonce", post(issue_nonce_handler))
}

/// POST /api/auth/nonce
async fn issue_nonce_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NonceRequest>,
) -> Response {
    let (ttl_secs, nonce_length) =
        config::with_config(|cfg| (cfg.auth.nonce_ttl_secs, cfg.auth.nonce_length));

    match auth::issue_nonce(&state.store, &req.wallet, ttl_secs as i64, nonce_length).await {
        Ok(grant) => success_response(grant),
        Err(GatewayError::Auth(e)) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string(), Some(e.code()))
        }
        Err(GatewayError::Store(e)) => {
            logger::warning(LogTag::Auth, &format!("Nonce issuance failed: {}", e));
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Store unavailable",
                Some("store_unavailable"),
            )
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), None),
    }
}
