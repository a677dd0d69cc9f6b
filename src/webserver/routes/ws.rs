/// WebSocket upgrade endpoint
///
/// Admission runs against the handshake query parameters before the
/// upgrade completes, so rejected clients get a plain HTTP status
/// instead of an immediately-closed socket.
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    auth::{self, Admission},
    logger::{self, LogTag},
    webserver::{state::AppState, utils::error_response, ws::connection},
};

#[derive(Debug, Deserialize, Clone)]
pub struct WsAuthQuery {
    pub wallet: String,
    pub nonce: String,
    pub signature: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_upgrade_handler))
}

/// GET /ws?wallet=..&nonce=..&signature=..
async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsAuthQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match auth::authenticate(&state.store, &params.wallet, &params.nonce, &params.signature).await
    {
        Ok(Admission::Admitted) => {
            let wallet = params.wallet.clone();
            ws.on_upgrade(move |socket| connection::handle_connection(socket, state, wallet))
        }
        Ok(Admission::Rejected(reason)) => {
            logger::info(
                LogTag::Auth,
                &format!("Handshake rejected for wallet {}: {}", params.wallet, reason),
            );
            error_response(StatusCode::UNAUTHORIZED, &reason.to_string(), Some(reason.code()))
        }
        Err(e) => {
            logger::warning(
                LogTag::Auth,
                &format!("Handshake aborted for wallet {}: {}", params.wallet, e),
            );
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Store unavailable",
                Some("store_unavailable"),
            )
        }
    }
}
