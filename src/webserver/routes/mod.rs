use crate::webserver::state::AppState;
use axum::Router;
use std::sync::Arc;

pub mod auth;
pub mod publish;
pub mod status;
pub mod ws;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(ws::routes())
        .nest("/api", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(auth::routes())
        .merge(publish::routes())
        .merge(status::routes())
}
