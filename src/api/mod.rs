pub mod health;
pub mod status;

use axum::Router;

use crate::state::AppState;
use crate::ws::ws_routes;

/// HTTP routes plus the WebSocket endpoint
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(create_router(state.clone()))
        .merge(ws_routes().with_state(state))
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(status::status_routes())
        .merge(health::health_routes())
        .with_state(state)
}
