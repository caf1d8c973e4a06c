use axum::{extract::State, routing::get, Json, Router};

use crate::error::Result;
use crate::models::Status;
use crate::state::AppState;

/// Status routes
pub fn status_routes() -> Router<AppState> {
    Router::new().route("/status", get(get_status))
}

/// GET /status - On-demand snapshot; does not reset the interval event counter
async fn get_status(State(state): State<AppState>) -> Result<Json<Status>> {
    Ok(Json(state.hub.status().await?))
}
