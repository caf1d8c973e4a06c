use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

/// Health response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub hub: String,
    pub connections: usize,
    pub timestamp: String,
}

/// Health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let hub_status = match state.hub.status().await {
        Ok(_) => "running",
        Err(_) => "stopped",
    };

    let overall_status = if hub_status == "running" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: overall_status.to_string(),
        hub: hub_status.to_string(),
        connections: state.connections.connection_count(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
