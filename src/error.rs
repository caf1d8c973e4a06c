use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::models::ConnectionId;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Event loop is not running")]
    HubUnavailable,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::HubUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

/// Reasons a join attempt is turned down.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JoinError {
    #[error("Incomplete join information.")]
    IncompleteJoinInfo,

    #[error("Invalid token for this room.")]
    InvalidToken,

    #[error("Connection {0} is already registered.")]
    DuplicateConnection(ConnectionId),
}

impl JoinError {
    /// Stable machine-readable code sent alongside the notification text.
    pub fn code(&self) -> &'static str {
        match self {
            JoinError::IncompleteJoinInfo => "incomplete_join_info",
            JoinError::InvalidToken => "invalid_token",
            JoinError::DuplicateConnection(_) => "duplicate_connection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Connection {0} is already registered")]
    DuplicateConnection(ConnectionId),

    #[error("Connection {0} is not registered")]
    NotFound(ConnectionId),
}

pub type Result<T> = std::result::Result<T, AppError>;
