use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ConnectionId;

/// Operational snapshot served by `GET /status` and logged on every tick
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub active_connection_count: usize,
    pub events_since_last_snapshot: u64,
    pub rooms: Vec<RoomStatus>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomStatus {
    pub name: String,
    pub token: String,
    pub members: Vec<MemberStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatus {
    pub connection_id: ConnectionId,
    pub display_name: String,
}
