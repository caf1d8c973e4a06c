use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Display name used when anonymous joins are allowed and none was supplied
pub const ANONYMOUS_DISPLAY_NAME: &str = "Anonymous";

/// Opaque identifier of one live transport connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ConnectionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One joined participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub room: String,
}

/// Join parameters as supplied by a client, either through the handshake
/// query string or a `join` message
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl JoinRequest {
    pub fn new(
        display_name: impl Into<String>,
        room: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            display_name: Some(display_name.into()),
            room: Some(room.into()),
            token: Some(token.into()),
        }
    }

    /// True when at least one join parameter was supplied.
    pub fn is_attempted(&self) -> bool {
        self.display_name.is_some() || self.room.is_some() || self.token.is_some()
    }
}
