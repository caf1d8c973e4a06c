use serde::{Deserialize, Serialize};

use crate::error::JoinError;
use crate::models::JoinRequest;

// ==================== Client -> Server Messages ====================

/// Frames a client may send over the socket
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join a room when the handshake did not carry join parameters
    Join(JoinRequest),
    /// Whole-document replacement
    Update { payload: String },
    /// Voluntary departure; the connection is closed afterwards
    Leave,
}

// ==================== Server -> Client Messages ====================

/// Frames the server pushes to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Notification {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        display_name: String,
        payload: String,
    },
}

impl ServerMessage {
    pub fn notification(message: impl Into<String>, code: &str) -> Self {
        ServerMessage::Notification {
            message: message.into(),
            code: Some(code.to_string()),
        }
    }

    pub fn member_joined(display_name: &str) -> Self {
        Self::notification(
            format!("{} joined the room.", display_name),
            notification_codes::MEMBER_JOINED,
        )
    }

    pub fn member_left(display_name: &str, room: &str) -> Self {
        Self::notification(
            format!("{} left the room {}.", display_name, room),
            notification_codes::MEMBER_LEFT,
        )
    }

    pub fn rejected(err: &JoinError) -> Self {
        Self::notification(err.to_string(), err.code())
    }

    pub fn already_joined() -> Self {
        Self::notification(
            "This connection has already joined a room.",
            notification_codes::ALREADY_JOINED,
        )
    }

    pub fn update(display_name: &str, payload: String) -> Self {
        ServerMessage::Update {
            display_name: display_name.to_string(),
            payload,
        }
    }
}

/// Codes attached to notifications
pub mod notification_codes {
    pub const MEMBER_JOINED: &str = "member_joined";
    pub const MEMBER_LEFT: &str = "member_left";
    pub const ALREADY_JOINED: &str = "already_joined";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_client_frames() {
        let join: ClientMessage = serde_json::from_str(
            r#"{"type":"join","displayName":"ada","room":"demo","token":"t1"}"#,
        )
        .unwrap();
        assert_eq!(join, ClientMessage::Join(JoinRequest::new("ada", "demo", "t1")));

        let partial: ClientMessage =
            serde_json::from_str(r#"{"type":"join","room":"demo"}"#).unwrap();
        assert_eq!(
            partial,
            ClientMessage::Join(JoinRequest {
                room: Some("demo".to_string()),
                ..JoinRequest::default()
            })
        );

        let update: ClientMessage =
            serde_json::from_str(r#"{"type":"update","payload":"hello"}"#).unwrap();
        assert_eq!(
            update,
            ClientMessage::Update {
                payload: "hello".to_string()
            }
        );

        let leave: ClientMessage = serde_json::from_str(r#"{"type":"leave"}"#).unwrap();
        assert_eq!(leave, ClientMessage::Leave);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn serializes_server_frames() {
        let relayed = serde_json::to_value(ServerMessage::update("ada", "hello".into())).unwrap();
        assert_eq!(
            relayed,
            json!({"type": "update", "displayName": "ada", "payload": "hello"})
        );

        let rejected = serde_json::to_value(ServerMessage::rejected(&JoinError::InvalidToken))
            .unwrap();
        assert_eq!(
            rejected,
            json!({
                "type": "notification",
                "message": "Invalid token for this room.",
                "code": "invalid_token"
            })
        );
    }
}
