//! Join/leave state machine.
//!
//! Per connection: `Unjoined -> Joined -> Left`. A rejected join never
//! reaches `Joined`: the connection gets a notification and is closed.

use crate::config::Config;
use crate::error::JoinError;
use crate::models::{ConnectionId, JoinRequest, Session, ANONYMOUS_DISPLAY_NAME};
use crate::room::{RoomTokenStore, SessionRegistry, TokenBinding};
use crate::transport::GroupTransport;
use crate::ws::ServerMessage;

/// Join parameters after validation
#[derive(Debug, Clone, PartialEq, Eq)]
struct ValidJoin {
    display_name: String,
    room: String,
    token: String,
}

#[derive(Debug, Clone, Default)]
pub struct MembershipManager {
    allow_anonymous: bool,
    evict_empty_rooms: bool,
}

impl MembershipManager {
    pub fn new(allow_anonymous: bool, evict_empty_rooms: bool) -> Self {
        Self {
            allow_anonymous,
            evict_empty_rooms,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.allow_anonymous, config.evict_empty_rooms)
    }

    /// Validate, authorize and register a joining connection, then announce
    /// it to the whole room including the newcomer.
    pub fn on_join<T: GroupTransport>(
        &self,
        registry: &mut SessionRegistry,
        tokens: &mut RoomTokenStore,
        transport: &T,
        conn_id: ConnectionId,
        request: JoinRequest,
    ) -> Result<(), JoinError> {
        if registry.contains(conn_id) {
            tracing::error!(conn_id = %conn_id, "Join for a connection that is already registered");
            return Err(JoinError::DuplicateConnection(conn_id));
        }

        let join = match self.validate(request) {
            Ok(join) => join,
            Err(err) => {
                reject(transport, conn_id, &err);
                return Err(err);
            }
        };

        match tokens.resolve_or_bind(&join.room, &join.token) {
            Ok(TokenBinding::Created) => {
                tracing::info!(room = %join.room, conn_id = %conn_id, "Room created");
            }
            Ok(TokenBinding::Matched) => {}
            Err(err) => {
                tracing::warn!(room = %join.room, conn_id = %conn_id, "Wrong token for room");
                reject(transport, conn_id, &err);
                return Err(err);
            }
        }

        if let Err(err) = registry.register(conn_id, join.display_name.clone(), join.room.clone()) {
            tracing::error!(conn_id = %conn_id, error = %err, "Session registry invariant violated");
            return Err(JoinError::DuplicateConnection(conn_id));
        }

        transport.join_group(conn_id, &join.room);
        transport.send_to_group(&join.room, ServerMessage::member_joined(&join.display_name), None);

        tracing::info!(
            conn_id = %conn_id,
            room = %join.room,
            display_name = %join.display_name,
            "Member joined"
        );

        Ok(())
    }

    /// Tear down a session and tell the remaining members. Unknown
    /// connections are a no-op, so repeated calls are harmless.
    pub fn on_leave<T: GroupTransport>(
        &self,
        registry: &mut SessionRegistry,
        tokens: &mut RoomTokenStore,
        transport: &T,
        conn_id: ConnectionId,
    ) -> Option<Session> {
        let session = match registry.unregister(conn_id) {
            Ok(session) => session,
            Err(_) => {
                tracing::debug!(conn_id = %conn_id, "Leave for unknown connection ignored");
                return None;
            }
        };

        transport.leave_group(conn_id, &session.room);
        transport.send_to_group(
            &session.room,
            ServerMessage::member_left(&session.display_name, &session.room),
            None,
        );

        tracing::info!(
            conn_id = %conn_id,
            room = %session.room,
            display_name = %session.display_name,
            "Member left"
        );

        if self.evict_empty_rooms && registry.members_of(&session.room).is_empty() {
            tokens.release(&session.room);
            tracing::info!(room = %session.room, "Empty room evicted");
        }

        Some(session)
    }

    fn validate(&self, request: JoinRequest) -> Result<ValidJoin, JoinError> {
        let display_name = match non_empty(request.display_name) {
            Some(name) => name,
            None if self.allow_anonymous => ANONYMOUS_DISPLAY_NAME.to_string(),
            None => return Err(JoinError::IncompleteJoinInfo),
        };
        let room = non_empty(request.room).ok_or(JoinError::IncompleteJoinInfo)?;
        let token = non_empty(request.token).ok_or(JoinError::IncompleteJoinInfo)?;

        Ok(ValidJoin {
            display_name,
            room,
            token,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn reject<T: GroupTransport>(transport: &T, conn_id: ConnectionId, err: &JoinError) {
    transport.send_to(conn_id, ServerMessage::rejected(err));
    transport.close(conn_id, err.code());
}
