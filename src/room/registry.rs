use std::collections::{BTreeSet, HashMap};

use crate::error::RegistryError;
use crate::models::{ConnectionId, Session};

/// Connection id -> session. The single owner of [`Session`] values; room
/// membership is always derived from here.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<ConnectionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session. Fails if the connection is already registered.
    pub fn register(
        &mut self,
        conn_id: ConnectionId,
        display_name: impl Into<String>,
        room: impl Into<String>,
    ) -> Result<&Session, RegistryError> {
        use std::collections::hash_map::Entry;

        match self.sessions.entry(conn_id) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateConnection(conn_id)),
            Entry::Vacant(slot) => Ok(&*slot.insert(Session {
                connection_id: conn_id,
                display_name: display_name.into(),
                room: room.into(),
            })),
        }
    }

    pub fn lookup(&self, conn_id: ConnectionId) -> Result<&Session, RegistryError> {
        self.sessions
            .get(&conn_id)
            .ok_or(RegistryError::NotFound(conn_id))
    }

    /// Remove a session, handing it back for the leave notification.
    pub fn unregister(&mut self, conn_id: ConnectionId) -> Result<Session, RegistryError> {
        self.sessions
            .remove(&conn_id)
            .ok_or(RegistryError::NotFound(conn_id))
    }

    pub fn contains(&self, conn_id: ConnectionId) -> bool {
        self.sessions.contains_key(&conn_id)
    }

    /// Connections currently in `room`.
    pub fn members_of(&self, room: &str) -> BTreeSet<ConnectionId> {
        self.sessions
            .values()
            .filter(|s| s.room == room)
            .map(|s| s.connection_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
