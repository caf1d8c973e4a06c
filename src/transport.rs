//! Room-scoped multicast capability the core depends on.
//!
//! The hub never talks to sockets directly. Everything it emits goes through
//! [`GroupTransport`], implemented in production by
//! [`ConnectionsManager`](crate::ws::ConnectionsManager) and in tests by a
//! recording double.

use std::sync::Arc;

use crate::models::ConnectionId;
use crate::ws::ServerMessage;

pub trait GroupTransport: Send + Sync {
    /// Add a connection to a named multicast group.
    fn join_group(&self, conn_id: ConnectionId, group: &str);

    /// Remove a connection from a named multicast group.
    fn leave_group(&self, conn_id: ConnectionId, group: &str);

    /// Fire-and-forget delivery to every group member except `excluding`.
    ///
    /// Returns the number of connections the message was handed to.
    fn send_to_group(
        &self,
        group: &str,
        message: ServerMessage,
        excluding: Option<ConnectionId>,
    ) -> usize;

    /// Deliver a message to a single connection. `false` if it is gone.
    fn send_to(&self, conn_id: ConnectionId, message: ServerMessage) -> bool;

    /// Ask the transport to terminate a connection after flushing what was
    /// already queued for it.
    fn close(&self, conn_id: ConnectionId, reason: &str);
}

impl<T: GroupTransport + ?Sized> GroupTransport for Arc<T> {
    fn join_group(&self, conn_id: ConnectionId, group: &str) {
        (**self).join_group(conn_id, group)
    }

    fn leave_group(&self, conn_id: ConnectionId, group: &str) {
        (**self).leave_group(conn_id, group)
    }

    fn send_to_group(
        &self,
        group: &str,
        message: ServerMessage,
        excluding: Option<ConnectionId>,
    ) -> usize {
        (**self).send_to_group(group, message, excluding)
    }

    fn send_to(&self, conn_id: ConnectionId, message: ServerMessage) -> bool {
        (**self).send_to(conn_id, message)
    }

    fn close(&self, conn_id: ConnectionId, reason: &str) {
        (**self).close(conn_id, reason)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::Mutex;

    use super::*;

    /// In-memory transport that records every delivery per recipient.
    #[derive(Default)]
    pub struct RecordingTransport {
        groups: Mutex<BTreeMap<String, BTreeSet<ConnectionId>>>,
        delivered: Mutex<Vec<(ConnectionId, ServerMessage)>>,
        closed: Mutex<Vec<ConnectionId>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Messages delivered to `conn_id`, in delivery order.
        pub fn inbox(&self, conn_id: ConnectionId) -> Vec<ServerMessage> {
            self.delivered
                .lock()
                .unwrap()
                .iter()
                .filter(|(to, _)| *to == conn_id)
                .map(|(_, msg)| msg.clone())
                .collect()
        }

        pub fn delivery_count(&self) -> usize {
            self.delivered.lock().unwrap().len()
        }

        pub fn group(&self, name: &str) -> BTreeSet<ConnectionId> {
            self.groups
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .unwrap_or_default()
        }

        pub fn was_closed(&self, conn_id: ConnectionId) -> bool {
            self.closed.lock().unwrap().contains(&conn_id)
        }
    }

    impl GroupTransport for RecordingTransport {
        fn join_group(&self, conn_id: ConnectionId, group: &str) {
            self.groups
                .lock()
                .unwrap()
                .entry(group.to_string())
                .or_default()
                .insert(conn_id);
        }

        fn leave_group(&self, conn_id: ConnectionId, group: &str) {
            if let Some(members) = self.groups.lock().unwrap().get_mut(group) {
                members.remove(&conn_id);
            }
        }

        fn send_to_group(
            &self,
            group: &str,
            message: ServerMessage,
            excluding: Option<ConnectionId>,
        ) -> usize {
            let recipients: Vec<ConnectionId> = self
                .group(group)
                .into_iter()
                .filter(|id| Some(*id) != excluding)
                .collect();
            let mut delivered = self.delivered.lock().unwrap();
            for id in &recipients {
                delivered.push((*id, message.clone()));
            }
            recipients.len()
        }

        fn send_to(&self, conn_id: ConnectionId, message: ServerMessage) -> bool {
            self.delivered.lock().unwrap().push((conn_id, message));
            true
        }

        fn close(&self, conn_id: ConnectionId, _reason: &str) {
            self.closed.lock().unwrap().push(conn_id);
        }
    }
}
