use std::collections::HashSet;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::models::ConnectionId;
use crate::transport::GroupTransport;
use crate::ws::ServerMessage;

/// Instructions queued for a connection's writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message(ServerMessage),
    Close(String),
}

/// Client connection handle for sending messages
#[derive(Clone)]
pub struct ClientHandle {
    pub conn_id: ConnectionId,
    sender: mpsc::UnboundedSender<Outbound>,
}

impl ClientHandle {
    pub fn new(conn_id: ConnectionId, sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self { conn_id, sender }
    }

    pub fn send(&self, msg: ServerMessage) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Message(msg))
    }

    pub fn close(&self, reason: &str) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Close(reason.to_string()))
    }
}

/// Tracks live sockets and the multicast groups they belong to.
///
/// This is the production [`GroupTransport`]: the hub decides who belongs
/// where, this type only moves bytes.
pub struct ConnectionsManager {
    clients: DashMap<ConnectionId, ClientHandle>,
    groups: DashMap<String, HashSet<ConnectionId>>, // group name -> members
}

impl ConnectionsManager {
    pub fn new() -> Self {
        Self {
            clients: DashMap::new(),
            groups: DashMap::new(),
        }
    }

    /// Register a freshly accepted socket and hand back its outbound queue.
    pub fn connect(&self, conn_id: ConnectionId) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.clients.insert(conn_id, ClientHandle::new(conn_id, tx));
        rx
    }

    /// Forget a socket. Group membership is left to the hub's leave handling.
    pub fn disconnect(&self, conn_id: ConnectionId) -> Option<ClientHandle> {
        self.clients.remove(&conn_id).map(|(_, v)| v)
    }

    pub fn connection_count(&self) -> usize {
        self.clients.len()
    }

    pub fn group_size(&self, group: &str) -> usize {
        self.groups.get(group).map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for ConnectionsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupTransport for ConnectionsManager {
    fn join_group(&self, conn_id: ConnectionId, group: &str) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(conn_id);
    }

    fn leave_group(&self, conn_id: ConnectionId, group: &str) {
        let now_empty = match self.groups.get_mut(group) {
            Some(mut members) => {
                members.remove(&conn_id);
                members.is_empty()
            }
            None => false,
        };

        // Clean up empty groups
        if now_empty {
            self.groups.remove_if(group, |_, members| members.is_empty());
        }
    }

    fn send_to_group(
        &self,
        group: &str,
        message: ServerMessage,
        excluding: Option<ConnectionId>,
    ) -> usize {
        let recipients: Vec<ConnectionId> = match self.groups.get(group) {
            Some(members) => members
                .iter()
                .copied()
                .filter(|id| Some(*id) != excluding)
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for conn_id in recipients {
            if self.send_to(conn_id, message.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    fn send_to(&self, conn_id: ConnectionId, message: ServerMessage) -> bool {
        match self.clients.get(&conn_id) {
            Some(client) => client.send(message).is_ok(),
            None => false,
        }
    }

    fn close(&self, conn_id: ConnectionId, reason: &str) {
        if let Some(client) = self.clients.get(&conn_id) {
            let _ = client.close(reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn group_send_skips_excluded_and_departed_connections() {
        let manager = ConnectionsManager::new();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let c = ConnectionId::new();
        let mut rx_a = manager.connect(a);
        let mut rx_b = manager.connect(b);
        let _rx_c = manager.connect(c);

        manager.join_group(a, "demo");
        manager.join_group(b, "demo");
        manager.join_group(c, "demo");
        manager.disconnect(c);

        let sent = manager.send_to_group("demo", ServerMessage::update("a", "x".into()), Some(a));
        assert_eq!(sent, 1);
        assert_eq!(
            rx_b.try_recv().unwrap(),
            Outbound::Message(ServerMessage::update("a", "x".into()))
        );
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn close_is_queued_after_pending_messages() {
        let manager = ConnectionsManager::new();
        let a = ConnectionId::new();
        let mut rx = manager.connect(a);

        manager.send_to(a, ServerMessage::already_joined());
        manager.close(a, "bye");

        assert_eq!(
            rx.try_recv().unwrap(),
            Outbound::Message(ServerMessage::already_joined())
        );
        assert_eq!(rx.try_recv().unwrap(), Outbound::Close("bye".to_string()));
    }

    #[test]
    fn empty_groups_are_dropped() {
        let manager = ConnectionsManager::new();
        let a = ConnectionId::new();
        let _rx = manager.connect(a);

        manager.join_group(a, "demo");
        assert_eq!(manager.group_size("demo"), 1);
        manager.leave_group(a, "demo");
        assert_eq!(manager.group_size("demo"), 0);
        assert_eq!(manager.send_to_group("demo", ServerMessage::already_joined(), None), 0);
    }
}
