use crate::config::Config;
use crate::models::ConnectionId;
use crate::room::{SessionRegistry, StatusMonitor};
use crate::transport::GroupTransport;
use crate::ws::ServerMessage;

/// Relays document updates to the sender's room, sender excluded.
#[derive(Debug, Clone)]
pub struct UpdateBroadcaster {
    max_payload_bytes: usize,
}

impl Default for UpdateBroadcaster {
    fn default() -> Self {
        Self::new(Config::default().max_payload_bytes)
    }
}

impl UpdateBroadcaster {
    pub fn new(max_payload_bytes: usize) -> Self {
        Self { max_payload_bytes }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_payload_bytes)
    }

    /// Returns how many peers the update was handed to, or `None` when it
    /// was dropped (unknown sender or oversized payload).
    pub fn on_update<T: GroupTransport>(
        &self,
        registry: &SessionRegistry,
        monitor: &mut StatusMonitor,
        transport: &T,
        conn_id: ConnectionId,
        payload: String,
    ) -> Option<usize> {
        let session = match registry.lookup(conn_id) {
            Ok(session) => session,
            Err(_) => {
                tracing::trace!(conn_id = %conn_id, "Update from unjoined connection dropped");
                return None;
            }
        };

        if payload.len() > self.max_payload_bytes {
            tracing::warn!(
                conn_id = %conn_id,
                size = payload.len(),
                limit = self.max_payload_bytes,
                "Oversized update dropped"
            );
            return None;
        }

        monitor.record_edit();

        let delivered = transport.send_to_group(
            &session.room,
            ServerMessage::update(&session.display_name, payload),
            Some(conn_id),
        );

        tracing::debug!(
            conn_id = %conn_id,
            room = %session.room,
            recipients = delivered,
            "Update relayed"
        );

        Some(delivered)
    }
}
