use chrono::{DateTime, Utc};

use crate::models::{MemberStatus, RoomStatus, Status};
use crate::room::{RoomTokenStore, SessionRegistry};

/// Counts edit events and builds [`Status`] snapshots.
///
/// The counter means "edits during the current interval": only [`tick`]
/// resets it, on-demand [`snapshot`]s leave it alone.
///
/// [`tick`]: StatusMonitor::tick
/// [`snapshot`]: StatusMonitor::snapshot
#[derive(Debug, Default)]
pub struct StatusMonitor {
    events: u64,
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_edit(&mut self) {
        self.events += 1;
    }

    pub fn pending_events(&self) -> u64 {
        self.events
    }

    /// On-demand snapshot; the event counter is untouched.
    pub fn snapshot(&self, registry: &SessionRegistry, tokens: &RoomTokenStore) -> Status {
        aggregate(registry, tokens, self.events, Utc::now())
    }

    /// Interval snapshot; the event counter restarts from zero.
    pub fn tick(&mut self, registry: &SessionRegistry, tokens: &RoomTokenStore) -> Status {
        let status = self.snapshot(registry, tokens);
        self.events = 0;
        status
    }
}

/// Pure aggregation over the registry and token store.
pub fn aggregate(
    registry: &SessionRegistry,
    tokens: &RoomTokenStore,
    events: u64,
    timestamp: DateTime<Utc>,
) -> Status {
    let rooms = tokens
        .rooms()
        .map(|(name, token)| RoomStatus {
            name: name.to_string(),
            token: token.to_string(),
            members: registry
                .members_of(name)
                .into_iter()
                .filter_map(|id| registry.lookup(id).ok())
                .map(|session| MemberStatus {
                    connection_id: session.connection_id,
                    display_name: session.display_name.clone(),
                })
                .collect(),
        })
        .collect();

    Status {
        active_connection_count: registry.len(),
        events_since_last_snapshot: events,
        rooms,
        timestamp,
    }
}
