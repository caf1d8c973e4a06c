//! Serialized event loop.
//!
//! Every connection task and HTTP handler talks to the core by pushing a
//! [`HubEvent`] into one unbounded queue. [`Hub::run`] drains it one event at
//! a time, so the registry, token store and edit counter are only ever
//! touched from a single task and a snapshot can never observe a half-applied
//! join or leave.

use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{ConnectionId, JoinRequest, Status};
use crate::room::{
    MembershipManager, RoomTokenStore, SessionRegistry, StatusMonitor, UpdateBroadcaster,
};
use crate::transport::GroupTransport;

/// Why a connection is leaving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// Client sent `leave`; the hub closes the connection afterwards
    Explicit,
    /// Transport reported the socket gone
    Disconnected,
}

#[derive(Debug)]
pub enum HubEvent {
    Join {
        conn_id: ConnectionId,
        request: JoinRequest,
    },
    Update {
        conn_id: ConnectionId,
        payload: String,
    },
    Leave {
        conn_id: ConnectionId,
        reason: LeaveReason,
    },
    StatusTick,
    StatusQuery {
        reply: oneshot::Sender<Status>,
    },
}

/// Owner of all room state.
pub struct Hub<T> {
    registry: SessionRegistry,
    tokens: RoomTokenStore,
    membership: MembershipManager,
    broadcaster: UpdateBroadcaster,
    monitor: StatusMonitor,
    transport: T,
    /// Connections that left explicitly and whose socket is still closing
    departed: HashSet<ConnectionId>,
}

impl<T: GroupTransport> Hub<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        Self {
            registry: SessionRegistry::new(),
            tokens: RoomTokenStore::new(),
            membership: MembershipManager::from_config(config),
            broadcaster: UpdateBroadcaster::from_config(config),
            monitor: StatusMonitor::new(),
            transport,
            departed: HashSet::new(),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn tokens(&self) -> &RoomTokenStore {
        &self.tokens
    }

    /// Apply one event to completion.
    pub fn handle(&mut self, event: HubEvent) {
        match event {
            HubEvent::Join { conn_id, .. } | HubEvent::Update { conn_id, .. }
                if self.departed.contains(&conn_id) =>
            {
                tracing::debug!(conn_id = %conn_id, "Event after leave dropped");
            }
            HubEvent::Join { conn_id, request } => {
                if let Err(e) = self.membership.on_join(
                    &mut self.registry,
                    &mut self.tokens,
                    &self.transport,
                    conn_id,
                    request,
                ) {
                    tracing::info!(conn_id = %conn_id, reason = e.code(), "Join rejected");
                }
            }
            HubEvent::Update { conn_id, payload } => {
                self.broadcaster.on_update(
                    &self.registry,
                    &mut self.monitor,
                    &self.transport,
                    conn_id,
                    payload,
                );
            }
            HubEvent::Leave { conn_id, reason } => {
                self.membership.on_leave(
                    &mut self.registry,
                    &mut self.tokens,
                    &self.transport,
                    conn_id,
                );
                match reason {
                    LeaveReason::Explicit => {
                        self.departed.insert(conn_id);
                        self.transport.close(conn_id, "left");
                    }
                    // Connection ids are never reused once the socket is gone
                    LeaveReason::Disconnected => {
                        self.departed.remove(&conn_id);
                    }
                }
            }
            HubEvent::StatusTick => {
                let status = self.monitor.tick(&self.registry, &self.tokens);
                match serde_json::to_string(&status) {
                    Ok(json) => tracing::info!(status = %json, "Status report"),
                    Err(e) => tracing::error!(error = %e, "Failed to serialize status"),
                }
            }
            HubEvent::StatusQuery { reply } => {
                let _ = reply.send(self.monitor.snapshot(&self.registry, &self.tokens));
            }
        }
    }

    /// Drain events until `shutdown` resolves or every [`HubHandle`] is gone,
    /// emitting a status tick every `status_interval`.
    pub async fn run<S>(
        mut self,
        mut events: mpsc::UnboundedReceiver<HubEvent>,
        status_interval: Duration,
        shutdown: S,
    ) where
        S: Future<Output = ()>,
    {
        let mut ticker = interval_at(Instant::now() + status_interval, status_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        tracing::info!(interval_secs = status_interval.as_secs(), "Hub event loop started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Hub event loop stopping");
                    break;
                }
                _ = ticker.tick() => self.handle(HubEvent::StatusTick),
                event = events.recv() => match event {
                    Some(event) => self.handle(event),
                    None => {
                        tracing::info!("All hub handles dropped, event loop stopping");
                        break;
                    }
                },
            }
        }
    }
}

/// Cheap cloneable sender side of the hub queue
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::UnboundedSender<HubEvent>,
}

/// Create the hub queue.
pub fn channel() -> (HubHandle, mpsc::UnboundedReceiver<HubEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (HubHandle { tx }, rx)
}

impl HubHandle {
    fn submit(&self, event: HubEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| AppError::HubUnavailable)
    }

    pub fn join(&self, conn_id: ConnectionId, request: JoinRequest) -> Result<()> {
        self.submit(HubEvent::Join { conn_id, request })
    }

    pub fn update(&self, conn_id: ConnectionId, payload: String) -> Result<()> {
        self.submit(HubEvent::Update { conn_id, payload })
    }

    pub fn leave(&self, conn_id: ConnectionId, reason: LeaveReason) -> Result<()> {
        self.submit(HubEvent::Leave { conn_id, reason })
    }

    pub fn tick(&self) -> Result<()> {
        self.submit(HubEvent::StatusTick)
    }

    /// On-demand snapshot; resolves once every earlier event has been applied.
    pub async fn status(&self) -> Result<Status> {
        let (reply, rx) = oneshot::channel();
        self.submit(HubEvent::StatusQuery { reply })?;
        rx.await.map_err(|_| AppError::HubUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::RecordingTransport;
    use crate::ws::ServerMessage;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn hub() -> (Hub<Arc<RecordingTransport>>, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        (Hub::new(&Config::default(), transport.clone()), transport)
    }

    #[test]
    fn demo_room_scenario() {
        let (mut hub, transport) = hub();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let c = ConnectionId::new();

        hub.handle(HubEvent::Join {
            conn_id: a,
            request: JoinRequest::new("ada", "demo", "t1"),
        });
        hub.handle(HubEvent::Join {
            conn_id: b,
            request: JoinRequest::new("bob", "demo", "t1"),
        });
        hub.handle(HubEvent::Join {
            conn_id: c,
            request: JoinRequest::new("cy", "demo", "wrong"),
        });
        hub.handle(HubEvent::Update {
            conn_id: a,
            payload: "hello".to_string(),
        });

        assert!(transport.was_closed(c));
        assert_eq!(hub.tokens().token_for("demo"), Some("t1"));
        assert_eq!(hub.registry().len(), 2);
        assert_eq!(
            transport.inbox(b).last(),
            Some(&ServerMessage::update("ada", "hello".to_string()))
        );
        assert!(!transport
            .inbox(a)
            .iter()
            .any(|m| matches!(m, ServerMessage::Update { .. })));
    }

    #[test]
    fn explicit_leave_closes_and_disconnect_is_idempotent() {
        let (mut hub, transport) = hub();
        let a = ConnectionId::new();
        hub.handle(HubEvent::Join {
            conn_id: a,
            request: JoinRequest::new("ada", "demo", "t1"),
        });

        hub.handle(HubEvent::Leave {
            conn_id: a,
            reason: LeaveReason::Explicit,
        });
        let after_leave = transport.delivery_count();
        hub.handle(HubEvent::Leave {
            conn_id: a,
            reason: LeaveReason::Disconnected,
        });

        assert!(transport.was_closed(a));
        assert!(hub.registry().is_empty());
        assert_eq!(transport.delivery_count(), after_leave);
    }

    #[test]
    fn join_after_explicit_leave_is_refused() {
        let (mut hub, transport) = hub();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        hub.handle(HubEvent::Join {
            conn_id: b,
            request: JoinRequest::new("bob", "demo", "t1"),
        });

        hub.handle(HubEvent::Leave {
            conn_id: a,
            reason: LeaveReason::Explicit,
        });
        hub.handle(HubEvent::Join {
            conn_id: a,
            request: JoinRequest::new("ada", "demo", "t1"),
        });
        hub.handle(HubEvent::Update {
            conn_id: a,
            payload: "late".to_string(),
        });

        assert!(transport.was_closed(a));
        assert!(!hub.registry().contains(a));
        assert!(transport.inbox(a).is_empty());
        assert_eq!(
            transport.inbox(b),
            vec![ServerMessage::member_joined("bob")]
        );

        hub.handle(HubEvent::Leave {
            conn_id: a,
            reason: LeaveReason::Disconnected,
        });
        assert!(hub.departed.is_empty());
    }

    #[test]
    fn update_after_leave_is_dropped() {
        let (mut hub, transport) = hub();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        hub.handle(HubEvent::Join {
            conn_id: a,
            request: JoinRequest::new("ada", "demo", "t1"),
        });
        hub.handle(HubEvent::Join {
            conn_id: b,
            request: JoinRequest::new("bob", "demo", "t1"),
        });
        hub.handle(HubEvent::Leave {
            conn_id: a,
            reason: LeaveReason::Disconnected,
        });
        let before = transport.delivery_count();

        hub.handle(HubEvent::Update {
            conn_id: a,
            payload: "late".to_string(),
        });

        assert_eq!(transport.delivery_count(), before);
    }

    #[tokio::test]
    async fn status_counter_resets_only_on_tick() {
        let (hub, _transport) = hub();
        let (handle, events) = channel();
        let task = tokio::spawn(hub.run(events, Duration::from_secs(3600), std::future::pending::<()>()));

        let a = ConnectionId::new();
        let b = ConnectionId::new();
        handle.join(a, JoinRequest::new("ada", "demo", "t1")).unwrap();
        handle.join(b, JoinRequest::new("bob", "demo", "t1")).unwrap();
        for i in 0..3 {
            handle.update(a, format!("v{}", i)).unwrap();
        }
        assert_eq!(handle.status().await.unwrap().events_since_last_snapshot, 3);

        handle.update(a, "v3".into()).unwrap();
        handle.update(b, "v4".into()).unwrap();
        assert_eq!(handle.status().await.unwrap().events_since_last_snapshot, 5);

        handle.tick().unwrap();
        let status = handle.status().await.unwrap();
        assert_eq!(status.events_since_last_snapshot, 0);
        assert_eq!(status.active_connection_count, 2);

        drop(handle);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn interval_tick_fires_inside_the_loop() {
        let (hub, _transport) = hub();
        let (handle, events) = channel();
        let _task = tokio::spawn(hub.run(events, Duration::from_secs(60), std::future::pending::<()>()));

        let a = ConnectionId::new();
        handle.join(a, JoinRequest::new("ada", "demo", "t1")).unwrap();
        handle.update(a, "x".into()).unwrap();
        assert_eq!(handle.status().await.unwrap().events_since_last_snapshot, 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(handle.status().await.unwrap().events_since_last_snapshot, 0);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop() {
        let (hub, _transport) = hub();
        let (handle, events) = channel();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(hub.run(events, Duration::from_secs(60), async move {
            let _ = stopped.await;
        }));

        stop.send(()).unwrap();
        task.await.unwrap();

        assert!(matches!(handle.status().await, Err(AppError::HubUnavailable)));
    }
}
