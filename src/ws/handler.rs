use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};

use crate::error::Result;
use crate::hub::{HubHandle, LeaveReason};
use crate::models::{ConnectionId, JoinRequest};
use crate::state::AppState;
use crate::transport::GroupTransport;
use crate::ws::{ClientMessage, Outbound, ServerMessage};

/// WebSocket routes
pub fn ws_routes() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

/// WebSocket upgrade handler. Join parameters may ride on the query string
/// (`?displayName=..&room=..&token=..`) or arrive later as a `join` frame.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(handshake): Query<JoinRequest>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, handshake))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState, handshake: JoinRequest) {
    let conn_id = ConnectionId::new();
    tracing::info!(conn_id = %conn_id, "WebSocket connected");

    let mut outbound = state.connections.connect(conn_id);
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Task for sending messages to client
    let mut send_task = tokio::spawn(async move {
        while let Some(out) = outbound.recv().await {
            match out {
                Outbound::Message(msg) => match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::error!(error = %e, "Failed to encode outbound message"),
                },
                Outbound::Close(reason) => {
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: reason.into(),
                    };
                    let _ = ws_sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    let mut phase = open_phase(conn_id, handshake, &state.hub);

    // Process incoming messages
    let hub = state.hub.clone();
    let connections = state.connections.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            let text = match result {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    tracing::info!(conn_id = %conn_id, "WebSocket close received");
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            };

            if dispatch_frame(text.as_str(), &mut phase, conn_id, &hub, &connections).is_err() {
                break;
            }
        }
    });

    // Wait for either task to finish (and finish the other)
    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    // Cleanup on disconnect; a repeated leave is a no-op in the hub
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected, cleaning up");
    let _ = state.hub.leave(conn_id, LeaveReason::Disconnected);
    state.connections.disconnect(conn_id);
}

/// Where a connection is in its lifecycle, as seen by its reader task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Unjoined,
    /// A join was submitted; the hub decides whether it sticks
    Joined,
    /// Terminal; every later frame is dropped
    Left,
}

/// Submit the handshake join, if the query string carried one.
pub(crate) fn open_phase(conn_id: ConnectionId, handshake: JoinRequest, hub: &HubHandle) -> Phase {
    if !handshake.is_attempted() {
        return Phase::Unjoined;
    }
    if let Err(e) = hub.join(conn_id, handshake) {
        tracing::error!(conn_id = %conn_id, error = %e, "Failed to submit join");
    }
    Phase::Joined
}

/// Apply one text frame. An error means the hub is gone and the reader
/// should stop.
pub(crate) fn dispatch_frame<T: GroupTransport>(
    text: &str,
    phase: &mut Phase,
    conn_id: ConnectionId,
    hub: &HubHandle,
    transport: &T,
) -> Result<()> {
    if *phase == Phase::Left {
        tracing::debug!(conn_id = %conn_id, "Frame after leave dropped");
        return Ok(());
    }

    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!(conn_id = %conn_id, error = %e, "Unparseable frame ignored");
            return Ok(());
        }
    };

    let submitted = match msg {
        ClientMessage::Join(_) if *phase == Phase::Joined => {
            transport.send_to(conn_id, ServerMessage::already_joined());
            Ok(())
        }
        ClientMessage::Join(request) => {
            *phase = Phase::Joined;
            hub.join(conn_id, request)
        }
        ClientMessage::Update { payload } => hub.update(conn_id, payload),
        ClientMessage::Leave => {
            // The hub closes the socket once the leave is applied
            *phase = Phase::Left;
            hub.leave(conn_id, LeaveReason::Explicit)
        }
    };

    if let Err(e) = &submitted {
        tracing::error!(conn_id = %conn_id, error = %e, "Hub rejected event");
    }
    submitted
}
