use std::sync::Arc;

use crate::hub::HubHandle;
use crate::ws::ConnectionsManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub connections: Arc<ConnectionsManager>,
}

impl AppState {
    pub fn new(hub: HubHandle, connections: Arc<ConnectionsManager>) -> Self {
        Self { hub, connections }
    }
}
