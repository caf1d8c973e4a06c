pub mod handler;
pub mod messages;
pub mod session;

pub use handler::ws_routes;
pub use messages::{notification_codes, ClientMessage, ServerMessage};
pub use session::{ClientHandle, ConnectionsManager, Outbound};
