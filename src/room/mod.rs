//! Room, session and broadcast core.
//!
//! Every type here is plain owned state mutated through `&mut self`; the
//! [`Hub`](crate::hub::Hub) owns one instance of each and is the only caller,
//! so no locking happens below this line.

pub mod broadcaster;
pub mod membership;
pub mod monitor;
pub mod registry;
pub mod token_store;

pub use broadcaster::UpdateBroadcaster;
pub use membership::MembershipManager;
pub use monitor::StatusMonitor;
pub use registry::SessionRegistry;
pub use token_store::{RoomTokenStore, TokenBinding};
