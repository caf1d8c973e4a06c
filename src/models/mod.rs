pub mod session;
pub mod status;

pub use session::{ConnectionId, JoinRequest, Session, ANONYMOUS_DISPLAY_NAME};
pub use status::{MemberStatus, RoomStatus, Status};
