//! WebSocket relay for room-scoped signaling and small-group collaboration

mod actor;
mod messages;
mod registry;
mod server;
mod types;

pub use actor::RelayHandle;
pub use messages::{ClientMessage, ServerMessage};
pub use server::{DEFAULT_SIGNALING_PORT, SignalingServer};
pub use types::{
    ConnectionId, OutboundMessage, Participant, RoomId, SignalingError, UNKNOWN_NAME,
};
