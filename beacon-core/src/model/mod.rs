mod connection;
mod participant;
mod room;
mod session_description;
mod signaling;

pub use connection::ConnectionId;
pub use participant::ParticipantId;
pub use room::RoomId;
pub use session_description::{IceCandidate, SdpType, SessionDescription};
pub use signaling::{ClientSignal, DEFAULT_STUN_SERVERS, IceServerConfig, ServerSignal};
