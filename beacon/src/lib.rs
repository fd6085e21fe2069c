pub use beacon_core::{ParticipantId, RoomId};

pub mod model {
    pub use beacon_core::model::*;
}

pub mod negotiation {
    pub use beacon_core::negotiation::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use beacon_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use beacon_client::*;
}
