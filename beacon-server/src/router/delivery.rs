use crate::registry::ConnectionHandle;
use beacon_core::{ConnectionId, ParticipantId};

/// Outcome of one routed frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    /// Recipients whose relay channel was already gone.
    pub failed: usize,
}

impl Delivery {
    pub fn single() -> Self {
        Self {
            delivered: 1,
            failed: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.delivered == 0
    }
}

/// Both ends of a call frame, resolved before anything is sent.
#[derive(Debug, Clone)]
pub struct CallRoute {
    /// Sender identity as the registry knows it.
    pub sender: ParticipantId,
    pub target: ParticipantId,
    pub target_handle: ConnectionHandle,
}

impl CallRoute {
    pub fn target_connection(&self) -> ConnectionId {
        self.target_handle.id()
    }
}
