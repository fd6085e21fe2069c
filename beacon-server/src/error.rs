use beacon_core::{ConnectionId, ParticipantId};
use thiserror::Error;

/// Why a relay frame was dropped. None of these are retried; the caller logs
/// and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalingError {
    #[error("no live connection for participant {0}")]
    UnknownTarget(ParticipantId),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("relay channel {0} is closed")]
    RelayClosed(ConnectionId),
}

impl SignalingError {
    pub(crate) fn violation(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }
}
