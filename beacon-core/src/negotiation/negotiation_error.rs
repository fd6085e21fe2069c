use crate::negotiation::NegotiationState;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// The input is not allowed in the current state. The state is left as is.
    #[error("{event} is not allowed in state {state}")]
    ProtocolViolation {
        state: NegotiationState,
        event: &'static str,
    },

    /// The media transport refused an operation. The negotiation is now `Failed`.
    #[error("media transport rejected {operation}: {source}")]
    TransportRejected {
        operation: &'static str,
        source: anyhow::Error,
    },
}

impl NegotiationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportRejected { .. })
    }
}
