use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    Initiator,
    Responder,
}

/// Progress of one offer/answer exchange.
///
/// Initiator track: `Idle -> OfferCreated -> OfferSent -> AnswerReceived -> Connected`.
/// Responder track: `Idle -> OfferReceived -> AnswerCreated -> AnswerSent -> Connected`.
/// `Connected` is only entered on the transport's own connectivity event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    OfferCreated,
    OfferSent,
    AnswerReceived,
    OfferReceived,
    AnswerCreated,
    AnswerSent,
    Connected,
    /// The transport refused an operation; the session is discarded.
    Failed,
    /// Torn down (peer gone, transport closed or superseded).
    Abandoned,
}

impl NegotiationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Failed | Self::Abandoned)
    }

    /// States in which a new offer may be produced or accepted.
    pub(crate) fn accepts_new_offer(self) -> bool {
        matches!(self, Self::Idle | Self::Connected)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
