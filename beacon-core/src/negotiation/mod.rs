mod media_transport;
mod negotiation_error;
mod negotiation_session;
mod negotiation_state;

pub use media_transport::{MediaTransport, TransportConnectionState};
pub use negotiation_error::NegotiationError;
pub use negotiation_session::{CandidateDisposition, Negotiation};
pub use negotiation_state::{NegotiationRole, NegotiationState};
