use beacon_core::{IceCandidate, TransportConnectionState};

/// What the media transport reports on its own, outside any negotiation call.
///
/// `R` is whatever the transport hands out for an incoming remote track.
#[derive(Debug)]
pub enum TransportEvent<R> {
    LocalCandidate(IceCandidate),
    RemoteTrack(R),
    StateChanged(TransportConnectionState),
}
