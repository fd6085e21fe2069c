use crate::model::{IceCandidate, SessionDescription};
use async_trait::async_trait;

/// The real-time media connection the negotiation drives.
///
/// Implementations own the actual peer connection. Local candidates and remote
/// tracks are reported out of band by the implementation (see the client's
/// `TransportEvent`); only the calls the negotiation makes live here.
#[async_trait]
pub trait MediaTransport: Send + Sync + 'static {
    /// Local capture handed to `add_local_tracks`.
    type Stream: Send + Sync;

    /// Produce an offer and install it as the local description.
    async fn create_offer(&self) -> anyhow::Result<SessionDescription>;

    /// Install `remote_offer`, then produce an answer and install it locally.
    async fn create_answer(
        &self,
        remote_offer: SessionDescription,
    ) -> anyhow::Result<SessionDescription>;

    async fn set_remote_answer(&self, answer: SessionDescription) -> anyhow::Result<()>;

    /// Must only be called once a remote description is installed.
    async fn add_ice_candidate(&self, candidate: IceCandidate) -> anyhow::Result<()>;

    /// Attach the stream's tracks. Tracks already attached are skipped.
    async fn add_local_tracks(&self, stream: &Self::Stream) -> anyhow::Result<()>;
}

/// Connectivity reported by the transport itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}
