use crate::SignalingError;
use beacon_core::{ConnectionId, ServerSignal};
use tokio::sync::mpsc;

/// One open relay channel: its id plus the queue feeding its writer task.
///
/// Cloning is cheap; every clone addresses the same channel. Sends never wait
/// on the socket.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<ServerSignal>,
}

impl ConnectionHandle {
    pub fn new(outbound: mpsc::UnboundedSender<ServerSignal>) -> Self {
        Self {
            id: ConnectionId::new(),
            outbound,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn send(&self, signal: ServerSignal) -> Result<(), SignalingError> {
        self.outbound
            .send(signal)
            .map_err(|_| SignalingError::RelayClosed(self.id))
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}
