use beacon_core::IceServerConfig;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 5001;

/// Server settings. The CLI fills this from flags and environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Handed to clients from `GET /ice-servers`.
    pub ice_servers: Vec<IceServerConfig>,
    /// Offers left unanswered for longer than this are dropped from the
    /// ledger. `None` keeps them until either side disconnects.
    pub negotiation_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            ice_servers: vec![IceServerConfig::default_stun()],
            negotiation_timeout: None,
        }
    }
}

impl ServerConfig {
    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    pub fn with_negotiation_timeout(mut self, timeout: Duration) -> Self {
        self.negotiation_timeout = Some(timeout);
        self
    }
}
