use anyhow::{Result, anyhow};
use async_trait::async_trait;
use beacon_core::ClientSignal;
use tokio::sync::mpsc;

/// Where a client's relay frames go.
#[async_trait]
pub trait SignalSink: Send + Sync {
    async fn send_signal(&self, signal: ClientSignal) -> Result<()>;
}

#[async_trait]
impl SignalSink for mpsc::UnboundedSender<ClientSignal> {
    async fn send_signal(&self, signal: ClientSignal) -> Result<()> {
        self.send(signal)
            .map_err(|e| anyhow!("relay closed, dropped {}", e.0.kind()))
    }
}
