use crate::call::SignalSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use beacon_core::{ClientSignal, ServerSignal};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Client end of the relay channel over a WebSocket.
///
/// Outbound frames go through an unbounded queue to a writer task; inbound
/// frames are parsed by a reader task and handed out on a receiver.
#[derive(Clone)]
pub struct WsRelay {
    outbound: mpsc::UnboundedSender<ClientSignal>,
}

impl WsRelay {
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<ServerSignal>)> {
        let (stream, _) = connect_async(url)
            .await
            .with_context(|| format!("failed to connect to {}", url))?;
        info!("Connected to relay {}", url);

        let (mut sender, mut receiver) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientSignal>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(signal) = outbound_rx.recv().await {
                let json = match serde_json::to_string(&signal) {
                    Ok(json) => json,
                    Err(e) => {
                        error!("Failed to serialize {}: {}", signal.kind(), e);
                        continue;
                    }
                };
                if let Err(e) = sender.send(Message::Text(json.into())).await {
                    error!("Failed to send WS message: {:?}", e);
                    break;
                }
            }
            let _ = sender.close().await;
        });

        tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        match serde_json::from_str::<ServerSignal>(text.as_str()) {
                            Ok(signal) => {
                                if inbound_tx.send(signal).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Invalid ServerSignal: {:?}", e),
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            debug!("Relay reader finished");
        });

        Ok((
            Self {
                outbound: outbound_tx,
            },
            inbound_rx,
        ))
    }
}

#[async_trait]
impl SignalSink for WsRelay {
    async fn send_signal(&self, signal: ClientSignal) -> Result<()> {
        self.outbound.send_signal(signal).await
    }
}
