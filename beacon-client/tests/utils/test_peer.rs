use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use beacon_client::{CallClient, TransportEvent, WsRelay};
use beacon_core::{ClientSignal, IceCandidate, ParticipantId, RoomId};
use beacon_server::{ServerConfig, SessionCoordinator, serve};

use super::mock_transport::{MockTransport, OP_TIMEOUT_MS};

pub const ROOM: &str = "r1";

/// A participant whose `CallClient` runs in the background over a mock
/// transport.
pub struct TestPeer {
    pub id: ParticipantId,
    pub transport: Arc<MockTransport>,
    events: mpsc::Sender<TransportEvent<()>>,
    task: JoinHandle<()>,
}

impl TestPeer {
    /// Relay frames go straight into the coordinator, no sockets.
    pub async fn in_process(coordinator: &SessionCoordinator, user: &str) -> Result<Self> {
        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let handle = coordinator.open(server_tx);
        let (client_tx, mut client_rx) = mpsc::unbounded_channel::<ClientSignal>();

        tokio::spawn({
            let coordinator = coordinator.clone();
            async move {
                while let Some(signal) = client_rx.recv().await {
                    let _ = coordinator.handle_signal(&handle, signal);
                }
                coordinator.close(&handle);
            }
        });

        let peer = Self::start(user, client_tx, server_rx).await?;
        wait_registered(coordinator, &peer.id).await?;
        Ok(peer)
    }

    pub async fn over_websocket(server: &TestServer, user: &str) -> Result<Self> {
        let (relay, signals) = WsRelay::connect(&server.ws_url()).await?;
        let peer = Self::start(user, relay, signals).await?;
        wait_registered(&server.coordinator, &peer.id).await?;
        Ok(peer)
    }

    async fn start<S: beacon_client::SignalSink + 'static>(
        user: &str,
        sink: S,
        signals: mpsc::UnboundedReceiver<beacon_core::ServerSignal>,
    ) -> Result<Self> {
        let id = ParticipantId::from(user);
        let transport = Arc::new(MockTransport::default());
        let client = CallClient::new(id.clone(), RoomId::from(ROOM), Arc::clone(&transport), sink);
        client.join().await?;

        let (events_tx, events_rx) = mpsc::channel(16);
        let (tracks_tx, _tracks_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(client.run(signals, events_rx, tracks_tx));

        Ok(Self {
            id,
            transport,
            events: events_tx,
            task,
        })
    }

    /// Pretend the transport gathered a local candidate.
    pub async fn gather(&self, candidate: &str) -> Result<()> {
        self.events
            .send(TransportEvent::LocalCandidate(IceCandidate::new(candidate)))
            .await?;
        Ok(())
    }
}

impl Drop for TestPeer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn wait_registered(coordinator: &SessionCoordinator, id: &ParticipantId) -> Result<()> {
    let deadline = tokio::time::Instant::now() + Duration::from_millis(OP_TIMEOUT_MS);
    while coordinator.registry().lookup_handle(id).is_none() {
        if tokio::time::Instant::now() > deadline {
            anyhow::bail!("{} never registered", id);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}

/// The signaling server on an ephemeral port.
pub struct TestServer {
    pub coordinator: SessionCoordinator,
    addr: std::net::SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let coordinator = SessionCoordinator::new(ServerConfig::default());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn({
            let coordinator = coordinator.clone();
            async move {
                let shutdown = async {
                    let _ = shutdown_rx.await;
                };
                if let Err(e) = serve(listener, coordinator, shutdown).await {
                    tracing::error!("[TestServer] {:?}", e);
                }
            }
        });

        Ok(Self {
            coordinator,
            addr,
            shutdown: Some(shutdown_tx),
        })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
