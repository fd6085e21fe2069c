use crate::SessionCoordinator;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use beacon_core::ClientSignal;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(coordinator): State<SessionCoordinator>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, coordinator))
}

async fn handle_socket(socket: WebSocket, coordinator: SessionCoordinator) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handle = coordinator.open(tx);
    let connection = handle.id();
    info!("New WebSocket connection: {}", connection);

    let mut send_task = tokio::spawn(async move {
        while let Some(signal) = rx.recv().await {
            let json = match serde_json::to_string(&signal) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize {}: {}", signal.kind(), e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(json.into())).await {
                error!("Failed to send WS message to {}: {:?}", connection, e);
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let coordinator = coordinator.clone();
        let handle = handle.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientSignal>(&text) {
                        Ok(signal) => {
                            debug!("{} from {}", signal.kind(), connection);
                            // Routing failures are logged by the coordinator.
                            let _ = coordinator.handle_signal(&handle, signal);
                        }
                        Err(e) => warn!("Invalid ClientSignal from {}: {:?}", connection, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    coordinator.close(&handle);
    info!("WebSocket disconnected: {}", connection);
}
