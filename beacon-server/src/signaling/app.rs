use crate::signaling::ws_handler;
use crate::{ServerConfig, SessionCoordinator};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use beacon_core::IceServerConfig;
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

const BANNER: &str = "beacon signaling server";

/// HTTP surface: liveness banner, relay upgrade and ICE server list.
pub fn build_router(coordinator: SessionCoordinator) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { BANNER }))
        .route("/ws", get(ws_handler))
        .route("/ice-servers", get(ice_servers))
        .layer(cors)
        .with_state(coordinator)
}

async fn ice_servers(State(coordinator): State<SessionCoordinator>) -> Json<Vec<IceServerConfig>> {
    Json(coordinator.ice_servers())
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    coordinator: SessionCoordinator,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let sweeper = coordinator.spawn_negotiation_sweeper();
    let app = build_router(coordinator);

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("signaling server stopped");

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    result
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn run(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(
        "Signaling server listening on http://{}",
        listener.local_addr()?
    );

    serve(listener, SessionCoordinator::new(config), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Shutting down");
    })
    .await
}
