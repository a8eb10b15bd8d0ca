//! HTTP status endpoint — exposes the live peer gauge as JSON.

use std::time::Instant;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use peerhub_services::ClientDirectory;

#[derive(Clone)]
pub struct StatusState {
    pub directory: ClientDirectory,
    pub started_at: Instant,
}

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub live_peers: usize,
    pub uptime_secs: u64,
}

pub async fn handle_status(State(state): State<StatusState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        live_peers: state.directory.count(),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

// ── /peers ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct PeersResponse {
    pub peers: Vec<String>,
}

pub async fn handle_peers(State(state): State<StatusState>) -> Json<PeersResponse> {
    Json(PeersResponse {
        peers: state.directory.peer_ids(),
    })
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn router(state: StatusState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/status", get(handle_status))
        .route("/peers", get(handle_peers))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(
    state: StatusState,
    port: u16,
    mut shutdown: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!(port, "status endpoint listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}
