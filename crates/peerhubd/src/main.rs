//! peerhubd — peer registry and unicast relay daemon.

use anyhow::Result;

use peerhub_core::config::HubConfig;
use peerhub_services::Hub;
use peerhubd::acceptor::PeerAcceptor;
use peerhubd::status::{self, StatusState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = HubConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = HubConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        HubConfig::default()
    });
    tracing::info!(
        listen = %config.network.listen_addr,
        status_port = config.network.status_port,
        outbound_queue = config.hub.outbound_queue,
        "peerhubd starting"
    );

    // Shared state
    let (hub, controller) = Hub::new();
    let controller_task = tokio::spawn(controller.run());

    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let acceptor = PeerAcceptor::bind(
        &config.network.listen_addr,
        hub.registrar().clone(),
        hub.dispatcher().clone(),
        config.hub.clone(),
        shutdown_tx.subscribe(),
    )
    .await?;
    let acceptor_task = tokio::spawn(acceptor.run());

    if config.network.status_port != 0 {
        let state = StatusState {
            directory: hub.directory().clone(),
            started_at: hub.started_at(),
        };
        let port = config.network.status_port;
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = status::serve(state, port, shutdown).await {
                tracing::error!(error = %e, "status server failed");
            }
        });
    }

    // ── Wait for exit ────────────────────────────────────────────────────────

    let mut shutdown_rx = shutdown_tx.subscribe();

    tokio::select! {
        _ = shutdown_rx.recv()  => tracing::info!("shutting down"),
        r = acceptor_task       => tracing::error!("peer acceptor exited: {:?}", r),
    }

    hub.shutdown();
    if let Err(e) = controller_task.await {
        tracing::warn!(error = %e, "registry controller task failed");
    }
    tracing::info!(live = hub.live_count(), uptime_secs = hub.uptime().as_secs(), "peerhubd stopped");

    Ok(())
}
