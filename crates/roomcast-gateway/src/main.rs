//! roomcast gateway binary.
//!
//! - WebSocket endpoint: /ws (Authorization: Bearer <jwt> or ?token=<jwt>)
//! - Liveness: /health, metrics: /metrics
//! - Backbone: NATS, optional (NATS_URL)

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

use roomcast_core::error::{Result, RoomcastError};
use roomcast_gateway::{backbone, config, router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = config::load()?;
    let listen = cfg.gateway.listen_addr()?;

    let backbone = backbone::connect(&cfg.backbone).await;
    let state = AppState::new(cfg, backbone)?;
    let fanout = state.bridge().start_fanout(state.shutdown_token().clone()).await;
    let app = router::build_router(state.clone());

    let listener = TcpListener::bind(listen)
        .await
        .map_err(|e| RoomcastError::Internal(format!("failed to bind {listen}: {e}")))?;
    tracing::info!(%listen, "roomcast-gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.shutdown_token().clone()))
        .await
        .map_err(|e| RoomcastError::Internal(format!("server failed: {e}")))?;

    if let Some(task) = fanout {
        let _ = task.await;
    }
    tracing::info!("roomcast-gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, then cancel every session and the fanout task.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
    shutdown.cancel();
}
