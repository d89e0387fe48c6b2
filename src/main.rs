use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::storage_service::{ObjectStorage, S3Storage};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args().context("loading configuration")?;

    // --- Logging setup; RUST_LOG wins over the configured level ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("Starting s3-gateway with config: {:?}", cfg);

    // --- Storage client ---
    let storage: Arc<dyn ObjectStorage> = Arc::new(
        S3Storage::connect(&cfg.s3)
            .with_context(|| format!("connecting to S3 endpoint {}", cfg.s3.endpoint))?,
    );
    tracing::info!(
        "Using bucket {} on {}",
        storage.bucket(),
        storage.endpoint()
    );

    // --- Build router ---
    let app_state = state::AppState::new(storage, cfg.presign_expiry_minutes, cfg.delivery);
    let app = routes::routes::routes(app_state, cfg.enable_list, cfg.client_ip_header());
    tracing::info!(
        "Delivery {:?}, presigned URLs valid for {}s",
        cfg.delivery,
        cfg.presign_ttl().as_secs()
    );
    if cfg.enable_list {
        tracing::info!("Listing enabled at /list");
    }

    // --- Start server ---
    let addr = cfg.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!("Server listening on http://{}", listener.local_addr()?);

    let shutdown = CancellationToken::new();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        result = &mut server => {
            result.context("server task panicked")??;
            return Ok(());
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received, draining connections");
            shutdown.cancel();
        }
    }

    match tokio::time::timeout(SHUTDOWN_GRACE, server).await {
        Ok(result) => result.context("server task panicked")??,
        Err(_) => tracing::warn!(
            "Connections still open after {}s, exiting",
            SHUTDOWN_GRACE.as_secs()
        ),
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!("failed to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
