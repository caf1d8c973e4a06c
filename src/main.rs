use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coedit_backend::api;
use coedit_backend::config::{Config, LogFormat};
use coedit_backend::hub::{self, Hub};
use coedit_backend::state::AppState;
use coedit_backend::ws::ConnectionsManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init(),
    }

    tracing::info!("Starting collaborative editor backend...");
    tracing::info!(
        host = %config.server_host,
        port = %config.server_port,
        status_interval_secs = config.status_interval_seconds,
        evict_empty_rooms = config.evict_empty_rooms,
        "Configuration loaded"
    );

    // Start the hub event loop
    let connections = Arc::new(ConnectionsManager::new());
    let (hub_handle, events) = hub::channel();
    let (stop_hub, hub_stopped) = oneshot::channel::<()>();
    let hub_task = tokio::spawn(Hub::new(&config, connections.clone()).run(
        events,
        config.status_interval(),
        async move {
            let _ = hub_stopped.await;
        },
    ));

    // Create application state
    let state = AppState::new(hub_handle, connections);

    // Build router
    let app = api::create_app(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the status timer and event loop
    let _ = stop_hub.send(());
    hub_task.await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Handle shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down...");
        },
    }
}
