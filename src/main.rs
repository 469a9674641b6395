//! Service entry point.
//!
//! Wires configuration, the telemetry store and the HTTP API together,
//! then runs the server until a shutdown signal arrives.

use clap::Parser;
use gauge::{
    config::AppConfig,
    server::{AppState, create_router},
    storage::{StorageBuilder, StorageHandles},
};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP read/write facade over the vehicle telemetry store.
#[derive(Parser, Debug)]
#[command(name = "gauge", version, about, long_about = None)]
struct Cli {
    /// Configuration file to load
    #[arg(
        short,
        long,
        default_value = "configs/config.yaml",
        env = "GAUGE_CONFIG"
    )]
    config: String,

    /// Bind address, taking precedence over the config file
    #[arg(long, env = "GAUGE_SERVER_BIND")]
    server_bind: Option<String>,

    /// Port, taking precedence over the config file
    #[arg(long, env = "GAUGE_SERVER_PORT")]
    server_port: Option<u16>,

    /// Database file, taking precedence over the config file
    #[arg(long, env = "GAUGE_DB_PATH")]
    db_path: Option<String>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gauge=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let cli = Cli::parse();
    tracing::info!(config = %cli.config, "Starting gauge");

    let mut config = AppConfig::load(&cli.config)?;

    // Precedence: CLI flag over environment over config file. clap has
    // already folded the env vars into the flags at this point.
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(path) = cli.db_path {
        config.database.path = path;
    }

    let handles = StorageBuilder::new(&config.database.path)
        .pool_size(config.database.pool_size)
        .query_timeout(config.database.query_timeout)
        .build()
        .await?;
    tracing::info!(
        db = %config.database.path,
        pool_size = config.database.pool_size,
        "Telemetry store ready"
    );

    let app = create_router(AppState {
        store: handles.store.clone(),
    });

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handles))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM, then drain the storage layer.
async fn shutdown_signal(handles: StorageHandles) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }

    handles.shutdown().await;
    tracing::info!("Telemetry store drained");
}
