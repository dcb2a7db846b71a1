//! scalesrv entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use scalesrv::api::{self, AppState};
use scalesrv::bootstrap::{self, Args};
use scalesrv::config::ServiceConfig;
use scalesrv::manager::DeviceManager;
use scalesrv::store::DeviceStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    bootstrap::init_logging(&args.log_level, args.no_color);

    if args.validate {
        if let Err(e) = bootstrap::run_validation(&args.config, args.devices.as_deref()) {
            error!("Configuration validation failed: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let mut config = ServiceConfig::load(&args.config).context("failed to load configuration")?;
    if let Some(path) = &args.devices {
        config.devices_file = path.clone();
    }

    let bind_address = bootstrap::determine_bind_address(args.port, &config);
    bootstrap::print_banner(&bind_address);

    let store = DeviceStore::load(&config.devices_file).context("failed to load device file")?;
    info!(
        "Loaded {} device(s) from {}",
        store.len(),
        store.path().display()
    );

    let manager = Arc::new(DeviceManager::new());
    let summary = manager
        .apply_snapshot(store.snapshot())
        .context("failed to register devices")?;
    info!("Registered {} device(s)", summary.total);

    let state = AppState::new(config, Arc::clone(&manager), store);
    let app = api::create_router(state);

    let addr: SocketAddr = bind_address
        .parse()
        .with_context(|| format!("invalid bind address {}", bind_address))?;
    let socket = TcpSocket::new_v4().context("failed to create TCP socket")?;
    socket
        .set_reuseaddr(true)
        .context("failed to set SO_REUSEADDR")?;
    socket
        .bind(addr)
        .with_context(|| format!("failed to bind {}", addr))?;
    let listener = socket.listen(1024).context("failed to listen")?;

    info!("API server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);
    #[cfg(feature = "swagger-ui")]
    info!("Swagger UI: http://{}/docs", addr);

    let shutdown_token = CancellationToken::new();
    let server_token = shutdown_token.clone();
    let server_handle = tokio::spawn(async move {
        let shutdown = async move { server_token.cancelled().await };
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("API server error: {}", e);
        }
    });

    bootstrap::wait_for_shutdown().await;
    info!("Shutdown signal received, stopping scalesrv...");

    shutdown_token.cancel();
    manager.shutdown();

    if tokio::time::timeout(Duration::from_secs(5), server_handle)
        .await
        .is_err()
    {
        error!("API server did not stop within 5s");
    }

    info!("scalesrv stopped");
    Ok(())
}
