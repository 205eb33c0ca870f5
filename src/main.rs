//! Process entry point: loads configuration, builds the engine once, and
//! serves the dispatcher's HTTP routes alongside a background scheduled-sync
//! loop.

use std::sync::Arc;
use ticket_bridge::config::SyncConfig;
use ticket_bridge::dispatcher;
use ticket_bridge::engine::Engine;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match SyncConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    let bind_addr = config.bind_addr.clone();
    let sync_interval = config.sync_interval;

    let engine = match Engine::build(config).await {
        Ok(engine) => Arc::new(engine),
        Err(err) => {
            log::error!("failed to initialize engine: {err}");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();

    let sweep_engine = engine.clone();
    let sweep_shutdown = shutdown.clone();
    let sweep_task = tokio::spawn(async move {
        run_scheduled_sweeps(sweep_engine, sync_interval, sweep_shutdown).await;
    });

    let app = dispatcher::router(engine);
    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            log::error!("failed to bind {bind_addr}: {err}");
            std::process::exit(1);
        }
    };

    log::info!("listening on {bind_addr}");

    let server_shutdown = shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        wait_for_shutdown_signal().await;
        server_shutdown.cancel();
    });

    if let Err(err) = server.await {
        log::error!("server error: {err}");
    }

    let _ = sweep_task.await;
}

/// Run `full_sync` on `sync_interval` ticks until cancelled. Logs and
/// continues past a failed sweep rather than exiting the process.
async fn run_scheduled_sweeps(engine: Arc<ticket_bridge::engine::Engine>, sync_interval: std::time::Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(sync_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match engine.issues.full_sync().await {
                    Ok(outcomes) => log::info!("scheduled sweep synced {} issues", outcomes.len()),
                    Err(err) => log::error!("scheduled sweep failed: {err}"),
                }
            }
            _ = shutdown.cancelled() => break,
        }
    }
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("shutdown signal received");
}
