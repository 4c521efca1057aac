//! Process bootstrap (§6): builds [`Config`] from the environment, connects every component, and
//! runs the main loop until SIGTERM. Exits non-zero only on unrecoverable startup failure (DB
//! unreachable, missing credentials).

use waypoint::config::Config;
use waypoint::orchestrator::{self, Orchestrator};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let orchestrator = match Orchestrator::bootstrap(config).await {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            log::error!("failed to start: {err}");
            std::process::exit(1);
        }
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        log::info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    orchestrator::run(orchestrator, shutdown_rx).await;
    std::process::exit(0);
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = terminate.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
