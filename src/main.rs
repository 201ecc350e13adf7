// src/main.rs

//! # Docwatch Main Entry Point
//!
//! Loads configuration, initializes logging, starts the watch session and keeps it
//! alive until Ctrl-C or SIGTERM. The session is released when `main` returns.

use anyhow::Result;
use docwatch::config::AppConfig;
use docwatch::WatchSession;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let app_config = match AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(if e.is_configuration() { 2 } else { 1 });
        }
    };

    // RUST_LOG first, then the configured level, then "info".
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&app_config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    tracing::info!("Docwatch starting with configuration: {:?}", app_config);

    let mut session = match WatchSession::start(app_config.watch.clone(), app_config.mode) {
        Ok(Some(session)) => session,
        Ok(None) => {
            tracing::info!("Nothing to watch in serve mode; exiting.");
            return Ok(());
        }
        Err(e) => {
            tracing::error!("Failed to start watch session: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(if e.is_configuration() { 2 } else { 1 });
        }
    };

    shutdown_signal().await;
    session.stop();
    tracing::info!("Docwatch shut down gracefully.");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM (the usual way a host stops its children).
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Ctrl-C received, shutting down..."),
            Err(err) => {
                tracing::error!("Failed to listen for Ctrl-C signal: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                tracing::info!("SIGTERM received, shutting down...");
            }
            Err(err) => {
                tracing::error!("Failed to listen for SIGTERM: {}", err);
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
