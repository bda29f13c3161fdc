//! evhub daemon entry point.
//!
//! Binary name: `evhubd`
//!
//! Loads configuration, initializes tracing, then serves the event endpoints
//! until Ctrl+C or SIGTERM. On shutdown every listener is closed before the
//! process exits.

mod cli;
mod http;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use evhub_infra::config::{load_daemon_config, DEFAULT_CONFIG_FILE};
use evhub_observe::tracing_setup::{init_tracing, shutdown_tracing, verbosity_filter};
use evhub_types::config::DaemonConfig;

use cli::{Cli, Commands, ServeArgs};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Config(args) => {
            let config = resolve_config(&args).await;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
        Commands::Serve(args) => {
            let config = resolve_config(&args).await;
            init_tracing(
                verbosity_filter(cli.log_verbosity, cli.quiet),
                config.telemetry.otel,
            )
            .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

            let result = serve(config).await;
            shutdown_tracing();
            result
        }
    }
}

async fn resolve_config(args: &ServeArgs) -> DaemonConfig {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = load_daemon_config(&path).await;
    args.apply(&mut config);
    config
}

async fn serve(config: DaemonConfig) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.listen.host, config.listen.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    let state = AppState::new(config);
    let hub = state.hub.clone();
    let router = http::router::build_router(state);

    tracing::info!(addr = %addr, "evhubd listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown requested, closing event listeners");
        hub.shutdown().await;
    })
    .await?;

    tracing::info!("evhubd stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install SIGTERM handler");
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
}
