mod config;
mod error;
mod middleware;
mod routes;
mod sources;
mod tools;

use clap::Parser;
use config::Config;
use sources::RelaySources;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tools::MedicalTools;
use tracing_subscriber::EnvFilter;

/// JSON web API over the medical data tools, plus the static frontend.
#[derive(Parser)]
#[command(name = "medical-gateway")]
struct Args {
    /// Path to the TOML config file
    #[arg(long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let args = Args::parse();

    let mut config = if args.config.exists() {
        match Config::load(&args.config) {
            Ok(c) => {
                tracing::info!(path = %args.config.display(), "loaded config");
                c
            }
            Err(e) => {
                tracing::error!(error = %e, path = %args.config.display(), "failed to load config, using defaults");
                Config::default_config()
            }
        }
    } else {
        tracing::info!(path = %args.config.display(), "no config found, using defaults");
        Config::default_config()
    };
    config.apply_port_override(std::env::var("PORT").ok().as_deref());

    let sources = RelaySources::new(config.sources.url.clone(), config.sources.timeout())
        .unwrap_or_else(|e| panic!("failed to build source client: {e}"));
    let tools = MedicalTools::new(Arc::new(sources));

    let app = routes::app(tools.clone(), &config);

    let addr = config.server.listen_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind gateway to {addr}: {e}"));

    tracing::info!(
        addr = %addr,
        sources = %config.sources.url,
        static_dir = %config.server.static_dir.display(),
        rate_limit = config.rate_limit.enabled,
        tools = tools.available_tools().len(),
        "medical gateway starting"
    );

    if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "gateway server error");
    }

    tracing::info!("medical gateway shut down");
}

/// Resolve on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }

    tracing::info!("shutdown signal received, draining connections...");
}
