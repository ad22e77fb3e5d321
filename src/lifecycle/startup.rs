//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration and resolve every backend origin
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve until a shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any configuration error is fatal, before binding
//! - Listener binds last (traffic only when ready)

use std::net::SocketAddr;

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{validate_config, ConfigError, RouterConfig};
use crate::http::HttpServer;
use crate::lifecycle::{signals::shutdown_signal, Shutdown};
use crate::observability::metrics::init_metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] BuildError),
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Validate `config`, bind, and serve until Ctrl+C or SIGTERM.
pub async fn run(config: RouterConfig) -> Result<(), StartupError> {
    let settings = validate_config(&config)?;

    tracing::info!(
        bind_address = %settings.bind_address,
        identity = %settings.backends.identity,
        writer = %settings.backends.writer,
        static_assets = %settings.backends.static_assets,
        verifier = ?settings.backends.verifier.as_ref().map(ToString::to_string),
        verification_host = ?settings.public.verification_host,
        secure_transport = settings.public.secure_transport(),
        "Configuration loaded"
    );

    if let Some(addr) = settings.metrics_address {
        init_metrics(addr)?;
    }

    let addr = settings.bind_address;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!(address = %listener.local_addr().unwrap_or(addr), "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    HttpServer::new(settings)
        .run(listener, shutdown)
        .await
        .map_err(StartupError::Serve)
}
