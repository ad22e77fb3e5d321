//! Edge router binary.
//!
//! ```text
//!                         ┌──────────────────────────── EDGE ROUTER ───────────────────────────┐
//!                         │                                                                     │
//!   Client Request        │  ┌───────────┐  ┌────────┐  ┌──────────┐  ┌─────────────────────┐  │
//!   ──────────────────────┼─▶│ heartbeat │─▶│ access │─▶│   body   │─▶│ hsts → verify →     │  │
//!                         │  │  (local)  │  │  log   │  │  limit   │  │ fake → wsapi → rest │  │
//!                         │  └───────────┘  └────────┘  └──────────┘  └──────────┬──────────┘  │
//!                         │                                                      │ forward     │
//!                         │                                                      ▼             │
//!                         │         identity ◀── reads   writer ◀── writes   static / verifier │
//!                         │                                                                     │
//!                         │  health monitor ── probes identity + static ──▶ snapshot (ArcSwap)  │
//!                         └─────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use edge_router::config::load_config;
use edge_router::lifecycle;
use edge_router::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "edge-router")]
#[command(about = "HTTP edge router in front of the identity, writer, static and verifier services", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "edge-router.toml")]
    config: PathBuf,

    /// Enable the fake verification route (test deployments only).
    #[arg(long)]
    test_mode: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if cli.test_mode {
        config.test_mode = true;
    }

    init_logging(&config.observability);
    tracing::info!(config = %cli.config.display(), "edge-router v{} starting", env!("CARGO_PKG_VERSION"));

    lifecycle::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
