//! Validated runtime settings.

use std::net::SocketAddr;

use crate::config::schema::{HealthCheckConfig, ObservabilityConfig, TimeoutConfig};
use crate::routing::backends::{BackendSet, PublicHosts};

/// Everything the router needs at runtime, resolved and checked.
///
/// Produced only by [`validate_config`](crate::config::validate_config).
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_address: SocketAddr,
    pub backends: BackendSet,
    pub public: PublicHosts,
    pub max_body_size: usize,
    pub health: HealthCheckConfig,
    pub timeouts: TimeoutConfig,
    pub observability: ObservabilityConfig,
    /// Prometheus listener, when metrics are enabled.
    pub metrics_address: Option<SocketAddr>,
    pub test_mode: bool,
}
