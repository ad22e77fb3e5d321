//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Carry domain events out of the request path (`MetricsTap`)
//! - Expose a Prometheus-compatible metrics endpoint
//! - Track dependency health as a gauge
//!
//! # Metrics
//! - `edge_router_events_total` (counter): domain events by `event`
//! - `edge_router_dependency_up` (gauge): 1=healthy, 0=otherwise, by `origin`

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Events the classification core reports.
///
/// Fired only by the catch-all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterEvent {
    /// A request for the sign-in entry page reached the catch-all.
    UserEntry,
}

impl RouterEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouterEvent::UserEntry => "user_entry",
        }
    }
}

/// Sink for counter-style events keyed by name.
pub trait MetricsTap: Send + Sync {
    fn fire(&self, event: RouterEvent);
}

/// Tap backed by the global `metrics` recorder.
///
/// Without an installed recorder every event is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusTap;

impl MetricsTap for PrometheusTap {
    fn fire(&self, event: RouterEvent) {
        counter!("edge_router_events_total", "event" => event.as_str()).increment(1);
    }
}

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe_counter!(
        "edge_router_events_total",
        "Domain events observed while classifying requests"
    );
    describe_gauge!(
        "edge_router_dependency_up",
        "Result of the latest health probe per dependency origin"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record the latest probe result for a dependency.
pub fn record_dependency_health(origin: &str, healthy: bool) {
    gauge!("edge_router_dependency_up", "origin" => origin.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}
