//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every dependency origin
//! - Publish a fresh snapshot after each round

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use futures_util::future::join_all;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::health::state::{DependencyHealth, HealthSnapshot, HealthState, ProbeStatus};
use crate::http::forward::build_client;
use crate::observability::metrics;
use crate::routing::origin::Origin;

const USER_AGENT: &str = "edge-router-health-check";

pub struct HealthMonitor {
    state: Arc<HealthState>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    /// Probes the dependencies already registered in `state`.
    pub fn new(state: Arc<HealthState>, config: HealthCheckConfig, connect_timeout: Duration) -> Self {
        Self {
            state,
            config,
            client: build_client(connect_timeout),
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.probe_path,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => break,
            }
            // A round in flight is abandoned on shutdown, not awaited.
            tokio::select! {
                _ = self.check_all() => {}
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }

    /// Probe every dependency once and publish the result.
    pub async fn check_all(&self) -> Arc<HealthSnapshot> {
        let previous = self.state.snapshot();

        let statuses = join_all(
            previous
                .dependencies
                .iter()
                .map(|dependency| self.probe(&dependency.origin)),
        )
        .await;

        let dependencies: Vec<DependencyHealth> = previous
            .dependencies
            .iter()
            .zip(statuses)
            .map(|(before, status)| {
                if before.status != status {
                    match status {
                        ProbeStatus::Healthy => {
                            tracing::info!(origin = %before.origin, from = ?before.status, "Dependency healthy")
                        }
                        _ => {
                            tracing::warn!(origin = %before.origin, from = ?before.status, "Dependency unhealthy")
                        }
                    }
                }
                metrics::record_dependency_health(
                    &before.origin.to_string(),
                    status == ProbeStatus::Healthy,
                );
                DependencyHealth {
                    origin: before.origin.clone(),
                    status,
                }
            })
            .collect();

        let snapshot = HealthSnapshot {
            dependencies,
            round: previous.round + 1,
        };
        self.state.publish(snapshot);
        self.state.snapshot()
    }

    async fn probe(&self, origin: &Origin) -> ProbeStatus {
        let request = match Request::builder()
            .method("GET")
            .uri(origin.join(&self.config.probe_path))
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Failed to build health check request");
                return ProbeStatus::Unhealthy;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) if response.status().is_success() => ProbeStatus::Healthy,
            Ok(Ok(response)) => {
                tracing::debug!(origin = %origin, status = %response.status(), "Health check failed: non-success status");
                ProbeStatus::Unhealthy
            }
            Ok(Err(e)) => {
                tracing::debug!(origin = %origin, error = %e, "Health check failed: connection error");
                ProbeStatus::Unhealthy
            }
            Err(_) => {
                tracing::debug!(origin = %origin, "Health check failed: timeout");
                ProbeStatus::Unhealthy
            }
        }
    }
}
