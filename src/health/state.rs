//! Dependency health state.
//!
//! # States
//! - Unknown: not probed yet
//! - Healthy: last probe answered 2xx in time
//! - Unhealthy: last probe failed, timed out, or answered non-2xx
//!
//! # State Transitions
//! ```text
//! Unknown → Healthy | Unhealthy   (first probe)
//! Healthy ←→ Unhealthy            (every probe result applies directly)
//! ```
//!
//! The aggregate is healthy iff every dependency is Healthy. The whole
//! snapshot is replaced atomically, so readers see either the previous or
//! the next round, never a mix.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;

use crate::routing::origin::Origin;

/// Result of the latest probe against one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Unknown,
    Healthy,
    Unhealthy,
}

/// One dependency and its latest status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyHealth {
    pub origin: Origin,
    pub status: ProbeStatus,
}

/// Immutable view of all dependencies after one probe round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSnapshot {
    pub dependencies: Vec<DependencyHealth>,
    /// Number of completed probe rounds; 0 before the first.
    pub round: u64,
}

impl HealthSnapshot {
    /// Every dependency unprobed.
    pub fn unknown(origins: &[Origin]) -> Self {
        Self {
            dependencies: origins
                .iter()
                .map(|origin| DependencyHealth {
                    origin: origin.clone(),
                    status: ProbeStatus::Unknown,
                })
                .collect(),
            round: 0,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.dependencies
            .iter()
            .all(|d| d.status == ProbeStatus::Healthy)
    }

    pub fn status_of(&self, origin: &Origin) -> Option<ProbeStatus> {
        self.dependencies
            .iter()
            .find(|d| d.origin == *origin)
            .map(|d| d.status)
    }
}

/// Shared health state: single writer (the monitor), many readers.
#[derive(Debug)]
pub struct HealthState {
    current: ArcSwap<HealthSnapshot>,
}

impl HealthState {
    pub fn new(origins: &[Origin]) -> Self {
        Self {
            current: ArcSwap::from_pointee(HealthSnapshot::unknown(origins)),
        }
    }

    /// Current snapshot. Never blocks on the writer.
    pub fn snapshot(&self) -> Arc<HealthSnapshot> {
        self.current.load_full()
    }

    /// Replace the snapshot, returning the previous one.
    pub fn publish(&self, snapshot: HealthSnapshot) -> Arc<HealthSnapshot> {
        self.current.swap(Arc::new(snapshot))
    }
}
