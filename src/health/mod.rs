//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe each dependency origin
//!     → Publish new snapshot to state.rs
//!
//! Status route (served by the pipeline's first stage):
//!     → Read current snapshot (lock-free)
//!     → 200 healthy / 503 unhealthy
//! ```
//!
//! # Design Decisions
//! - Probes never raise errors; they only change the reported status
//! - Probing runs in its own task, decoupled from request handling
//! - Health state is an immutable snapshot swapped atomically

pub mod active;
pub mod state;

pub use active::HealthMonitor;
pub use state::{DependencyHealth, HealthSnapshot, HealthState, ProbeStatus};
