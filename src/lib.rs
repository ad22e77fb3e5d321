//! HTTP edge router.
//!
//! Classifies every inbound request through a fixed, ordered pipeline of
//! stages and forwards it to exactly one backend: the identity service,
//! the write-coordination service, the static-asset service, or the
//! optional verification service. A background monitor probes the
//! dependencies and backs the heartbeat route.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;

// Traffic management
pub mod health;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{RouterConfig, Settings};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
