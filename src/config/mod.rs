//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (resolve origins, semantic checks)
//!     → Settings (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults except the backend URLs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BackendsConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig, PublicConfig,
    RouterConfig, SecurityConfig, TimeoutConfig,
};
pub use settings::Settings;
pub use validation::{validate_config, ValidationError};
