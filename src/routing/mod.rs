//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     configured URLs
//!     → origin.rs (normalize to scheme + host + port)
//!     → backends.rs (BackendSet, PublicHosts)
//!     → pipeline.rs (assemble ordered stages, frozen)
//!
//! Per request:
//!     RequestContext (method, path, host, content length)
//!     → stage.rs (each stage claims or declines, in order)
//!     → api.rs (read/write split inside /wsapi/)
//!     → Disposition (health reply, rejection, or forward)
//! ```
//!
//! # Design Decisions
//! - Stages compiled at startup, immutable at runtime
//! - No regex in hot path (exact and prefix matching only)
//! - First claim wins; the catch-all guarantees one disposition

pub mod api;
pub mod backends;
pub mod matcher;
pub mod origin;
pub mod pipeline;
pub mod stage;

pub use backends::{Backend, BackendSet, PublicHosts};
pub use origin::{resolve, Origin, OriginError};
pub use pipeline::{Classification, Pipeline};
pub use stage::{Disposition, RequestContext, Stage, StageKind, StageOutcome};
